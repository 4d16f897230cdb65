// Capture session lifecycle state

use super::CaptureError;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

/// Lifecycle state of a capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    /// Not capturing, ready to start
    Idle,
    /// Audio tap open, recognition subscription live
    Listening,
    /// Cycling the recognition subscription before the provider limit
    Restarting,
    /// Explicitly stopped; terminal until the next start
    Stopped,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Shared, validated session state.
///
/// The cell is cloned into the session task so observers can read the state
/// while the task drives transitions.
#[derive(Clone)]
pub struct SessionStateCell {
    state: Arc<Mutex<SessionState>>,
}

impl SessionStateCell {
    /// Create a cell in Idle state
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::Idle)),
        }
    }

    /// Get the current state
    pub fn get(&self) -> SessionState {
        *self.state.lock()
    }

    /// Transition to a new state with validation
    ///
    /// Valid transitions:
    /// - Idle/Stopped -> Listening (start)
    /// - Listening -> Restarting (periodic subscription cycle)
    /// - Restarting -> Listening (subscription reopened)
    /// - Listening/Restarting -> Idle (reset)
    /// - Listening/Restarting -> Stopped (stop)
    #[must_use = "this returns a Result that should be handled"]
    pub fn transition_to(&self, new_state: SessionState) -> Result<(), CaptureError> {
        let mut state = self.state.lock();
        let valid = matches!(
            (*state, new_state),
            (SessionState::Idle, SessionState::Listening)
                | (SessionState::Stopped, SessionState::Listening)
                | (SessionState::Listening, SessionState::Restarting)
                | (SessionState::Restarting, SessionState::Listening)
                | (SessionState::Listening, SessionState::Idle)
                | (SessionState::Restarting, SessionState::Idle)
                | (SessionState::Listening, SessionState::Stopped)
                | (SessionState::Restarting, SessionState::Stopped)
        );

        if !valid {
            return Err(CaptureError::InvalidTransition {
                from: *state,
                to: new_state,
            });
        }

        *state = new_state;
        Ok(())
    }
}

impl Default for SessionStateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
