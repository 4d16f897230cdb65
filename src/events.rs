// Engine events for host notification
// Defines event payloads and emission traits for testability

use serde::Serialize;

/// Capture-session event names as constants for consistency
pub mod session_events {
    pub const SESSION_STARTED: &str = "session_started";
    pub const SESSION_RESTARTED: &str = "session_restarted";
    pub const SESSION_STOPPED: &str = "session_stopped";
    pub const SESSION_ERROR: &str = "session_error";
}

/// Dispatch-related event names
pub mod dispatch_events {
    pub const UTTERANCE_DETECTED: &str = "utterance_detected";
    pub const COMMAND_DISPATCHED: &str = "command_dispatched";
    pub const REPLY_PLAIN_TEXT: &str = "reply_plain_text";
    pub const UNKNOWN_TARGET: &str = "unknown_target";
    pub const INTERPRETER_ERROR: &str = "interpreter_error";
}

/// Payload for session_started event
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionStartedPayload {
    /// ISO 8601 timestamp when the capture session started
    pub timestamp: String,
}

/// Payload for session_restarted event
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionRestartedPayload {
    /// ISO 8601 timestamp when the recognition subscription was cycled
    pub timestamp: String,
}

/// Payload for session_stopped event
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionStoppedPayload {
    /// ISO 8601 timestamp when the capture session stopped
    pub timestamp: String,
}

/// Payload for session_error event
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionErrorPayload {
    /// Descriptive error message
    pub message: String,
}

/// Payload for utterance_detected event
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UtteranceDetectedPayload {
    /// The closed sentence text
    pub text: String,
    /// ISO 8601 timestamp when the boundary was detected
    pub timestamp: String,
}

/// Payload for command_dispatched event
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommandDispatchedPayload {
    /// ID of the target whose handler was invoked
    pub target_id: String,
    /// Kind of the target ("button", "slider", "textField")
    pub kind: String,
    /// The delivered action value, rendered as text
    pub value: String,
}

/// Payload for reply_plain_text event
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReplyPlainTextPayload {
    /// The conversational reply text; no command was invoked
    pub text: String,
}

/// Payload for unknown_target event
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UnknownTargetPayload {
    /// The target id the interpreter referenced
    pub target_id: String,
}

/// Payload for interpreter_error event
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InterpreterErrorPayload {
    /// Descriptive error message
    pub message: String,
}

/// Trait for emitting capture-session events
/// Allows mocking in tests while hosts plug in their own event bus
pub trait SessionEventEmitter: Send + Sync {
    /// Emit session_started event
    fn emit_session_started(&self, payload: SessionStartedPayload);

    /// Emit session_restarted event
    fn emit_session_restarted(&self, payload: SessionRestartedPayload);

    /// Emit session_stopped event
    fn emit_session_stopped(&self, payload: SessionStoppedPayload);

    /// Emit session_error event
    fn emit_session_error(&self, payload: SessionErrorPayload);
}

/// Trait for emitting dispatch events
pub trait DispatchEventEmitter: Send + Sync {
    /// Emit utterance_detected event
    fn emit_utterance_detected(&self, payload: UtteranceDetectedPayload);

    /// Emit command_dispatched event
    fn emit_command_dispatched(&self, payload: CommandDispatchedPayload);

    /// Emit reply_plain_text event
    fn emit_reply_plain_text(&self, payload: ReplyPlainTextPayload);

    /// Emit unknown_target event
    fn emit_unknown_target(&self, payload: UnknownTargetPayload);

    /// Emit interpreter_error event
    fn emit_interpreter_error(&self, payload: InterpreterErrorPayload);
}

/// Log-backed emitter for hosts without an event bus of their own.
pub struct LogEmitter;

fn log_event<P: Serialize + std::fmt::Debug>(name: &str, payload: &P) {
    match serde_json::to_string(payload) {
        Ok(json) => crate::info!("event {}: {}", name, json),
        Err(_) => crate::info!("event {}: {:?}", name, payload),
    }
}

impl SessionEventEmitter for LogEmitter {
    fn emit_session_started(&self, payload: SessionStartedPayload) {
        log_event(session_events::SESSION_STARTED, &payload);
    }

    fn emit_session_restarted(&self, payload: SessionRestartedPayload) {
        log_event(session_events::SESSION_RESTARTED, &payload);
    }

    fn emit_session_stopped(&self, payload: SessionStoppedPayload) {
        log_event(session_events::SESSION_STOPPED, &payload);
    }

    fn emit_session_error(&self, payload: SessionErrorPayload) {
        log_event(session_events::SESSION_ERROR, &payload);
    }
}

impl DispatchEventEmitter for LogEmitter {
    fn emit_utterance_detected(&self, payload: UtteranceDetectedPayload) {
        log_event(dispatch_events::UTTERANCE_DETECTED, &payload);
    }

    fn emit_command_dispatched(&self, payload: CommandDispatchedPayload) {
        log_event(dispatch_events::COMMAND_DISPATCHED, &payload);
    }

    fn emit_reply_plain_text(&self, payload: ReplyPlainTextPayload) {
        log_event(dispatch_events::REPLY_PLAIN_TEXT, &payload);
    }

    fn emit_unknown_target(&self, payload: UnknownTargetPayload) {
        log_event(dispatch_events::UNKNOWN_TARGET, &payload);
    }

    fn emit_interpreter_error(&self, payload: InterpreterErrorPayload) {
        log_event(dispatch_events::INTERPRETER_ERROR, &payload);
    }
}

/// Get the current timestamp in ISO 8601 format
pub fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
