use super::*;

#[test]
fn test_initial_state_is_idle() {
    let cell = SessionStateCell::new();
    assert_eq!(cell.get(), SessionState::Idle);
}

#[test]
fn test_full_lifecycle() {
    let cell = SessionStateCell::new();
    cell.transition_to(SessionState::Listening).unwrap();
    cell.transition_to(SessionState::Restarting).unwrap();
    cell.transition_to(SessionState::Listening).unwrap();
    cell.transition_to(SessionState::Stopped).unwrap();
    assert_eq!(cell.get(), SessionState::Stopped);
}

#[test]
fn test_stopped_is_terminal_until_start() {
    let cell = SessionStateCell::new();
    cell.transition_to(SessionState::Listening).unwrap();
    cell.transition_to(SessionState::Stopped).unwrap();

    // Only an explicit start leaves Stopped
    assert!(cell.transition_to(SessionState::Restarting).is_err());
    assert!(cell.transition_to(SessionState::Idle).is_err());
    cell.transition_to(SessionState::Listening).unwrap();
    assert_eq!(cell.get(), SessionState::Listening);
}

#[test]
fn test_invalid_transitions_rejected() {
    let cell = SessionStateCell::new();
    let err = cell.transition_to(SessionState::Restarting).unwrap_err();
    assert_eq!(
        err,
        CaptureError::InvalidTransition {
            from: SessionState::Idle,
            to: SessionState::Restarting,
        }
    );
    // The failed transition leaves state untouched
    assert_eq!(cell.get(), SessionState::Idle);

    assert!(cell.transition_to(SessionState::Stopped).is_err());
}

#[test]
fn test_reset_from_restarting() {
    let cell = SessionStateCell::new();
    cell.transition_to(SessionState::Listening).unwrap();
    cell.transition_to(SessionState::Restarting).unwrap();
    cell.transition_to(SessionState::Idle).unwrap();
    assert_eq!(cell.get(), SessionState::Idle);
}
