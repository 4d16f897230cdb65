// Streaming capture: audio tap, recognition subscription, session lifecycle

pub mod recognizer;
pub mod session;
pub mod state;

pub use recognizer::{
    AudioSource, AudioTap, RecognitionSubscription, RecognizerEvent, ScriptStep,
    ScriptedRecognizer, SimulatedMicrophone, SpeechRecognizer, TranscriptionUpdate,
};
pub use session::{CaptureConfig, CaptureSession, RESTART_INTERVAL_SECS};
pub use state::SessionState;

/// Errors that can occur while starting or running a capture session
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CaptureError {
    /// Microphone or speech recognition is not authorized
    #[error("not authorized to record audio or recognize speech")]
    PermissionDenied,
    /// The speech recognizer cannot be used right now
    #[error("speech recognizer is unavailable")]
    RecognizerUnavailable,
    /// The audio engine failed to start
    #[error("audio capture failed: {0}")]
    CaptureFailed(String),
    /// Invalid lifecycle transition attempted
    #[error("invalid session transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },
    /// The session is already capturing
    #[error("capture session is already running")]
    AlreadyRunning,
}
