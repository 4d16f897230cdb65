// Capture session lifecycle
//
// Owns the audio tap and the streaming recognition subscription, feeds the
// segmenter, and proactively cycles the subscription before provider limits
// are hit. All segmentation state lives on the session task; callers talk to
// it through commands.

use super::recognizer::{
    AudioSource, AudioTap, RecognitionSubscription, RecognizerEvent, SpeechRecognizer,
};
use super::state::{SessionState, SessionStateCell};
use super::CaptureError;
use crate::events::{
    current_timestamp, SessionErrorPayload, SessionEventEmitter, SessionRestartedPayload,
    SessionStartedPayload, SessionStoppedPayload,
};
use crate::segmentation::{SegmenterConfig, Utterance, UtteranceSegmenter};
use crate::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Streaming recognition providers cap subscription length around one
/// minute; the session cycles the subscription well before that.
pub const RESTART_INTERVAL_SECS: u64 = 55;

/// Configuration for a capture session
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// How often to cycle the recognition subscription
    pub restart_interval: Duration,
    /// Segmentation parameters
    pub segmenter: SegmenterConfig,
    /// Capacity of the downstream utterance channel
    pub utterance_buffer: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            restart_interval: Duration::from_secs(RESTART_INTERVAL_SECS),
            segmenter: SegmenterConfig::default(),
            utterance_buffer: 32,
        }
    }
}

enum SessionCommand {
    Reset,
    Stop,
}

/// The audio tap and recognition subscription that are live together
struct ActiveSubscription {
    tap: AudioTap,
    subscription: RecognitionSubscription,
}

/// A long-running capture session
///
/// `start()` opens the audio tap and recognition subscription and spawns the
/// session task; the returned channel yields one `Utterance` per detected
/// sentence boundary.
pub struct CaptureSession<E: SessionEventEmitter + 'static> {
    audio: Arc<dyn AudioSource>,
    recognizer: Arc<dyn SpeechRecognizer>,
    emitter: Arc<E>,
    config: CaptureConfig,
    state: SessionStateCell,
    control: Option<mpsc::UnboundedSender<SessionCommand>>,
    task: Option<JoinHandle<()>>,
}

impl<E: SessionEventEmitter + 'static> CaptureSession<E> {
    /// Create a session with the default configuration
    pub fn new(
        audio: Arc<dyn AudioSource>,
        recognizer: Arc<dyn SpeechRecognizer>,
        emitter: Arc<E>,
    ) -> Self {
        Self::with_config(audio, recognizer, emitter, CaptureConfig::default())
    }

    /// Create a session with custom configuration
    pub fn with_config(
        audio: Arc<dyn AudioSource>,
        recognizer: Arc<dyn SpeechRecognizer>,
        emitter: Arc<E>,
        config: CaptureConfig,
    ) -> Self {
        Self {
            audio,
            recognizer,
            emitter,
            config,
            state: SessionStateCell::new(),
            control: None,
            task: None,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Start capturing.
    ///
    /// Fails fast without opening anything when the recognizer is
    /// unavailable or microphone/recognition authorization is missing; the
    /// session stays `Idle`. On success the session is `Listening` and the
    /// returned receiver yields detected utterances.
    pub async fn start(&mut self) -> Result<mpsc::Receiver<Utterance>, CaptureError> {
        match self.state.get() {
            SessionState::Idle | SessionState::Stopped => {}
            _ => return Err(CaptureError::AlreadyRunning),
        }

        if !self.recognizer.is_available() {
            return Err(CaptureError::RecognizerUnavailable);
        }
        if !self.recognizer.is_authorized().await || !self.audio.is_authorized().await {
            return Err(CaptureError::PermissionDenied);
        }

        let active = open_with_retry(self.audio.as_ref(), self.recognizer.as_ref())?;
        self.state.transition_to(SessionState::Listening)?;

        let (utterance_tx, utterance_rx) = mpsc::channel(self.config.utterance_buffer);
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        self.control = Some(control_tx);

        self.emitter.emit_session_started(SessionStartedPayload {
            timestamp: current_timestamp(),
        });
        info!("capture session started");

        self.task = Some(tokio::spawn(session_loop(
            self.audio.clone(),
            self.recognizer.clone(),
            self.emitter.clone(),
            self.config.clone(),
            self.state.clone(),
            active,
            utterance_tx,
            control_rx,
        )));

        Ok(utterance_rx)
    }

    /// Cancel the subscription, release the audio tap, disarm the restart
    /// timer, and return to `Idle`.
    pub async fn reset(&mut self) {
        self.shutdown(SessionCommand::Reset).await;
    }

    /// Like `reset()`, but the session ends up `Stopped` and stays there
    /// until the next explicit `start()`.
    pub async fn stop(&mut self) {
        self.shutdown(SessionCommand::Stop).await;
    }

    async fn shutdown(&mut self, command: SessionCommand) {
        if let Some(control) = self.control.take() {
            let _ = control.send(command);
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl<E: SessionEventEmitter + 'static> Drop for CaptureSession<E> {
    fn drop(&mut self) {
        if let Some(control) = self.control.take() {
            let _ = control.send(SessionCommand::Stop);
        }
    }
}

fn open_subscription(
    audio: &dyn AudioSource,
    recognizer: &dyn SpeechRecognizer,
) -> Result<ActiveSubscription, CaptureError> {
    let tap = audio.open()?;
    let subscription = recognizer.transcribe(&tap)?;
    Ok(ActiveSubscription { tap, subscription })
}

/// Open the tap and subscription, retrying once after an audio engine start
/// failure. Permission and availability errors are final.
fn open_with_retry(
    audio: &dyn AudioSource,
    recognizer: &dyn SpeechRecognizer,
) -> Result<ActiveSubscription, CaptureError> {
    match open_subscription(audio, recognizer) {
        Ok(active) => Ok(active),
        Err(CaptureError::CaptureFailed(message)) => {
            warn!("audio capture failed to open ({}), retrying once", message);
            open_subscription(audio, recognizer)
        }
        Err(error) => Err(error),
    }
}

/// Cancel recognition before releasing the input. Opening a new tap while
/// the old one is still attached double-subscribes the hardware.
fn close_subscription(active: ActiveSubscription) {
    active.subscription.cancel();
    active.tap.close();
}

async fn next_recognizer_event(
    active: &mut Option<ActiveSubscription>,
) -> Option<RecognizerEvent> {
    match active.as_mut() {
        Some(active) => active.subscription.next_event().await,
        None => std::future::pending().await,
    }
}

#[allow(clippy::too_many_arguments)]
async fn session_loop<E: SessionEventEmitter>(
    audio: Arc<dyn AudioSource>,
    recognizer: Arc<dyn SpeechRecognizer>,
    emitter: Arc<E>,
    config: CaptureConfig,
    state: SessionStateCell,
    active: ActiveSubscription,
    utterances: mpsc::Sender<Utterance>,
    mut control: mpsc::UnboundedReceiver<SessionCommand>,
) {
    let mut active = Some(active);
    let mut segmenter = UtteranceSegmenter::with_config(config.segmenter.clone());
    // How much of the recognizer's growing transcription has been consumed
    let mut consumed = 0usize;

    let mut restart = tokio::time::interval(config.restart_interval);
    restart.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // An interval's first tick completes immediately
    restart.tick().await;

    loop {
        tokio::select! {
            command = control.recv() => {
                let command = command.unwrap_or(SessionCommand::Stop);
                if let Some(active) = active.take() {
                    close_subscription(active);
                }
                let target = match command {
                    SessionCommand::Reset => SessionState::Idle,
                    SessionCommand::Stop => SessionState::Stopped,
                };
                if let Err(error) = state.transition_to(target) {
                    warn!("session teardown transition failed: {}", error);
                }
                emitter.emit_session_stopped(SessionStoppedPayload {
                    timestamp: current_timestamp(),
                });
                info!("capture session stopped");
                break;
            }
            _ = restart.tick() => {
                debug!("restart interval elapsed, cycling recognition subscription");
                if state.transition_to(SessionState::Restarting).is_err() {
                    continue;
                }
                if let Some(active) = active.take() {
                    close_subscription(active);
                }
                segmenter.reset();
                consumed = 0;

                match open_with_retry(audio.as_ref(), recognizer.as_ref()) {
                    Ok(next) => {
                        active = Some(next);
                        emitter.emit_session_restarted(SessionRestartedPayload {
                            timestamp: current_timestamp(),
                        });
                    }
                    Err(error) => {
                        // The next tick is the only retry
                        warn!("failed to reopen recognition after restart: {}", error);
                        emitter.emit_session_error(SessionErrorPayload {
                            message: error.to_string(),
                        });
                    }
                }
                if let Err(error) = state.transition_to(SessionState::Listening) {
                    warn!("restart transition failed: {}", error);
                }
            }
            event = next_recognizer_event(&mut active) => {
                match event {
                    Some(RecognizerEvent::Transcription(update)) => {
                        // The transcription grows in place; only feed the
                        // fragments this update appended.
                        let fragments = update.fragments.into_iter().skip(consumed);
                        for fragment in fragments {
                            consumed += 1;
                            if let Some(utterance) = segmenter.push(fragment) {
                                debug!("sentence boundary: {}", utterance);
                                if utterances.send(utterance).await.is_err() {
                                    debug!("utterance receiver dropped, stopping session");
                                    if let Some(active) = active.take() {
                                        close_subscription(active);
                                    }
                                    if let Err(error) = state.transition_to(SessionState::Stopped) {
                                        warn!("session teardown transition failed: {}", error);
                                    }
                                    return;
                                }
                            }
                        }
                    }
                    Some(RecognizerEvent::Error(message)) => {
                        warn!("recognizer error: {}", message);
                        emitter.emit_session_error(SessionErrorPayload { message });
                        if let Some(active) = active.take() {
                            close_subscription(active);
                        }
                        // Stay in Listening without a live subscription; the
                        // periodic restart is the only retry
                    }
                    None => {
                        debug!("recognition subscription ended by the provider");
                        if let Some(active) = active.take() {
                            close_subscription(active);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
