// Audio-source and streaming-recognition boundaries
//
// Streaming recognition is modeled as a cancellable subscription delivering
// growing, non-final transcriptions over a channel. Completion and
// cancellation are explicit; nothing relies on dropped callbacks.

use super::CaptureError;
use crate::segmentation::Fragment;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// A non-final, growing transcription of everything heard so far in the
/// current subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionUpdate {
    /// All fragments recognized so far, in chronological order
    pub fragments: Vec<Fragment>,
    /// Whether the recognizer considers this result final
    pub is_final: bool,
}

/// Event delivered by a recognition subscription
#[derive(Debug, Clone, PartialEq)]
pub enum RecognizerEvent {
    /// A new (usually partial) transcription of the session audio
    Transcription(TranscriptionUpdate),
    /// The recognizer failed; the subscription is dead after this
    Error(String),
}

/// An open microphone tap.
///
/// Closing is explicit so teardown ordering is deterministic; dropping the
/// tap releases it as a backstop.
pub struct AudioTap {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl AudioTap {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Release the hardware input
    pub fn close(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for AudioTap {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl std::fmt::Debug for AudioTap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioTap")
            .field("open", &self.release.is_some())
            .finish()
    }
}

/// Source of microphone audio
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Whether the user has granted permission to record
    async fn is_authorized(&self) -> bool;

    /// Open the hardware input tap
    ///
    /// Only one tap may be open at a time; the caller must close the previous
    /// tap before opening a new one.
    fn open(&self) -> Result<AudioTap, CaptureError>;
}

/// A live streaming-recognition subscription.
///
/// Events arrive on an internal channel; `cancel` tears the subscription
/// down synchronously.
pub struct RecognitionSubscription {
    events: mpsc::Receiver<RecognizerEvent>,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl RecognitionSubscription {
    pub fn new(
        events: mpsc::Receiver<RecognizerEvent>,
        cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            events,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Receive the next recognizer event; `None` when the provider closed
    /// the subscription.
    pub async fn next_event(&mut self) -> Option<RecognizerEvent> {
        self.events.recv().await
    }

    /// Cancel the subscription
    pub fn cancel(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for RecognitionSubscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

/// Streaming speech recognizer
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Whether the recognizer can be used right now
    fn is_available(&self) -> bool;

    /// Whether the user has authorized speech recognition
    async fn is_authorized(&self) -> bool;

    /// Open a streaming recognition subscription fed from the given tap
    fn transcribe(&self, tap: &AudioTap) -> Result<RecognitionSubscription, CaptureError>;
}

/// In-process microphone stand-in.
///
/// Counts open taps so tests can assert that a restart never leaves two taps
/// attached to the input at once.
pub struct SimulatedMicrophone {
    authorized: bool,
    open_taps: Arc<AtomicUsize>,
    max_open: Arc<AtomicUsize>,
    total_opens: Arc<AtomicUsize>,
    fail_opens: Arc<AtomicUsize>,
}

impl SimulatedMicrophone {
    /// An authorized microphone
    pub fn new() -> Self {
        Self {
            authorized: true,
            open_taps: Arc::new(AtomicUsize::new(0)),
            max_open: Arc::new(AtomicUsize::new(0)),
            total_opens: Arc::new(AtomicUsize::new(0)),
            fail_opens: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A microphone the user has denied access to
    pub fn denied() -> Self {
        Self {
            authorized: false,
            ..Self::new()
        }
    }

    /// Make the next `count` open attempts fail with `CaptureFailed`
    pub fn fail_next_opens(&self, count: usize) {
        self.fail_opens.store(count, Ordering::SeqCst);
    }

    /// Number of taps currently open
    pub fn open_taps(&self) -> usize {
        self.open_taps.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously open taps observed
    pub fn max_open_taps(&self) -> usize {
        self.max_open.load(Ordering::SeqCst)
    }

    /// Total successful opens since creation
    pub fn total_opens(&self) -> usize {
        self.total_opens.load(Ordering::SeqCst)
    }
}

impl Default for SimulatedMicrophone {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioSource for SimulatedMicrophone {
    async fn is_authorized(&self) -> bool {
        self.authorized
    }

    fn open(&self) -> Result<AudioTap, CaptureError> {
        let pending_failures = self.fail_opens.load(Ordering::SeqCst);
        if pending_failures > 0 {
            self.fail_opens.store(pending_failures - 1, Ordering::SeqCst);
            return Err(CaptureError::CaptureFailed(
                "input device unavailable".to_string(),
            ));
        }

        self.total_opens.fetch_add(1, Ordering::SeqCst);
        let open_now = self.open_taps.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_open.fetch_max(open_now, Ordering::SeqCst);

        let open_taps = self.open_taps.clone();
        Ok(AudioTap::new(move || {
            open_taps.fetch_sub(1, Ordering::SeqCst);
        }))
    }
}

/// One step of a recognizer script: wait, then deliver an event
#[derive(Debug, Clone)]
pub struct ScriptStep {
    pub delay: Duration,
    pub event: RecognizerEvent,
}

impl ScriptStep {
    pub fn new(delay: Duration, event: RecognizerEvent) -> Self {
        Self { delay, event }
    }

    /// A non-final transcription step
    pub fn update(delay: Duration, fragments: Vec<Fragment>) -> Self {
        Self::new(
            delay,
            RecognizerEvent::Transcription(TranscriptionUpdate {
                fragments,
                is_final: false,
            }),
        )
    }
}

struct RecognizerShared {
    /// The currently live subscription's sender, tagged with its generation
    current: Mutex<Option<(u64, mpsc::Sender<RecognizerEvent>)>>,
    next_generation: AtomicU64,
    active: AtomicUsize,
    max_active: AtomicUsize,
    total: AtomicUsize,
}

/// In-process recognizer driven by a script or by pushed updates.
///
/// Tests push growing transcriptions into the live subscription; the demo
/// binary plays a pre-recorded script on the first subscription. Counters
/// expose how many subscriptions were ever live at once.
pub struct ScriptedRecognizer {
    available: bool,
    authorized: bool,
    script: Mutex<Option<Vec<ScriptStep>>>,
    shared: Arc<RecognizerShared>,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self {
            available: true,
            authorized: true,
            script: Mutex::new(None),
            shared: Arc::new(RecognizerShared {
                current: Mutex::new(None),
                next_generation: AtomicU64::new(0),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
                total: AtomicUsize::new(0),
            }),
        }
    }

    /// A recognizer that reports itself unavailable
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// A recognizer the user has not authorized
    pub fn unauthorized() -> Self {
        Self {
            authorized: false,
            ..Self::new()
        }
    }

    /// Play the given script on the first subscription
    pub fn with_script(script: Vec<ScriptStep>) -> Self {
        let recognizer = Self::new();
        *recognizer.script.lock() = Some(script);
        recognizer
    }

    /// Deliver a non-final growing transcription to the live subscription
    pub fn push_update(&self, fragments: Vec<Fragment>) {
        self.push_event(RecognizerEvent::Transcription(TranscriptionUpdate {
            fragments,
            is_final: false,
        }));
    }

    /// Deliver a recognizer failure to the live subscription
    pub fn push_error(&self, message: impl Into<String>) {
        self.push_event(RecognizerEvent::Error(message.into()));
    }

    fn push_event(&self, event: RecognizerEvent) {
        if let Some((_, sender)) = self.shared.current.lock().as_ref() {
            let _ = sender.try_send(event);
        }
    }

    /// Number of currently live subscriptions
    pub fn active_subscriptions(&self) -> usize {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously live subscriptions observed
    pub fn max_active_subscriptions(&self) -> usize {
        self.shared.max_active.load(Ordering::SeqCst)
    }

    /// Total subscriptions opened since creation
    pub fn total_subscriptions(&self) -> usize {
        self.shared.total.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn is_authorized(&self) -> bool {
        self.authorized
    }

    fn transcribe(&self, _tap: &AudioTap) -> Result<RecognitionSubscription, CaptureError> {
        let generation = self.shared.next_generation.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = mpsc::channel(64);

        *self.shared.current.lock() = Some((generation, sender.clone()));
        self.shared.total.fetch_add(1, Ordering::SeqCst);
        let active_now = self.shared.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.max_active.fetch_max(active_now, Ordering::SeqCst);

        if let Some(script) = self.script.lock().take() {
            tokio::spawn(async move {
                for step in script {
                    tokio::time::sleep(step.delay).await;
                    if sender.send(step.event).await.is_err() {
                        break;
                    }
                }
            });
        }

        let shared = self.shared.clone();
        Ok(RecognitionSubscription::new(receiver, move || {
            shared.active.fetch_sub(1, Ordering::SeqCst);
            let mut current = shared.current.lock();
            if matches!(current.as_ref(), Some((live, _)) if *live == generation) {
                *current = None;
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tap_close_releases() {
        let microphone = SimulatedMicrophone::new();
        let tap = microphone.open().unwrap();
        assert_eq!(microphone.open_taps(), 1);
        tap.close();
        assert_eq!(microphone.open_taps(), 0);
        assert_eq!(microphone.total_opens(), 1);
    }

    #[test]
    fn test_tap_drop_releases_as_backstop() {
        let microphone = SimulatedMicrophone::new();
        {
            let _tap = microphone.open().unwrap();
            assert_eq!(microphone.open_taps(), 1);
        }
        assert_eq!(microphone.open_taps(), 0);
    }

    #[test]
    fn test_failed_opens_are_counted_down() {
        let microphone = SimulatedMicrophone::new();
        microphone.fail_next_opens(1);
        assert!(matches!(
            microphone.open(),
            Err(CaptureError::CaptureFailed(_))
        ));
        assert!(microphone.open().is_ok());
    }

    #[tokio::test]
    async fn test_subscription_cancel_is_explicit() {
        let microphone = SimulatedMicrophone::new();
        let recognizer = ScriptedRecognizer::new();
        let tap = microphone.open().unwrap();

        let subscription = recognizer.transcribe(&tap).unwrap();
        assert_eq!(recognizer.active_subscriptions(), 1);

        subscription.cancel();
        assert_eq!(recognizer.active_subscriptions(), 0);
        tap.close();
    }

    #[tokio::test]
    async fn test_pushed_update_reaches_subscription() {
        let microphone = SimulatedMicrophone::new();
        let recognizer = ScriptedRecognizer::new();
        let tap = microphone.open().unwrap();
        let mut subscription = recognizer.transcribe(&tap).unwrap();

        recognizer.push_update(vec![Fragment::new("select", 0.0, 0.4, 0.9)]);
        let event = subscription.next_event().await.unwrap();
        match event {
            RecognizerEvent::Transcription(update) => {
                assert_eq!(update.fragments.len(), 1);
                assert_eq!(update.fragments[0].text, "select");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancelled_subscription_no_longer_receives() {
        let microphone = SimulatedMicrophone::new();
        let recognizer = ScriptedRecognizer::new();
        let tap = microphone.open().unwrap();
        let subscription = recognizer.transcribe(&tap).unwrap();
        subscription.cancel();

        // The live sender was cleared, pushes go nowhere
        recognizer.push_update(vec![Fragment::new("late", 0.0, 0.4, 0.9)]);
        assert_eq!(recognizer.active_subscriptions(), 0);
    }
}
