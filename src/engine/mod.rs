// Voice control engine
//
// One event-loop task owns the target registry, the dedup of repeated
// sentences, and dispatch. Capture callbacks, layout registration, and
// interpreter completions all re-enter this context as messages; nothing
// mutates shared state directly.

use crate::capture::{
    AudioSource, CaptureConfig, CaptureError, CaptureSession, SessionState, SpeechRecognizer,
};
use crate::context;
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::events::{
    current_timestamp, CommandDispatchedPayload, DispatchEventEmitter, InterpreterErrorPayload,
    ReplyPlainTextPayload, SessionEventEmitter, UnknownTargetPayload, UtteranceDetectedPayload,
};
use crate::interpreter::Interpreter;
use crate::segmentation::Utterance;
use crate::targets::{ActionHandler, HandlerId, RegistryError, Target, TargetRegistry};
use crate::{debug, warn};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Errors from talking to a running engine
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// The engine loop is not running
    #[error("engine is not running")]
    NotRunning,
    /// Target registration was rejected
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

enum EngineMsg {
    InterpreterReply(String),
    RegisterHandler {
        handler: Arc<dyn ActionHandler>,
        reply: oneshot::Sender<HandlerId>,
    },
    RegisterTarget {
        target: Target,
        reply: oneshot::Sender<Result<(), RegistryError>>,
    },
    EnterScreen(String),
    AnnounceScreen(String),
    ClearScreen(String),
    Initialize,
    Stop,
}

/// Clonable handle for registration and screen navigation.
///
/// The navigation controller owns screen flow: it registers targets as
/// layout makes elements visible, publishes the control map on screen entry,
/// and announces every navigation.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineMsg>,
}

impl EngineHandle {
    /// Register an invokable capability; returns its opaque id
    pub async fn register_handler(
        &self,
        handler: Arc<dyn ActionHandler>,
    ) -> Result<HandlerId, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineMsg::RegisterHandler {
                handler,
                reply: reply_tx,
            })
            .map_err(|_| EngineError::NotRunning)?;
        reply_rx.await.map_err(|_| EngineError::NotRunning)
    }

    /// Register a target for dispatch
    pub async fn register_target(&self, target: Target) -> Result<(), EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineMsg::RegisterTarget {
                target,
                reply: reply_tx,
            })
            .map_err(|_| EngineError::NotRunning)?;
        reply_rx
            .await
            .map_err(|_| EngineError::NotRunning)?
            .map_err(EngineError::from)
    }

    /// Clear interpreter history and send the behavioral contract.
    /// Call once per interpreter session.
    pub fn initialize(&self) -> Result<(), EngineError> {
        self.send(EngineMsg::Initialize)
    }

    /// Publish the screen's control map as authoritative and announce the
    /// screen change.
    pub fn enter_screen(&self, screen: &str) -> Result<(), EngineError> {
        self.send(EngineMsg::EnterScreen(screen.to_string()))
    }

    /// Announce a navigation without republishing the map
    pub fn announce_screen(&self, screen: &str) -> Result<(), EngineError> {
        self.send(EngineMsg::AnnounceScreen(screen.to_string()))
    }

    /// Drop a screen's targets ahead of a rebuild
    pub fn clear_screen(&self, screen: &str) -> Result<(), EngineError> {
        self.send(EngineMsg::ClearScreen(screen.to_string()))
    }

    fn send(&self, msg: EngineMsg) -> Result<(), EngineError> {
        self.tx.send(msg).map_err(|_| EngineError::NotRunning)
    }
}

/// The assembled pipeline: capture session, interpreter adapter, registry,
/// and dispatch, glued together by the engine loop.
pub struct VoiceControlEngine<E: SessionEventEmitter + DispatchEventEmitter + 'static> {
    capture: CaptureSession<E>,
    interpreter: Arc<dyn Interpreter>,
    emitter: Arc<E>,
    handle: Option<EngineHandle>,
    loop_task: Option<JoinHandle<()>>,
}

impl<E: SessionEventEmitter + DispatchEventEmitter + 'static> VoiceControlEngine<E> {
    /// Assemble an engine with the default capture configuration
    pub fn new(
        audio: Arc<dyn AudioSource>,
        recognizer: Arc<dyn SpeechRecognizer>,
        interpreter: Arc<dyn Interpreter>,
        emitter: Arc<E>,
    ) -> Self {
        Self::with_capture_config(audio, recognizer, interpreter, emitter, CaptureConfig::default())
    }

    /// Assemble an engine with a custom capture configuration
    pub fn with_capture_config(
        audio: Arc<dyn AudioSource>,
        recognizer: Arc<dyn SpeechRecognizer>,
        interpreter: Arc<dyn Interpreter>,
        emitter: Arc<E>,
        config: CaptureConfig,
    ) -> Self {
        Self {
            capture: CaptureSession::with_config(audio, recognizer, emitter.clone(), config),
            interpreter,
            emitter,
            handle: None,
            loop_task: None,
        }
    }

    /// Current capture lifecycle state
    pub fn session_state(&self) -> SessionState {
        self.capture.state()
    }

    /// Handle to a running engine, if any
    pub fn handle(&self) -> Option<EngineHandle> {
        self.handle.clone()
    }

    /// Start capturing and processing.
    ///
    /// Fails fast with the capture session's permission/availability errors.
    pub async fn start(&mut self) -> Result<EngineHandle, CaptureError> {
        let utterances = self.capture.start().await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = EngineHandle { tx: tx.clone() };
        self.loop_task = Some(tokio::spawn(engine_loop(
            rx,
            utterances,
            self.interpreter.clone(),
            self.emitter.clone(),
            tx,
        )));
        self.handle = Some(handle.clone());
        Ok(handle)
    }

    /// Stop the capture session and the engine loop.
    ///
    /// In-flight interpreter calls are not cancelled; they complete against
    /// a loop that is no longer there and their replies go nowhere.
    pub async fn stop(&mut self) {
        self.capture.stop().await;
        if let Some(handle) = self.handle.take() {
            let _ = handle.tx.send(EngineMsg::Stop);
        }
        if let Some(task) = self.loop_task.take() {
            let _ = task.await;
        }
    }
}

/// Sequential sender for context messages: contract before map, map before
/// notice. Replies are acknowledgements and are only logged.
fn spawn_context_worker<E: DispatchEventEmitter + 'static>(
    interpreter: Arc<dyn Interpreter>,
    emitter: Arc<E>,
) -> mpsc::UnboundedSender<String> {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            match interpreter.send(&text).await {
                Ok(ack) => debug!("interpreter acknowledged context: {}", ack),
                Err(error) => {
                    warn!("context message failed: {}", error);
                    emitter.emit_interpreter_error(InterpreterErrorPayload {
                        message: error.to_string(),
                    });
                }
            }
        }
    });
    tx
}

/// Fan out one utterance as an independent interpreter call. Calls are not
/// queued; replies re-enter the engine loop in completion order.
fn spawn_interpreter_call<E: DispatchEventEmitter + 'static>(
    interpreter: Arc<dyn Interpreter>,
    emitter: Arc<E>,
    loopback: mpsc::UnboundedSender<EngineMsg>,
    text: String,
) {
    tokio::spawn(async move {
        match interpreter.send(&text).await {
            Ok(reply) => {
                let _ = loopback.send(EngineMsg::InterpreterReply(reply));
            }
            Err(error) => {
                // The triggering utterance is dropped, not retried
                warn!("interpreter call failed: {}", error);
                emitter.emit_interpreter_error(InterpreterErrorPayload {
                    message: error.to_string(),
                });
            }
        }
    });
}

async fn handle_reply<E: DispatchEventEmitter>(
    registry: &TargetRegistry,
    reply_text: &str,
    emitter: &Arc<E>,
) {
    match Dispatcher::dispatch(registry, reply_text).await {
        DispatchOutcome::Invoked {
            target_id,
            kind,
            value,
        } => {
            debug!("dispatched {} to target {}", value, target_id);
            emitter.emit_command_dispatched(CommandDispatchedPayload {
                target_id: target_id.to_string(),
                kind: kind.to_string(),
                value: value.to_string(),
            });
        }
        DispatchOutcome::PlainText(text) => {
            debug!("conversational interpreter reply: {}", text);
            emitter.emit_reply_plain_text(ReplyPlainTextPayload { text });
        }
        DispatchOutcome::UnknownTarget(target_id) => {
            warn!("interpreter referenced unknown target {}", target_id);
            emitter.emit_unknown_target(UnknownTargetPayload {
                target_id: target_id.to_string(),
            });
        }
    }
}

async fn engine_loop<E: SessionEventEmitter + DispatchEventEmitter + 'static>(
    mut commands: mpsc::UnboundedReceiver<EngineMsg>,
    mut utterances: mpsc::Receiver<Utterance>,
    interpreter: Arc<dyn Interpreter>,
    emitter: Arc<E>,
    loopback: mpsc::UnboundedSender<EngineMsg>,
) {
    let mut registry = TargetRegistry::new();
    let mut last_forwarded: Option<String> = None;
    let mut utterances_open = true;
    let context_tx = spawn_context_worker(interpreter.clone(), emitter.clone());

    loop {
        tokio::select! {
            msg = commands.recv() => {
                let msg = match msg {
                    Some(msg) => msg,
                    None => break,
                };
                match msg {
                    EngineMsg::InterpreterReply(text) => {
                        handle_reply(&registry, &text, &emitter).await;
                    }
                    EngineMsg::RegisterHandler { handler, reply } => {
                        let _ = reply.send(registry.register_handler(handler));
                    }
                    EngineMsg::RegisterTarget { target, reply } => {
                        let _ = reply.send(registry.register(target));
                    }
                    EngineMsg::EnterScreen(screen) => {
                        let _ = context_tx.send(context::screen_contract(&registry, &screen));
                        let _ = context_tx.send(context::screen_enter_notice(&screen));
                    }
                    EngineMsg::AnnounceScreen(screen) => {
                        let _ = context_tx.send(context::screen_enter_notice(&screen));
                    }
                    EngineMsg::ClearScreen(screen) => {
                        registry.clear_screen(&screen);
                    }
                    EngineMsg::Initialize => {
                        interpreter.clear_history();
                        let _ = context_tx.send(context::initial_contract());
                    }
                    EngineMsg::Stop => break,
                }
            }
            utterance = utterances.recv(), if utterances_open => {
                match utterance {
                    Some(utterance) => {
                        // The same closed sentence as the immediately
                        // preceding one is suppressed and never sent
                        if last_forwarded.as_deref() == Some(utterance.text.as_str()) {
                            debug!("suppressing repeated utterance: {}", utterance);
                            continue;
                        }
                        last_forwarded = Some(utterance.text.clone());
                        emitter.emit_utterance_detected(UtteranceDetectedPayload {
                            text: utterance.text.clone(),
                            timestamp: current_timestamp(),
                        });
                        spawn_interpreter_call(
                            interpreter.clone(),
                            emitter.clone(),
                            loopback.clone(),
                            utterance.text,
                        );
                    }
                    None => {
                        debug!("utterance stream ended");
                        utterances_open = false;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
