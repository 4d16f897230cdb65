// Voice control engine: streaming utterance segmentation, recognition
// session lifecycle, and interpreter-directed target dispatch.

pub mod capture;
pub mod context;
pub mod dispatch;
pub mod engine;
pub mod events;
pub mod interpreter;
pub mod segmentation;
pub mod targets;

// Re-export log macros for use throughout the crate
pub use log::{debug, error, info, trace, warn};

use crate::capture::{ScriptStep, ScriptedRecognizer, SimulatedMicrophone};
use crate::engine::{EngineError, EngineHandle, VoiceControlEngine};
use crate::events::LogEmitter;
use crate::interpreter::{Interpreter, InterpreterConfig, OfflineInterpreter, OpenAiInterpreter};
use crate::segmentation::Fragment;
use crate::targets::{handler_fn, ActionValue, Frame, Target, TargetKind};
use std::sync::Arc;
use std::time::Duration;

/// Demo entry point: drives the engine over a scripted recognizer against a
/// small two-screen storefront. Uses the OpenAI-compatible interpreter when
/// credentials are configured in the environment, the offline interpreter
/// otherwise.
pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let runtime = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
    if let Err(error) = runtime.block_on(demo()) {
        error!("demo failed: {}", error);
    }
}

async fn demo() -> Result<(), Box<dyn std::error::Error>> {
    let config = InterpreterConfig::from_env();
    let interpreter: Arc<dyn Interpreter> = if config.has_credentials() {
        info!("using the chat interpreter at {}", config.base_url);
        Arc::new(OpenAiInterpreter::new(config)?)
    } else {
        info!("no credentials configured, using the offline interpreter");
        Arc::new(OfflineInterpreter::new())
    };

    let recognizer = Arc::new(ScriptedRecognizer::with_script(demo_script()));
    let mut engine = VoiceControlEngine::new(
        Arc::new(SimulatedMicrophone::new()),
        recognizer,
        interpreter,
        Arc::new(LogEmitter),
    );

    let handle = engine.start().await?;
    register_storefront(&handle).await?;
    handle.initialize()?;
    handle.enter_screen("Main")?;

    // Let the script play out and the last replies land
    tokio::time::sleep(Duration::from_secs(6)).await;
    engine.stop().await;
    Ok(())
}

/// A small storefront to steer: a searchable item grid on the main screen
/// plus a detail screen with a back button.
async fn register_storefront(handle: &EngineHandle) -> Result<(), EngineError> {
    let search = handle
        .register_handler(handler_fn(|value| match value {
            ActionValue::Str(text) => info!("search field set to \"{}\"", text),
            _ => info!("search field activated"),
        }))
        .await?;
    handle
        .register_target(
            Target::new(
                TargetKind::TextField,
                "Main",
                "Text field dedicated for searching items. Usually used after commands \
                 related to search, or general requests to buy something that is not \
                 visible on the front page.",
                Frame::new(16, 80, 343, 44),
                search,
            )
            .with_title("Search..."),
        )
        .await?;

    let jacket = handle
        .register_handler(handler_fn(|_| info!("opening the Jacket detail")))
        .await?;
    handle
        .register_target(
            Target::new(
                TargetKind::Button,
                "Main",
                "Item in a grid that describes selected goods. One can tap the item to \
                 open its detail. item name: Jacket item description: Jacket which is \
                 perfect for winter times.",
                Frame::new(16, 160, 160, 140),
                jacket,
            )
            .with_image("Jacket"),
        )
        .await?;

    let watches = handle
        .register_handler(handler_fn(|_| info!("opening the Watches detail")))
        .await?;
    handle
        .register_target(
            Target::new(
                TargetKind::Button,
                "Main",
                "Item in a grid that describes selected goods. One can tap the item to \
                 open its detail. item name: Watches item description: Watches to any \
                 kind of water.",
                Frame::new(192, 160, 160, 140),
                watches,
            )
            .with_image("Watches"),
        )
        .await?;

    let back = handle
        .register_handler(handler_fn(|_| info!("navigating back to the main screen")))
        .await?;
    handle
        .register_target(Target::new(
            TargetKind::Button,
            "Detail",
            "The main back button. You can use this button to go back from the detail \
             screen to the main screen.",
            Frame::new(8, 8, 44, 44),
            back,
        ))
        .await?;

    Ok(())
}

/// A short spoken walkthrough, delivered as a growing transcription. The
/// fragment timestamps carry the pauses; the step delays just pace playback.
fn demo_script() -> Vec<ScriptStep> {
    let fragments = vec![
        Fragment::new("select", 0.0, 0.3, 0.9),
        Fragment::new("the", 0.4, 0.3, 0.9),
        Fragment::new("jacket", 0.8, 0.3, 0.9),
        Fragment::new("go", 3.0, 0.3, 0.9),
        Fragment::new("back", 3.4, 0.3, 0.9),
        Fragment::new("search", 6.0, 0.3, 0.9),
        Fragment::new("for", 6.4, 0.3, 0.9),
        Fragment::new("shoes", 6.8, 0.3, 0.9),
        Fragment::new("done", 9.5, 0.3, 0.9),
    ];

    (1..=fragments.len())
        .map(|upto| ScriptStep::update(Duration::from_millis(200), fragments[..upto].to_vec()))
        .collect()
}
