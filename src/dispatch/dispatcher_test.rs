use super::*;
use crate::targets::{ActionHandler, Frame, Target};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct RecordingHandler {
    invocations: Mutex<Vec<ActionValue>>,
}

#[async_trait]
impl ActionHandler for RecordingHandler {
    async fn invoke(&self, value: ActionValue) {
        self.invocations.lock().push(value);
    }
}

fn registry_with(kind: TargetKind) -> (TargetRegistry, Uuid, Arc<RecordingHandler>) {
    let mut registry = TargetRegistry::new();
    let handler = Arc::new(RecordingHandler::default());
    let handler_id = registry.register_handler(handler.clone());
    let target = Target::new(
        kind,
        "Main",
        "A control under test",
        Frame::new(0, 0, 100, 40),
        handler_id,
    );
    let id = target.id;
    registry.register(target).unwrap();
    (registry, id, handler)
}

#[tokio::test]
async fn test_structured_reply_invokes_exactly_once() {
    let mut registry = TargetRegistry::new();
    let handler = Arc::new(RecordingHandler::default());
    let handler_id = registry.register_handler(handler.clone());
    let mut target = Target::new(
        TargetKind::TextField,
        "Main",
        "Text field dedicated for searching items.",
        Frame::new(0, 0, 200, 44),
        handler_id,
    );
    target.id = Uuid::parse_str("B25CEC9E-9C0E-484E-B933-A67A5C9FC10F").unwrap();
    let id = target.id;
    registry.register(target).unwrap();

    let reply = "{\"id\":\"B25CEC9E-9C0E-484E-B933-A67A5C9FC10F\",\"key\":\"car\"}";

    let outcome = Dispatcher::dispatch(&registry, reply).await;
    assert_eq!(
        outcome,
        DispatchOutcome::Invoked {
            target_id: id,
            kind: TargetKind::TextField,
            value: ActionValue::Str("car".to_string()),
        }
    );

    let invocations = handler.invocations.lock();
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0], ActionValue::Str("car".to_string()));
}

#[tokio::test]
async fn test_reply_without_key_delivers_none() {
    let (registry, id, handler) = registry_with(TargetKind::Button);
    let reply = format!("{{\"id\":\"{}\"}}", id);

    let outcome = Dispatcher::dispatch(&registry, &reply).await;
    assert!(matches!(
        outcome,
        DispatchOutcome::Invoked {
            value: ActionValue::None,
            ..
        }
    ));
    assert_eq!(handler.invocations.lock().as_slice(), &[ActionValue::None]);
}

#[tokio::test]
async fn test_plain_prose_dispatches_nothing() {
    let (registry, _, handler) = registry_with(TargetKind::Button);

    let outcome = Dispatcher::dispatch(&registry, "Sure, happy to help!").await;
    assert_eq!(
        outcome,
        DispatchOutcome::PlainText("Sure, happy to help!".to_string())
    );
    assert!(handler.invocations.lock().is_empty());
}

#[tokio::test]
async fn test_unknown_target_invokes_nothing_and_raises_no_error() {
    let (registry, _, handler) = registry_with(TargetKind::Button);
    let stranger = Uuid::new_v4();
    let reply = format!("{{\"id\":\"{}\"}}", stranger);

    let outcome = Dispatcher::dispatch(&registry, &reply).await;
    assert_eq!(outcome, DispatchOutcome::UnknownTarget(stranger));
    assert!(handler.invocations.lock().is_empty());
}

#[tokio::test]
async fn test_reply_with_line_noise_still_parses() {
    let (registry, id, _) = registry_with(TargetKind::TextField);
    let reply = format!("\n\t{{\n\t\"id\": \"{}\",\n\t\"key\": \"car\"\n}}\n", id);

    let outcome = Dispatcher::dispatch(&registry, &reply).await;
    assert!(matches!(outcome, DispatchOutcome::Invoked { .. }));
}

#[test]
fn test_parse_tolerates_unknown_fields() {
    let id = Uuid::new_v4();
    let reply = format!("{{\"id\":\"{}\",\"key\":\"x\",\"note\":\"extra\"}}", id);
    let parsed = Dispatcher::parse(&reply).unwrap();
    assert_eq!(parsed.id, id);
    assert_eq!(parsed.key.as_deref(), Some("x"));
}

#[test]
fn test_malformed_id_is_plain_text() {
    assert!(Dispatcher::parse("{\"id\":\"not-a-uuid\"}").is_err());
}

#[test]
fn test_slider_keys_parse_numerically() {
    assert_eq!(
        Dispatcher::action_value(TargetKind::Slider, Some("15")),
        ActionValue::Int(15)
    );
    assert_eq!(
        Dispatcher::action_value(TargetKind::Slider, Some("15.0")),
        ActionValue::Double(15.0)
    );
    assert_eq!(
        Dispatcher::action_value(TargetKind::Slider, Some("-3")),
        ActionValue::Int(-3)
    );
    // Unparsable keys fall back to the raw string
    assert_eq!(
        Dispatcher::action_value(TargetKind::Slider, Some("fast")),
        ActionValue::Str("fast".to_string())
    );
}

#[test]
fn test_text_field_keys_stay_strings() {
    assert_eq!(
        Dispatcher::action_value(TargetKind::TextField, Some("15")),
        ActionValue::Str("15".to_string())
    );
    // An empty key is a deliberate "clear" instruction
    assert_eq!(
        Dispatcher::action_value(TargetKind::TextField, Some("")),
        ActionValue::Str(String::new())
    );
    assert_eq!(
        Dispatcher::action_value(TargetKind::TextField, None),
        ActionValue::None
    );
}
