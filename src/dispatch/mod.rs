// Interpreter reply parsing and command dispatch
//
// A reply either carries a structured instruction referencing a target, or
// it is conversational text. Only instructions invoke anything; everything
// else is surfaced unchanged.

use crate::targets::{ActionValue, TargetKind, TargetRegistry};
use serde::Deserialize;
use uuid::Uuid;

/// Structured instruction parsed from an interpreter reply
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InterpreterReply {
    /// The referenced target id
    pub id: Uuid,
    /// Optional free-form key; absent means ActionValue::None
    #[serde(default)]
    pub key: Option<String>,
}

/// What handling one interpreter reply amounted to
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The referenced target's handler was invoked exactly once
    Invoked {
        target_id: Uuid,
        kind: TargetKind,
        value: ActionValue,
    },
    /// The reply was conversational text; nothing was invoked
    PlainText(String),
    /// The reply referenced a target that is not currently registered
    UnknownTarget(Uuid),
}

/// Stateless per call; the registry is only read
pub struct Dispatcher;

impl Dispatcher {
    /// Strip line noise and attempt a structured parse.
    ///
    /// Returns the sanitized text on parse failure; a non-structured reply
    /// is conversational output, not an error.
    pub fn parse(reply_text: &str) -> Result<InterpreterReply, String> {
        let sanitized = reply_text.replace(['\n', '\t'], "");
        let trimmed = sanitized.trim();
        match serde_json::from_str(trimmed) {
            Ok(reply) => Ok(reply),
            Err(_) => Err(trimmed.to_string()),
        }
    }

    /// Convert the reply key into a typed value based on the target kind.
    ///
    /// Sliders get a numeric parse: whole numbers become `Int` (counts),
    /// anything fractional becomes `Double`, and unparsable keys fall back
    /// to the raw string so the handler can decide.
    pub fn action_value(kind: TargetKind, key: Option<&str>) -> ActionValue {
        let key = match key {
            Some(key) => key,
            None => return ActionValue::None,
        };

        match kind {
            TargetKind::TextField | TargetKind::Button => ActionValue::Str(key.to_string()),
            TargetKind::Slider => {
                if let Ok(value) = key.parse::<i64>() {
                    ActionValue::Int(value)
                } else if let Ok(value) = key.parse::<f64>() {
                    ActionValue::Double(value)
                } else {
                    ActionValue::Str(key.to_string())
                }
            }
        }
    }

    /// Handle one interpreter reply against the current registry.
    ///
    /// Invocation is fire-and-forget: the handler owns all side effects and
    /// there is no return value and no retry.
    pub async fn dispatch(registry: &TargetRegistry, reply_text: &str) -> DispatchOutcome {
        let reply = match Self::parse(reply_text) {
            Ok(reply) => reply,
            Err(text) => return DispatchOutcome::PlainText(text),
        };

        let (target_id, kind, handler_id) = match registry.resolve(reply.id) {
            Some(target) => (target.id, target.kind, target.handler),
            None => return DispatchOutcome::UnknownTarget(reply.id),
        };

        let value = Self::action_value(kind, reply.key.as_deref());

        match registry.handler(handler_id) {
            Some(handler) => {
                handler.invoke(value.clone()).await;
                DispatchOutcome::Invoked {
                    target_id,
                    kind,
                    value,
                }
            }
            None => DispatchOutcome::UnknownTarget(reply.id),
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_test.rs"]
mod tests;
