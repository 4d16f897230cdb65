// Interactive target registry
//
// Targets are registered as UI elements become visible and are scoped to one
// screen. Instead of capturing closures inside the registry, each target
// carries an opaque handler id; a separate dispatch table maps handler ids to
// invokable capabilities, which keeps the registry serializable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Kind of interactive control a target represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TargetKind {
    Button,
    Slider,
    TextField,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetKind::Button => "button",
            TargetKind::Slider => "slider",
            TargetKind::TextField => "textField",
        };
        f.write_str(name)
    }
}

/// Integer-rounded bounding box in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Frame {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Round a floating-point layout rectangle to integer coordinates
    pub fn rounded(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x: x.round() as i32,
            y: y.round() as i32,
            width: width.round() as i32,
            height: height.round() as i32,
        }
    }
}

/// Typed payload delivered to a target's handler upon dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum ActionValue {
    None,
    Str(String),
    Int(i64),
    Double(f64),
}

impl fmt::Display for ActionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionValue::None => f.write_str("none"),
            ActionValue::Str(value) => f.write_str(value),
            ActionValue::Int(value) => write!(f, "{}", value),
            ActionValue::Double(value) => write!(f, "{}", value),
        }
    }
}

/// Opaque id of a registered handler capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct HandlerId(u64);

/// An invokable capability: accept one ActionValue, produce a side effect,
/// return nothing.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn invoke(&self, value: ActionValue);
}

/// Adapter so plain closures can act as handlers
struct FnHandler<F>(F);

#[async_trait]
impl<F> ActionHandler for FnHandler<F>
where
    F: Fn(ActionValue) + Send + Sync,
{
    async fn invoke(&self, value: ActionValue) {
        (self.0)(value);
    }
}

/// Wrap a plain closure as an invokable capability
pub fn handler_fn(handler: impl Fn(ActionValue) + Send + Sync + 'static) -> Arc<dyn ActionHandler> {
    Arc::new(FnHandler(handler))
}

/// A registered, identifiable interactive element with screen scope.
///
/// Serialization is what the interpreter sees: the handler id is skipped,
/// capabilities are never transmitted.
#[derive(Debug, Clone, Serialize)]
pub struct Target {
    pub id: Uuid,
    pub frame: Frame,
    pub title: Option<String>,
    pub image: Option<String>,
    pub accessibility: Option<String>,
    /// Free-text description the interpreter matches commands against
    pub description: String,
    pub color: Option<String>,
    #[serde(rename = "type")]
    pub kind: TargetKind,
    pub screen: String,
    #[serde(skip)]
    pub handler: HandlerId,
}

impl Target {
    /// Create a target with a fresh id and no optional metadata
    pub fn new(
        kind: TargetKind,
        screen: impl Into<String>,
        description: impl Into<String>,
        frame: Frame,
        handler: HandlerId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            frame,
            title: None,
            image: None,
            accessibility: None,
            description: description.into(),
            color: None,
            kind,
            screen: screen.into(),
            handler,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_accessibility(mut self, accessibility: impl Into<String>) -> Self {
        self.accessibility = Some(accessibility.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Error types for registry operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    /// Target description is empty
    #[error("target description cannot be empty")]
    EmptyDescription,
    /// The target references a handler that was never registered
    #[error("no handler registered under {0:?}")]
    UnknownHandler(HandlerId),
}

/// Dispatch table from opaque handler ids to capabilities
pub struct HandlerRegistry {
    handlers: HashMap<HandlerId, Arc<dyn ActionHandler>>,
    next_id: u64,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            next_id: 0,
        }
    }

    /// Register a capability and get its opaque id
    pub fn register(&mut self, handler: Arc<dyn ActionHandler>) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers.insert(id, handler);
        id
    }

    /// Register a plain closure as a capability
    pub fn register_fn(&mut self, handler: impl Fn(ActionValue) + Send + Sync + 'static) -> HandlerId {
        self.register(Arc::new(FnHandler(handler)))
    }

    /// Look up a capability by id
    pub fn get(&self, id: HandlerId) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(&id).cloned()
    }

    pub fn contains(&self, id: HandlerId) -> bool {
        self.handlers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry of the currently active interactive targets.
///
/// Registration order is preserved per screen; ids are unique at any instant
/// used for dispatch.
pub struct TargetRegistry {
    targets: Vec<Target>,
    handlers: HandlerRegistry,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self {
            targets: Vec::new(),
            handlers: HandlerRegistry::new(),
        }
    }

    /// Register a capability in the dispatch table
    pub fn register_handler(&mut self, handler: Arc<dyn ActionHandler>) -> HandlerId {
        self.handlers.register(handler)
    }

    /// Register a plain closure in the dispatch table
    pub fn register_handler_fn(
        &mut self,
        handler: impl Fn(ActionValue) + Send + Sync + 'static,
    ) -> HandlerId {
        self.handlers.register_fn(handler)
    }

    /// Insert a target.
    ///
    /// Re-registering an id that is already present replaces the stored
    /// target in place, so repeated layout passes cannot grow the registry.
    #[must_use = "this returns a Result that should be handled"]
    pub fn register(&mut self, target: Target) -> Result<(), RegistryError> {
        if target.description.trim().is_empty() {
            return Err(RegistryError::EmptyDescription);
        }
        if !self.handlers.contains(target.handler) {
            return Err(RegistryError::UnknownHandler(target.handler));
        }

        if let Some(existing) = self.targets.iter_mut().find(|t| t.id == target.id) {
            *existing = target;
        } else {
            self.targets.push(target);
        }
        Ok(())
    }

    /// Look up a target by id; absent is not an error
    pub fn resolve(&self, id: Uuid) -> Option<&Target> {
        self.targets.iter().find(|t| t.id == id)
    }

    /// Look up a capability by handler id
    pub fn handler(&self, id: HandlerId) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(id)
    }

    /// Resolve a target id straight to its capability
    pub fn lookup_command(&self, id: Uuid) -> Option<Arc<dyn ActionHandler>> {
        self.resolve(id).and_then(|t| self.handlers.get(t.handler))
    }

    /// The targets of one screen, in registration order
    pub fn snapshot(&self, screen: &str) -> Vec<&Target> {
        self.targets.iter().filter(|t| t.screen == screen).collect()
    }

    /// Drop all targets of one screen, for rebuild on re-entry.
    /// Handlers stay registered; their lifecycle is independent.
    pub fn clear_screen(&mut self, screen: &str) {
        self.targets.retain(|t| t.screen != screen);
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl Default for TargetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
