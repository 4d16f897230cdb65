// External natural-language interpreter boundary
//
// The interpreter is a stateless request/reply text channel from the
// engine's point of view; conversation history is the adapter's own
// business and the host may clear it when a session restarts.

pub mod offline;
pub mod openai;

pub use offline::OfflineInterpreter;
pub use openai::OpenAiInterpreter;

use async_trait::async_trait;
use std::env;

/// Environment variable overriding the provider endpoint
pub const BASE_URL_ENV: &str = "VOXCTL_BASE_URL";
/// Environment variable holding the provider credential
pub const API_KEY_ENV: &str = "VOXCTL_API_KEY";
/// Environment variable selecting the model
pub const MODEL_ENV: &str = "VOXCTL_MODEL";
/// Environment variable tuning the sampling temperature
pub const TEMPERATURE_ENV: &str = "VOXCTL_TEMPERATURE";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.5;
pub const DEFAULT_SYSTEM_TEXT: &str = "You are a helpful assistant";

/// Errors from an interpreter call. No implicit retries anywhere.
#[derive(Debug, thiserror::Error)]
pub enum InterpreterError {
    /// Network or protocol failure
    #[error("interpreter transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    /// The provider rejected the request
    #[error("interpreter request failed with status {status}: {body}")]
    Api { status: u16, body: String },
    /// The provider returned no usable content
    #[error("interpreter returned an empty reply")]
    EmptyReply,
    /// The adapter configuration cannot be used
    #[error("invalid interpreter configuration: {0}")]
    Config(String),
}

/// Async request/reply channel to the natural-language interpreter
#[async_trait]
pub trait Interpreter: Send + Sync {
    /// Send one message and await the full reply text
    async fn send(&self, text: &str) -> Result<String, InterpreterError>;

    /// Drop accumulated conversation state
    fn clear_history(&self);
}

/// Behavioral parameters of the interpreter adapter
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Provider endpoint, without the trailing path
    pub base_url: String,
    /// Provider credential; may be empty for local providers
    pub api_key: String,
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// System message prefixed to every exchange
    pub system_text: String,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            system_text: DEFAULT_SYSTEM_TEXT.to_string(),
        }
    }
}

impl InterpreterConfig {
    /// Read the configuration from the environment, falling back to the
    /// defaults for anything unset or blank.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env_or(BASE_URL_ENV, &defaults.base_url)
                .trim_end_matches('/')
                .to_string(),
            api_key: env_or(API_KEY_ENV, &defaults.api_key),
            model: env_or(MODEL_ENV, &defaults.model),
            temperature: env::var(TEMPERATURE_ENV)
                .ok()
                .and_then(|raw| raw.trim().parse().ok())
                .unwrap_or(defaults.temperature),
            system_text: defaults.system_text,
        }
    }

    /// Whether a credential is configured
    pub fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_env_uses_defaults_when_unset() {
        std::env::remove_var(BASE_URL_ENV);
        std::env::remove_var(API_KEY_ENV);
        std::env::remove_var(MODEL_ENV);
        std::env::remove_var(TEMPERATURE_ENV);

        let config = InterpreterConfig::from_env();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
        assert!(!config.has_credentials());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides_and_strips_trailing_slash() {
        std::env::set_var(BASE_URL_ENV, "http://localhost:11434/v1/");
        std::env::set_var(MODEL_ENV, "llama3");
        std::env::set_var(TEMPERATURE_ENV, "0.2");

        let config = InterpreterConfig::from_env();
        assert_eq!(config.base_url, "http://localhost:11434/v1");
        assert_eq!(config.model, "llama3");
        assert_eq!(config.temperature, 0.2);

        std::env::remove_var(BASE_URL_ENV);
        std::env::remove_var(MODEL_ENV);
        std::env::remove_var(TEMPERATURE_ENV);
    }

    #[test]
    #[serial]
    fn test_blank_env_values_fall_back() {
        std::env::set_var(MODEL_ENV, "   ");
        std::env::set_var(TEMPERATURE_ENV, "warm");

        let config = InterpreterConfig::from_env();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);

        std::env::remove_var(MODEL_ENV);
        std::env::remove_var(TEMPERATURE_ENV);
    }
}
