// OpenAI-compatible chat completion adapter
//
// Keeps the conversation history in memory so the interpreter retains the
// behavioral contract and control maps across calls.

use super::{Interpreter, InterpreterConfig, InterpreterError};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

/// Chat-completions interpreter for OpenAI-compatible providers
pub struct OpenAiInterpreter {
    client: reqwest::Client,
    config: InterpreterConfig,
    history: Mutex<Vec<ChatMessage>>,
}

impl OpenAiInterpreter {
    /// Build a client for the given configuration
    pub fn new(config: InterpreterConfig) -> Result<Self, InterpreterError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if config.has_credentials() {
            let bearer = format!("Bearer {}", config.api_key);
            let value = HeaderValue::from_str(&bearer)
                .map_err(|_| InterpreterError::Config("API key is not a valid header value".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            config,
            history: Mutex::new(Vec::new()),
        })
    }

    /// Build a client configured from the environment
    pub fn from_env() -> Result<Self, InterpreterError> {
        Self::new(InterpreterConfig::from_env())
    }

    /// Number of messages retained in the conversation history
    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }
}

#[async_trait]
impl Interpreter for OpenAiInterpreter {
    async fn send(&self, text: &str) -> Result<String, InterpreterError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let messages = {
            let history = self.history.lock();
            let mut messages = Vec::with_capacity(history.len() + 2);
            messages.push(ChatMessage::new("system", self.config.system_text.clone()));
            messages.extend(history.iter().cloned());
            messages.push(ChatMessage::new("user", text));
            messages
        };

        crate::debug!("sending interpreter request to {}", url);

        let response = self
            .client
            .post(&url)
            .json(&ChatCompletionRequest {
                model: self.config.model.clone(),
                messages,
                temperature: self.config.temperature,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error response".to_string());
            return Err(InterpreterError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let reply = completion
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or(InterpreterError::EmptyReply)?;

        let mut history = self.history.lock();
        history.push(ChatMessage::new("user", text));
        history.push(ChatMessage::new("assistant", reply.clone()));

        Ok(reply)
    }

    fn clear_history(&self) {
        self.history.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_with_default_config() {
        let interpreter = OpenAiInterpreter::new(InterpreterConfig::default()).unwrap();
        assert_eq!(interpreter.history_len(), 0);
    }

    #[test]
    fn test_invalid_api_key_is_a_config_error() {
        let config = InterpreterConfig {
            api_key: "bad\nkey".to_string(),
            ..InterpreterConfig::default()
        };
        assert!(matches!(
            OpenAiInterpreter::new(config),
            Err(InterpreterError::Config(_))
        ));
    }

    #[test]
    fn test_clear_history() {
        let interpreter = OpenAiInterpreter::new(InterpreterConfig::default()).unwrap();
        interpreter
            .history
            .lock()
            .push(ChatMessage::new("user", "hello"));
        assert_eq!(interpreter.history_len(), 1);
        interpreter.clear_history();
        assert_eq!(interpreter.history_len(), 0);
    }
}
