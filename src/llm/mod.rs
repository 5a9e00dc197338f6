//! Chat-completion seam used by the classifier, normalizer and generator.

pub mod extract;
pub mod openai;
pub mod prompts;

use std::time::Duration;

use serde::Serialize;

use crate::error::LlmError;

pub use openai::OpenAiClient;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage { role: "user".to_string(), content: content.into() }
    }
}

/// One completion request. `timeout: None` waits indefinitely.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout: Option<Duration>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, system: impl Into<String>, user: impl Into<String>) -> Self {
        ChatRequest {
            model: model.into(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: 0.0,
            max_tokens: None,
            timeout: None,
        }
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = temp;
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Blocking chat completion returning the first choice's text.
pub trait ChatClient {
    fn complete(&self, request: &ChatRequest) -> Result<String, LlmError>;
}

impl<C: ChatClient + ?Sized> ChatClient for &C {
    fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        (**self).complete(request)
    }
}
