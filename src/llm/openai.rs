//! OpenAI-compatible `/chat/completions` client (blocking).

use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::extract::decode_lossy;
use super::{ChatClient, ChatMessage, ChatRequest};
use crate::error::LlmError;
use crate::settings::Settings;

pub struct OpenAiClient {
    http: Client,
    api_key: String,
    endpoint: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, api_base: &str) -> Result<Self, LlmError> {
        // Per-request timeouts are set in `complete`; the client itself never times out.
        let http = Client::builder().timeout(None::<Duration>).build()?;
        Ok(OpenAiClient {
            http,
            api_key: api_key.into(),
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, LlmError> {
        let key = settings
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(LlmError::MissingApiKey)?;
        Self::new(key, &settings.api_base)
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatClient for OpenAiClient {
    fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let body = WireRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let mut builder = self.http.post(&self.endpoint).bearer_auth(&self.api_key).json(&body);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let start = Instant::now();
        let response = builder.send()?;
        let status = response.status();
        let bytes = response.bytes()?;
        debug!(
            model = %request.model,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "chat completion returned"
        );

        let text = decode_lossy(&bytes);
        if !status.is_success() {
            return Err(LlmError::Status { status: status.as_u16(), body: text });
        }

        let parsed: WireResponse = serde_json::from_str(&text).map_err(|e| LlmError::Status {
            status: status.as_u16(),
            body: format!("malformed completion body: {}", e),
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(LlmError::EmptyCompletion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base() {
        let c = OpenAiClient::new("k", "http://localhost:5001/v1/").unwrap();
        assert_eq!(c.endpoint, "http://localhost:5001/v1/chat/completions");
    }

    #[test]
    fn missing_key_is_an_error() {
        let s = Settings { api_key: Some(String::new()), ..Settings::default() };
        assert!(matches!(OpenAiClient::from_settings(&s), Err(LlmError::MissingApiKey)));
    }

    #[test]
    fn wire_request_skips_absent_max_tokens() {
        let msgs = vec![ChatMessage::user("hi")];
        let body = WireRequest { model: "gpt-4o", messages: &msgs, temperature: 0.0, max_tokens: None };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("max_tokens").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
