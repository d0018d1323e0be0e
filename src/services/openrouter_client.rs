use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::DEFAULT_OPENROUTER_BASE_URL;
use crate::core::backend::ModelBackend;
use crate::error::{BackendError, PlannerError, Result};

/// Secondary backend: OpenRouter's OpenAI-compatible chat completions.
#[derive(Clone, Debug)]
pub struct OpenRouterClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    models: Vec<String>,
    timeout: Duration,
}

impl OpenRouterClient {
    pub fn new(api_key: Option<String>, models: Vec<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| PlannerError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_OPENROUTER_BASE_URL.to_string(),
            models,
            timeout,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl ModelBackend for OpenRouterClient {
    fn name(&self) -> &str {
        "openrouter"
    }

    fn candidates(&self) -> &[String] {
        &self.models
    }

    fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn generate(&self, prompt: &str, model: &str) -> std::result::Result<String, BackendError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| BackendError::MissingCredential("OPENROUTER_API_KEY".to_string()))?;

        let body = json!({
            "model": model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post(build_chat_url(&self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", "https://github.com/trip-planner-rs/trip-planner-rs")
            .header("X-Title", "trip-planner-rs")
            .json(&body)
            .send()
            .await
            .map_err(|err| BackendError::from_transport(&err, self.timeout))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|err| BackendError::from_transport(&err, self.timeout))?;

        if !status.is_success() {
            let api_message = serde_json::from_str::<Value>(&response_text)
                .ok()
                .and_then(|value| {
                    value
                        .pointer("/error/message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or(response_text);
            return Err(BackendError::from_status(status.as_u16(), &api_message));
        }

        let response_json: Value = serde_json::from_str(&response_text)
            .map_err(|err| BackendError::Other(format!("Failed to parse JSON: {err}")))?;

        // OpenRouter reports some upstream failures inside a 200 body
        if let Some(error) = response_json.get("error") {
            let code = error_status(error);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(BackendError::from_status(code, &message));
        }

        response_json
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .filter(|content| !content.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| BackendError::Other(format!("empty response from {model}")))
    }
}

/// HTTP-like status from an in-body error; anything outside `u16` is a server error.
fn error_status(error: &Value) -> u16 {
    error
        .get("code")
        .and_then(Value::as_u64)
        .and_then(|code| u16::try_from(code).ok())
        .unwrap_or(500)
}

fn build_chat_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/chat/completions") {
        trimmed.to_string()
    } else {
        format!("{}/chat/completions", trimmed)
    }
}
