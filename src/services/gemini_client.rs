use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::DEFAULT_GEMINI_BASE_URL;
use crate::core::backend::ModelBackend;
use crate::error::{BackendError, PlannerError, Result};

/// Primary backend: the Gemini `generateContent` REST API.
#[derive(Clone, Debug)]
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    models: Vec<String>,
    timeout: Duration,
    grounding: bool,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, models: Vec<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| PlannerError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            models,
            timeout,
            grounding: true,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_grounding(mut self, grounding: bool) -> Self {
        self.grounding = grounding;
        self
    }

    /// Search grounding and a JSON response MIME type cannot be combined.
    fn request_body(&self, prompt: &str) -> Value {
        let mut body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });
        if self.grounding {
            body["tools"] = json!([{ "google_search": {} }]);
        } else {
            body["generationConfig"] = json!({ "responseMimeType": "application/json" });
        }
        body
    }
}

#[async_trait]
impl ModelBackend for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
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
            .ok_or_else(|| BackendError::MissingCredential("GOOGLE_API_KEY".to_string()))?;

        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|err| BackendError::from_transport(&err, self.timeout))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|err| BackendError::from_transport(&err, self.timeout))?;

        if !status.is_success() {
            return Err(BackendError::from_status(status.as_u16(), &response_text));
        }

        let response_json: Value = serde_json::from_str(&response_text)
            .map_err(|err| BackendError::Other(format!("Failed to parse JSON: {err}")))?;

        let text = extract_candidate_text(&response_json);
        if text.trim().is_empty() {
            return Err(BackendError::Other(format!(
                "empty response from {model}"
            )));
        }
        Ok(text)
    }
}

fn extract_candidate_text(response: &Value) -> String {
    response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}
