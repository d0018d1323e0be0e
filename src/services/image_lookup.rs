use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

use crate::error::{PlannerError, Result};

const DUCKDUCKGO_BASE_URL: &str = "https://duckduckgo.com";
const FALLBACK_IMAGE_BASE_URL: &str = "https://image.pollinations.ai/prompt";
const FALLBACK_QUALIFIER: &str = "aesthetic";
const FALLBACK_WIDTH: u32 = 800;
const FALLBACK_HEIGHT: u32 = 600;

/// Resolves a text query to a direct image URL.
#[async_trait]
pub trait ImageLookup: Send + Sync + std::fmt::Debug {
    /// `Ok(None)` when nothing matched; errors are treated the same way by callers.
    async fn find_image(&self, query: &str) -> Result<Option<String>>;
}

/// Lookup that never finds anything, so every activity gets a generated image.
#[derive(Debug, Default, Clone)]
pub struct NoImageLookup;

#[async_trait]
impl ImageLookup for NoImageLookup {
    async fn find_image(&self, _query: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Image search backed by DuckDuckGo's image endpoint.
#[derive(Debug, Clone)]
pub struct DuckDuckGoImageLookup {
    client: Client,
    base_url: String,
}

impl DuckDuckGoImageLookup {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("TripPlanner/1.0")
            .build()
            .map_err(|err| PlannerError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: DUCKDUCKGO_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The image endpoint needs a per-query `vqd` token scraped from the search page.
    async fn fetch_token(&self, query: &str) -> std::result::Result<Option<String>, reqwest::Error> {
        let page = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[("q", query), ("iax", "images"), ("ia", "images")])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(extract_vqd(&page))
    }

    async fn search(&self, query: &str) -> std::result::Result<Option<String>, reqwest::Error> {
        let Some(vqd) = self.fetch_token(query).await? else {
            debug!(target: "trip_planner::images", query, "no search token in response");
            return Ok(None);
        };

        let body: Value = self
            .client
            .get(format!("{}/i.js", self.base_url))
            .query(&[
                ("l", "us-en"),
                ("o", "json"),
                ("q", query),
                ("vqd", vqd.as_str()),
                ("f", ",,,,,"),
                ("p", "1"),
            ])
            .header("Referer", format!("{}/", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(body
            .get("results")
            .and_then(Value::as_array)
            .and_then(|results| results.first())
            .and_then(|first| first.get("image"))
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string))
    }
}

#[async_trait]
impl ImageLookup for DuckDuckGoImageLookup {
    async fn find_image(&self, query: &str) -> Result<Option<String>> {
        self.search(query)
            .await
            .map_err(|err| PlannerError::ImageLookup(format!("{query}: {err}")))
    }
}

fn extract_vqd(page: &str) -> Option<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r#"vqd=["']?([\d-]+)["']?"#).expect("vqd pattern is valid")
    });
    pattern
        .captures(page)
        .and_then(|captures| captures.get(1))
        .map(|token| token.as_str().to_string())
}

/// Query used for both search and the generated fallback: activity name plus city.
pub fn image_query(activity_name: &str, city: &str) -> String {
    format!("{} {}", activity_name, city).trim().to_string()
}

/// Deterministic generated-image URL for a query.
pub fn fallback_image_url(query: &str) -> String {
    let prompt = format!("{} {}", query, FALLBACK_QUALIFIER);
    format!(
        "{}/{}?width={}&height={}&nologo=true",
        FALLBACK_IMAGE_BASE_URL,
        urlencoding::encode(prompt.trim()),
        FALLBACK_WIDTH,
        FALLBACK_HEIGHT
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_url_encodes_query() {
        let url = fallback_image_url(&image_query("Eiffel Tower", "Paris"));
        assert_eq!(
            url,
            "https://image.pollinations.ai/prompt/Eiffel%20Tower%20Paris%20aesthetic?width=800&height=600&nologo=true"
        );
    }

    #[test]
    fn fallback_url_is_deterministic() {
        let query = image_query("Café de Flore", "Paris");
        assert_eq!(fallback_image_url(&query), fallback_image_url(&query));
        assert!(fallback_image_url(&query).contains(urlencoding::encode("Café de Flore").as_ref()));
    }

    #[test]
    fn vqd_token_extraction() {
        assert_eq!(
            extract_vqd(r#"<script>vqd="4-123456789012345";</script>"#).as_deref(),
            Some("4-123456789012345")
        );
        assert_eq!(extract_vqd("vqd=4-99&other").as_deref(), Some("4-99"));
        assert_eq!(extract_vqd("<html>nothing</html>"), None);
    }

    #[tokio::test]
    async fn no_lookup_finds_nothing() {
        assert_eq!(NoImageLookup.find_image("anything").await.unwrap(), None);
    }
}
