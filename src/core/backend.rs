use async_trait::async_trait;
use std::time::Duration;

use crate::error::BackendError;

/// A model API reachable through an ordered list of candidate models.
#[async_trait]
pub trait ModelBackend: Send + Sync + std::fmt::Debug {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Model identifiers in priority order
    fn candidates(&self) -> &[String];

    /// Whether a credential is configured; backends without one are skipped
    fn has_credential(&self) -> bool;

    /// Upper bound for a single `generate` call
    fn timeout(&self) -> Duration;

    /// Send `prompt` to `model` and return the raw response text.
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, BackendError>;
}
