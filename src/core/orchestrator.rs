use std::sync::Arc;
use tokio::time::timeout;
use tracing::{info, warn};

use super::backend::ModelBackend;
use crate::error::{BackendError, PlannerError, Result};

/// Tries every candidate model of the primary backend, then of the secondary,
/// returning the first successful response.
#[derive(Debug, Clone, Default)]
pub struct ModelOrchestrator {
    primary: Option<Arc<dyn ModelBackend>>,
    secondary: Option<Arc<dyn ModelBackend>>,
}

impl ModelOrchestrator {
    pub fn new(
        primary: Option<Arc<dyn ModelBackend>>,
        secondary: Option<Arc<dyn ModelBackend>>,
    ) -> Self {
        Self { primary, secondary }
    }

    pub fn with_primary(mut self, backend: Arc<dyn ModelBackend>) -> Self {
        self.primary = Some(backend);
        self
    }

    pub fn with_secondary(mut self, backend: Arc<dyn ModelBackend>) -> Self {
        self.secondary = Some(backend);
        self
    }

    /// Send `prompt` down the fallback chain.
    ///
    /// No retries beyond the candidate lists. Fails with
    /// [`PlannerError::NoCredentials`] when no backend could be tried, otherwise
    /// with [`PlannerError::AllCandidatesFailed`] carrying the last attempt's error.
    pub async fn call_with_fallback(&self, prompt: &str) -> Result<String> {
        let mut last_error: Option<BackendError> = None;
        let mut attempted_any = false;

        for backend in [&self.primary, &self.secondary].into_iter().flatten() {
            if !backend.has_credential() {
                warn!(
                    target: "trip_planner::orchestrator",
                    backend = backend.name(),
                    "no credential configured, skipping backend"
                );
                continue;
            }
            attempted_any = true;

            for model in backend.candidates() {
                let limit = backend.timeout();
                let outcome = match timeout(limit, backend.generate(prompt, model)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(BackendError::Timeout(limit)),
                };

                match outcome {
                    Ok(text) => {
                        info!(
                            target: "trip_planner::orchestrator",
                            backend = backend.name(),
                            model = model.as_str(),
                            "model call succeeded"
                        );
                        return Ok(text);
                    }
                    Err(err) => {
                        warn!(
                            target: "trip_planner::orchestrator",
                            backend = backend.name(),
                            model = model.as_str(),
                            error = %err,
                            "model call failed"
                        );
                        last_error = Some(err);
                    }
                }
            }
        }

        if !attempted_any {
            return Err(PlannerError::NoCredentials(
                "set GOOGLE_API_KEY or OPENROUTER_API_KEY".to_string(),
            ));
        }

        Err(PlannerError::AllCandidatesFailed(last_error.unwrap_or_else(
            || BackendError::Other("no candidate models configured".to_string()),
        )))
    }
}
