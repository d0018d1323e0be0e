use async_stream::stream;
use futures::{pin_mut, Stream, StreamExt};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::orchestrator::ModelOrchestrator;
use crate::{
    config::{PlannerConfig, DEFAULT_MAX_REPAIRS},
    error::{PlannerError, Result},
    services::{
        gemini_client::GeminiClient,
        image_lookup::{DuckDuckGoImageLookup, ImageLookup, NoImageLookup},
        normalizer::{Normalizer, ParsedItinerary},
        openrouter_client::OpenRouterClient,
        prompts::{build_initial_prompt, build_repair_prompt},
        validator::check_constraints,
    },
    types::{Itinerary, PlanEvent, TripPreferences},
};

/// States of one planning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanningPhase {
    InitialGeneration,
    Validating,
    Repairing { attempt: usize },
    Finalized,
}

impl fmt::Display for PlanningPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanningPhase::InitialGeneration => write!(f, "initial_generation"),
            PlanningPhase::Validating => write!(f, "validating"),
            PlanningPhase::Repairing { attempt } => write!(f, "repairing({attempt})"),
            PlanningPhase::Finalized => write!(f, "finalized"),
        }
    }
}

fn enter(phase: PlanningPhase) {
    info!(target: "trip_planner::agent", phase = %phase, "entering planning phase");
}

/// Generates an itinerary, then validates and re-plans it until the
/// constraints hold or the repair budget runs out.
///
/// One agent serves one planning run; build a fresh one per request with
/// [`PlannerFactory::build`].
#[derive(Debug)]
pub struct TravelAgent {
    orchestrator: ModelOrchestrator,
    normalizer: Normalizer,
    max_repairs: usize,
}

impl TravelAgent {
    pub fn new(orchestrator: ModelOrchestrator, normalizer: Normalizer) -> Self {
        Self {
            orchestrator,
            normalizer,
            max_repairs: DEFAULT_MAX_REPAIRS,
        }
    }

    pub fn with_max_repairs(mut self, max_repairs: usize) -> Self {
        self.max_repairs = max_repairs;
        self
    }

    pub fn max_repairs(&self) -> usize {
        self.max_repairs
    }

    /// Run the planner, yielding progress notifications followed by exactly
    /// one terminal [`PlanEvent::Finished`] or [`PlanEvent::Failed`].
    pub fn plan_trip_stream<'a>(
        &'a self,
        preferences: &'a TripPreferences,
    ) -> impl Stream<Item = PlanEvent> + Send + 'a {
        stream! {
            if let Err(err) = preferences.validate() {
                yield PlanEvent::Failed(err);
                return;
            }

            enter(PlanningPhase::InitialGeneration);
            yield PlanEvent::status("Step 1 - Breaking plan into days & allocating activities...");
            let mut current = match self.generate_initial_plan(preferences).await {
                Ok(parsed) => parsed,
                Err(err) => {
                    error!(target: "trip_planner::agent", error = %err, "initial generation failed");
                    yield PlanEvent::Failed(err);
                    return;
                }
            };
            yield PlanEvent::status(format!(
                "Initial allocation complete. Estimated Cost: ${:.2}",
                current.itinerary.total_cost()
            ));

            enter(PlanningPhase::Validating);
            yield PlanEvent::status("Step 2 - Verifying budget & time constraints...");
            let mut valid = check_constraints(&mut current.itinerary, preferences);

            if !valid {
                yield PlanEvent::status("Step 3 - Constraints violated. Initiating Re-planning Loop...");
            }

            let mut attempt = 0;
            while !valid && attempt < self.max_repairs {
                attempt += 1;
                enter(PlanningPhase::Repairing { attempt });

                let violation = current
                    .itinerary
                    .validation_error
                    .clone()
                    .unwrap_or_else(|| "Unknown validation error".to_string());
                yield PlanEvent::status(format!("Constraint Violation: {violation}"));
                yield PlanEvent::status(format!(
                    "Re-planning attempt {attempt}/{}...",
                    self.max_repairs
                ));

                current = match self.refine_plan(preferences, &current, &violation).await {
                    Ok(parsed) => parsed,
                    Err(err) => {
                        error!(target: "trip_planner::agent", error = %err, attempt, "re-planning failed");
                        yield PlanEvent::Failed(err);
                        return;
                    }
                };

                enter(PlanningPhase::Validating);
                valid = check_constraints(&mut current.itinerary, preferences);
            }

            if !valid {
                yield PlanEvent::status(
                    "Warning: Constraints not fully met after re-planning. Returning best effort.",
                );
            }

            enter(PlanningPhase::Finalized);
            yield PlanEvent::status("Step 4 - Finalizing itinerary & generating artifacts...");
            yield PlanEvent::Finished(current.itinerary);
        }
    }

    /// Blocking form of [`Self::plan_trip_stream`]: progress is only logged.
    pub async fn plan_trip(&self, preferences: &TripPreferences) -> Result<Itinerary> {
        let events = self.plan_trip_stream(preferences);
        pin_mut!(events);

        while let Some(event) = events.next().await {
            match event {
                PlanEvent::Status(message) => {
                    debug!(target: "trip_planner::agent", status = %message, "planning progress")
                }
                PlanEvent::Finished(itinerary) => return Ok(itinerary),
                PlanEvent::Failed(err) => return Err(err),
            }
        }

        Err(PlannerError::Incomplete(
            "progress stream closed before a terminal event".to_string(),
        ))
    }

    async fn generate_initial_plan(&self, preferences: &TripPreferences) -> Result<ParsedItinerary> {
        let prompt = build_initial_prompt(preferences);
        let raw = self.orchestrator.call_with_fallback(&prompt).await?;
        Ok(self.normalizer.parse_response(&raw, &preferences.city).await)
    }

    async fn refine_plan(
        &self,
        preferences: &TripPreferences,
        previous: &ParsedItinerary,
        violation: &str,
    ) -> Result<ParsedItinerary> {
        let strict_json = needs_strict_json(previous);
        let prompt = build_repair_prompt(
            preferences,
            previous.itinerary.total_cost(),
            violation,
            strict_json,
        );
        debug!(target: "trip_planner::agent", strict_json, "requesting repaired plan");

        let raw = self.orchestrator.call_with_fallback(&prompt).await?;
        Ok(self.normalizer.parse_response(&raw, &preferences.city).await)
    }
}

/// A plan with no days or a degraded response means the model ignored the format.
fn needs_strict_json(previous: &ParsedItinerary) -> bool {
    previous.itinerary.days.is_empty() || previous.is_degraded()
}

/// Builds a fully wired [`TravelAgent`] per planning run.
#[derive(Debug, Clone, Default)]
pub struct PlannerFactory {
    config: PlannerConfig,
}

impl PlannerFactory {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(PlannerConfig::from_env()?))
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Fresh HTTP clients and counters; nothing is shared with earlier runs.
    pub fn build(&self) -> Result<TravelAgent> {
        let config = &self.config;

        let primary = GeminiClient::new(
            config.google_api_key.clone(),
            config.primary_models.clone(),
            config.primary_timeout,
        )?
        .with_base_url(config.gemini_base_url.clone())
        .with_grounding(config.grounding);

        let secondary = OpenRouterClient::new(
            config.openrouter_api_key.clone(),
            config.secondary_models.clone(),
            config.fallback_timeout,
        )?
        .with_base_url(config.openrouter_base_url.clone());

        let image_lookup: Arc<dyn ImageLookup> = if config.image_search {
            Arc::new(DuckDuckGoImageLookup::new(config.image_timeout)?)
        } else {
            Arc::new(NoImageLookup)
        };

        let orchestrator = ModelOrchestrator::new(Some(Arc::new(primary)), Some(Arc::new(secondary)));

        Ok(TravelAgent::new(orchestrator, Normalizer::new(image_lookup))
            .with_max_repairs(config.max_repairs))
    }

    /// Build an agent and run one blocking planning pass.
    pub async fn plan_trip(&self, preferences: &TripPreferences) -> Result<Itinerary> {
        self.build()?.plan_trip(preferences).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NormalizeError;

    #[test]
    fn phase_display() {
        assert_eq!(PlanningPhase::Repairing { attempt: 2 }.to_string(), "repairing(2)");
        assert_eq!(PlanningPhase::Finalized.to_string(), "finalized");
    }

    #[test]
    fn strict_json_after_empty_or_degraded_plan() {
        let empty = ParsedItinerary {
            itinerary: Itinerary::empty("Rome"),
            degradation: None,
        };
        assert!(needs_strict_json(&empty));

        let degraded = ParsedItinerary {
            itinerary: Itinerary::empty("Rome"),
            degradation: Some(NormalizeError::Parse("no JSON".into())),
        };
        assert!(needs_strict_json(&degraded));
    }

    #[test]
    fn factory_builds_without_credentials() {
        let config = PlannerConfig {
            image_search: false,
            max_repairs: 1,
            ..PlannerConfig::default()
        };
        let agent = PlannerFactory::new(config).build().unwrap();
        assert_eq!(agent.max_repairs(), 1);
    }

    #[tokio::test]
    async fn invalid_preferences_fail_before_any_model_call() {
        let agent = TravelAgent::new(ModelOrchestrator::default(), Normalizer::default());
        let err = agent
            .plan_trip(&TripPreferences::new("Rome", 100.0, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, PlannerError::InvalidPreferences(_)));
    }

    #[tokio::test]
    async fn no_backends_fail_with_no_credentials() {
        let agent = TravelAgent::new(ModelOrchestrator::default(), Normalizer::default());
        let err = agent
            .plan_trip(&TripPreferences::new("Rome", 100.0, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, PlannerError::NoCredentials(_)));
    }
}
