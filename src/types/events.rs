use serde_json::{json, Value};

use super::itinerary::Itinerary;
use crate::error::PlannerError;

/// One item of a streamed planning run.
///
/// A run yields any number of `Status` items followed by exactly one
/// terminal `Finished` or `Failed`.
#[derive(Debug)]
pub enum PlanEvent {
    /// Human-readable progress notification
    Status(String),
    /// Final plan, valid or best-effort
    Finished(Itinerary),
    /// Every model candidate failed
    Failed(PlannerError),
}

impl PlanEvent {
    pub fn status(message: impl Into<String>) -> Self {
        PlanEvent::Status(message.into())
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PlanEvent::Status(_))
    }

    /// Get a human-readable description of the event
    pub fn describe(&self) -> String {
        match self {
            PlanEvent::Status(message) => format!("🧭 {}", message),
            PlanEvent::Finished(plan) => format!(
                "✅ Itinerary for {}: {} days, ${:.2} (valid: {})",
                plan.city,
                plan.day_count(),
                plan.total_cost(),
                plan.valid
            ),
            PlanEvent::Failed(error) => format!("❌ {}", error),
        }
    }

    /// NDJSON record for live progress streaming.
    ///
    /// Failures carry only the user-safe message; the full error stays with
    /// the operator logs.
    pub fn to_wire(&self) -> Value {
        match self {
            PlanEvent::Status(message) => json!({ "type": "status", "message": message }),
            PlanEvent::Finished(plan) => json!({ "type": "result", "data": plan }),
            PlanEvent::Failed(error) => json!({ "type": "error", "message": error.user_message() }),
        }
    }
}
