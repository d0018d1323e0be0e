pub mod agent;
pub mod backend;
pub mod orchestrator;

pub use agent::{PlannerFactory, PlanningPhase, TravelAgent};
pub use backend::ModelBackend;
pub use orchestrator::ModelOrchestrator;
