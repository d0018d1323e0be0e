//! trip-planner-rs: budget- and calendar-aware travel itineraries from LLMs
//!
//! A planning run asks a model for a day-by-day plan, reshapes whatever the
//! model returned into a typed [`Itinerary`], checks it against the
//! traveler's budget and trip length, and re-plans a bounded number of times
//! when the constraints are not met.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use trip_planner_rs::{PlannerFactory, TripPreferences};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let factory = PlannerFactory::from_env()?;
//!     let preferences = TripPreferences::new("Lisbon", 800.0, 3).with_interests(["Food"]);
//!
//!     let itinerary = factory.plan_trip(&preferences).await?;
//!     println!("{} days, ${:.2}", itinerary.day_count(), itinerary.total_cost());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod render;
pub mod schemas;
pub mod services;
pub mod types;

pub use config::PlannerConfig;
pub use crate::core::{ModelBackend, ModelOrchestrator, PlannerFactory, PlanningPhase, TravelAgent};
pub use error::{BackendError, ErrorCategory, NormalizeError, PlannerError, Result};
pub use services::{ImageLookup, Normalizer, ParsedItinerary};
pub use types::{Activity, DayPlan, Itinerary, PlanEvent, TripPreferences};

#[cfg(feature = "cli")]
pub mod cli;
