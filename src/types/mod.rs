pub mod events;
pub mod itinerary;

pub use events::PlanEvent;
pub use itinerary::{Activity, DayPlan, Itinerary, TripPreferences, DEFAULT_TAG, UNKNOWN_CITY};
