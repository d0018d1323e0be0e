use schemars::JsonSchema;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{PlannerError, Result};

/// Placeholder tag assigned to activities the model left untagged.
pub const DEFAULT_TAG: &str = "General";

/// City label used when neither the model nor the caller supplied one.
pub const UNKNOWN_CITY: &str = "Unknown";

/// Immutable input to a single planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripPreferences {
    /// Destination name; may name several cities ("Paris and London")
    #[serde(alias = "destination")]
    pub city: String,
    /// Total budget in USD
    pub budget: f64,
    /// Requested trip length in days
    pub days: u32,
    /// Free-text interest tags ("Art", "Food", ...)
    #[serde(default)]
    pub interests: Vec<String>,
    /// Optional start date, `YYYY-MM-DD` or `DD-MM-YYYY`
    #[serde(default)]
    pub start_date: Option<String>,
}

impl TripPreferences {
    pub fn new(city: impl Into<String>, budget: f64, days: u32) -> Self {
        Self {
            city: city.into(),
            budget,
            days,
            interests: Vec::new(),
            start_date: None,
        }
    }

    pub fn with_interests<I, S>(mut self, interests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interests = interests.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_start_date(mut self, start_date: impl Into<String>) -> Self {
        self.start_date = Some(start_date.into());
        self
    }

    /// Reject preferences no planning run can satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.city.trim().is_empty() {
            return Err(PlannerError::InvalidPreferences(
                "destination must not be empty".to_string(),
            ));
        }
        if !self.budget.is_finite() || self.budget < 0.0 {
            return Err(PlannerError::InvalidPreferences(format!(
                "budget must be a non-negative number, got {}",
                self.budget
            )));
        }
        if self.days == 0 {
            return Err(PlannerError::InvalidPreferences(
                "trip must last at least one day".to_string(),
            ));
        }
        Ok(())
    }
}

/// A single priced, tagged activity within a day.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct Activity {
    /// Activity or venue name
    pub name: String,
    /// Short description shown to the traveler
    pub description: String,
    /// Estimated cost in USD
    pub cost: f64,
    /// Estimated duration in hours
    pub duration_hours: f64,
    /// Duration as the model phrased it ("1-2 hours"), kept for display
    #[serde(default)]
    pub duration_str: String,
    /// Interest tags
    pub tags: Vec<String>,
    /// Direct image URL for the activity
    #[serde(default)]
    pub image_url: Option<String>,
}

/// One day of the itinerary.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct DayPlan {
    /// 1-based day index
    pub day_number: u32,
    /// City the traveler is in on this day (multi-city trips)
    #[serde(default)]
    pub city: Option<String>,
    /// Activities in chronological order
    pub activities: Vec<Activity>,
}

impl DayPlan {
    pub fn new(day_number: u32, activities: Vec<Activity>) -> Self {
        Self {
            day_number,
            city: None,
            activities,
        }
    }

    pub fn total_cost(&self) -> f64 {
        self.activities.iter().map(|activity| activity.cost).sum()
    }
}

impl Serialize for DayPlan {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DayPlan", 4)?;
        state.serialize_field("day_number", &self.day_number)?;
        match &self.city {
            Some(city) => state.serialize_field("city", city)?,
            None => state.skip_field("city")?,
        }
        state.serialize_field("activities", &self.activities)?;
        state.serialize_field("total_cost", &self.total_cost())?;
        state.end()
    }
}

/// The full multi-day travel plan.
///
/// `total_cost` is never stored: it is recomputed from the activities on every
/// read and written out at serialization time only.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct Itinerary {
    /// Destination city label
    pub city: String,
    /// Day-by-day plan
    pub days: Vec<DayPlan>,
    /// Whether the plan satisfied the trip constraints
    #[serde(default)]
    pub valid: bool,
    /// First constraint the plan violated, if any
    #[serde(default)]
    pub validation_error: Option<String>,
}

impl Itinerary {
    pub fn new(city: impl Into<String>, days: Vec<DayPlan>) -> Self {
        Self {
            city: city.into(),
            days,
            valid: false,
            validation_error: None,
        }
    }

    /// Plan with no days, returned when nothing usable could be recovered.
    pub fn empty(city: impl Into<String>) -> Self {
        Self::new(city, Vec::new())
    }

    pub fn total_cost(&self) -> f64 {
        self.days.iter().map(DayPlan::total_cost).sum()
    }

    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    pub fn activities(&self) -> impl Iterator<Item = &Activity> {
        self.days.iter().flat_map(|day| day.activities.iter())
    }

    pub fn activity_count(&self) -> usize {
        self.activities().count()
    }
}

impl Serialize for Itinerary {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Itinerary", 5)?;
        state.serialize_field("city", &self.city)?;
        state.serialize_field("total_cost", &self.total_cost())?;
        state.serialize_field("days", &self.days)?;
        state.serialize_field("valid", &self.valid)?;
        state.serialize_field("validation_error", &self.validation_error)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn activity(name: &str, cost: f64) -> Activity {
        Activity {
            name: name.to_string(),
            description: name.to_string(),
            cost,
            duration_hours: 1.0,
            duration_str: "1.0 hours".to_string(),
            tags: vec![DEFAULT_TAG.to_string()],
            image_url: None,
        }
    }

    #[test]
    fn total_cost_tracks_activity_edits() {
        let mut plan = Itinerary::new(
            "Rome",
            vec![
                DayPlan::new(1, vec![activity("Colosseum", 18.0), activity("Pasta", 12.5)]),
                DayPlan::new(2, vec![activity("Vatican", 20.0)]),
            ],
        );
        assert_eq!(plan.total_cost(), 50.5);

        plan.days[0].activities[0].cost = 0.0;
        assert_eq!(plan.days[0].total_cost(), 12.5);
        assert_eq!(plan.total_cost(), 32.5);
    }

    #[test]
    fn serialization_emits_derived_totals() {
        let plan = Itinerary::new("Rome", vec![DayPlan::new(1, vec![activity("Colosseum", 18.0)])]);
        let value = serde_json::to_value(&plan).unwrap();

        assert_eq!(value["total_cost"], 18.0);
        assert_eq!(value["days"][0]["total_cost"], 18.0);
        assert!(value["days"][0].get("city").is_none());
    }

    #[test]
    fn supplied_totals_are_ignored_on_read() {
        let plan: Itinerary = serde_json::from_value(json!({
            "city": "Rome",
            "total_cost": 9999.0,
            "days": [{
                "day_number": 1,
                "total_cost": 9999.0,
                "activities": [{
                    "name": "Colosseum",
                    "description": "Arena",
                    "cost": 18.0,
                    "duration_hours": 2.0,
                    "tags": ["History"]
                }]
            }]
        }))
        .unwrap();

        assert_eq!(plan.total_cost(), 18.0);
        assert!(!plan.valid);
    }

    #[test]
    fn preferences_validation() {
        assert!(TripPreferences::new("Lisbon", 500.0, 3).validate().is_ok());
        assert!(TripPreferences::new("Lisbon", -1.0, 3).validate().is_err());
        assert!(TripPreferences::new("Lisbon", f64::NAN, 3).validate().is_err());
        assert!(TripPreferences::new("Lisbon", 500.0, 0).validate().is_err());
        assert!(TripPreferences::new("  ", 500.0, 3).validate().is_err());
    }

    #[test]
    fn preferences_accept_destination_alias() {
        let prefs: TripPreferences =
            serde_json::from_value(json!({"destination": "Oslo", "budget": 800, "days": 2}))
                .unwrap();
        assert_eq!(prefs.city, "Oslo");
        assert!(prefs.interests.is_empty());
        assert!(prefs.start_date.is_none());
    }
}
