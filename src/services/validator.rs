use tracing::info;

use crate::types::{Itinerary, TripPreferences};

/// Check a plan against the trip's budget and length.
///
/// The first violated constraint wins and is recorded on the plan; passing
/// both marks it valid and clears any earlier message.
pub fn check_constraints(itinerary: &mut Itinerary, preferences: &TripPreferences) -> bool {
    let total_cost = itinerary.total_cost();
    if total_cost > preferences.budget {
        return reject(
            itinerary,
            format!(
                "Total cost ${:.2} exceeds budget ${:.2}.",
                total_cost, preferences.budget
            ),
        );
    }

    let day_count = itinerary.day_count();
    if day_count != preferences.days as usize {
        return reject(
            itinerary,
            format!(
                "Itinerary has {} days, expected {}.",
                day_count, preferences.days
            ),
        );
    }

    itinerary.valid = true;
    itinerary.validation_error = None;
    true
}

fn reject(itinerary: &mut Itinerary, message: String) -> bool {
    info!(target: "trip_planner::validator", violation = %message, "constraint check failed");
    itinerary.valid = false;
    itinerary.validation_error = Some(message);
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Activity, DayPlan, DEFAULT_TAG};

    fn day(number: u32, cost: f64) -> DayPlan {
        DayPlan::new(
            number,
            vec![Activity {
                name: format!("Stop {number}"),
                description: "stop".to_string(),
                cost,
                duration_hours: 1.0,
                duration_str: "1.0 hours".to_string(),
                tags: vec![DEFAULT_TAG.to_string()],
                image_url: None,
            }],
        )
    }

    #[test]
    fn over_budget_names_both_totals() {
        let mut plan = Itinerary::new("London", vec![day(1, 2000.0)]);
        let prefs = TripPreferences::new("London", 500.0, 1);

        assert!(!check_constraints(&mut plan, &prefs));
        assert!(!plan.valid);
        let message = plan.validation_error.as_deref().unwrap();
        assert!(message.contains("exceeds budget"));
        assert!(message.contains("$2000.00"));
        assert!(message.contains("$500.00"));
    }

    #[test]
    fn wrong_day_count_names_both_counts() {
        let mut plan = Itinerary::new("London", vec![day(1, 10.0), day(2, 10.0)]);
        let prefs = TripPreferences::new("London", 500.0, 3);

        assert!(!check_constraints(&mut plan, &prefs));
        assert_eq!(
            plan.validation_error.as_deref(),
            Some("Itinerary has 2 days, expected 3.")
        );
    }

    #[test]
    fn budget_is_checked_before_days() {
        let mut plan = Itinerary::new("London", vec![day(1, 900.0)]);
        let prefs = TripPreferences::new("London", 500.0, 3);

        check_constraints(&mut plan, &prefs);
        assert!(plan.validation_error.unwrap().contains("exceeds budget"));
    }

    #[test]
    fn passing_clears_previous_error() {
        let mut plan = Itinerary::new("London", vec![day(1, 500.0)]);
        plan.validation_error = Some("stale".to_string());
        let prefs = TripPreferences::new("London", 500.0, 1);

        assert!(check_constraints(&mut plan, &prefs));
        assert!(plan.valid);
        assert!(plan.validation_error.is_none());
    }

    #[test]
    fn total_is_recomputed_after_edits() {
        let mut plan = Itinerary::new("London", vec![day(1, 800.0)]);
        let prefs = TripPreferences::new("London", 500.0, 1);
        assert!(!check_constraints(&mut plan, &prefs));

        plan.days[0].activities[0].cost = 100.0;
        assert!(check_constraints(&mut plan, &prefs));
    }
}
