use chrono::{Duration, NaiveDate};

use crate::types::TripPreferences;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y"];

const NO_DATES_CONTEXT: &str = "No specific dates provided. Assume standard opening hours.";
const INVALID_DATE_CONTEXT: &str = "Invalid date format. Assume standard opening hours.";

const OUTPUT_FORMAT: &str = r#"Return ONLY a JSON object matching this structure:
{
    "city": "<destination>",
    "days": [
        {
            "day_number": 1,
            "city": "<city for this day>",
            "activities": [
                {
                    "name": "Activity Name",
                    "description": "Short description",
                    "cost": 20,
                    "duration": "1-2 hours",
                    "image_url": "https://example.com/real-photo.jpg",
                    "tags": ["Tag1", "Tag2"]
                }
            ]
        }
    ]
}"#;

const COST_RULES: &str = "COST & CURRENCY:
- Estimate costs in the destination's LOCAL currency first, then convert to USD at current exchange rates.
- Be realistic: street food in Asia is cheap (<$5 USD), public transport is cheap, fine dining is expensive.
- Output ONLY the USD number in the `cost` field. Use 0 for free activities.";

const STRICT_JSON_RULES: &str = "CRITICAL: The previous output was NOT valid JSON or was empty.
You MUST return a pure JSON object.
Do NOT use markdown.
Do NOT add explanations.";

/// Parse a trip start date in either accepted format.
pub fn parse_start_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

/// Weekday of every trip day, so the model can reason about closures.
pub fn calendar_context(preferences: &TripPreferences) -> String {
    let Some(raw) = preferences.start_date.as_deref() else {
        return NO_DATES_CONTEXT.to_string();
    };
    let Some(start) = parse_start_date(raw) else {
        return INVALID_DATE_CONTEXT.to_string();
    };

    // Dates past chrono's range are treated like unparseable input
    let Some(dates) = (0..preferences.days)
        .map(|offset| start.checked_add_signed(Duration::days(i64::from(offset))))
        .collect::<Option<Vec<NaiveDate>>>()
    else {
        return INVALID_DATE_CONTEXT.to_string();
    };

    let mut context = String::from("SPECIFIC CALENDAR:\n");
    for (offset, date) in dates.iter().enumerate() {
        context.push_str(&format!(
            "- Day {}: {}\n",
            offset + 1,
            date.format("%A, %B %d, %Y")
        ));
    }
    context.push_str(
        "\nCRITICAL INSTRUCTION: Check opening hours for all venues for the specific DAY OF THE WEEK listed above.\n\
         If a venue is CLOSED on that day (e.g. the Louvre is closed on Tuesdays), reschedule it to another day or choose a different activity.",
    );
    context
}

/// Prompt for the first generation attempt.
pub fn build_initial_prompt(preferences: &TripPreferences) -> String {
    let interests = if preferences.interests.is_empty() {
        "General sightseeing".to_string()
    } else {
        preferences.interests.join(", ")
    };

    format!(
        "You are an expert travel agent. Create a detailed, day-by-day itinerary for {city}.
User Budget: ${budget:.2}
Trip Duration: {days} days
Interests: {interests}

INSTRUCTIONS:
1. MULTI-CITY: If the user requests multiple destinations (e.g. 'Paris and London'), split the days logically between them. Set the 'city' field on EVERY day and add travel between cities as an activity (e.g. 'Train to London').
2. REALISM: Account for opening hours and logical travel times between venues.
3. COSTS: Keep the total of all activity costs under the budget.
4. OUTPUT: Return PURE JSON with exactly {days} entries in 'days'. No markdown, no preamble.

TRIP DATES & OPENING HOURS:
{calendar}

{cost_rules}

OUTPUT FORMAT:
{output_format}",
        city = preferences.city,
        budget = preferences.budget,
        days = preferences.days,
        interests = interests,
        calendar = calendar_context(preferences),
        cost_rules = COST_RULES,
        output_format = OUTPUT_FORMAT,
    )
}

/// Prompt for a repair attempt after a constraint violation.
pub fn build_repair_prompt(
    preferences: &TripPreferences,
    previous_total: f64,
    violation: &str,
    strict_json: bool,
) -> String {
    let strict = if strict_json { STRICT_JSON_RULES } else { "" };

    format!(
        "The previous itinerary for {city} was INVALID.
Error: {violation}

Previous Plan Total Cost: ${previous_total:.2}
Budget: ${budget:.2}
Required number of days: {days}

DATES:
{calendar}

Please fix the plan by removing or swapping activities to meet the constraints.

{strict}

{cost_rules}

OUTPUT FORMAT:
{output_format}",
        city = preferences.city,
        violation = violation,
        previous_total = previous_total,
        budget = preferences.budget,
        days = preferences.days,
        calendar = calendar_context(preferences),
        strict = strict,
        cost_rules = COST_RULES,
        output_format = OUTPUT_FORMAT,
    )
}
