//! iCalendar (RFC 5545) export of an itinerary.
//!
//! Each day gets an all-day summary event; each activity becomes a timed
//! event starting at 09:00 and running back to back with a travel buffer.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tracing::warn;

use crate::services::prompts::parse_start_date;
use crate::types::{Activity, DayPlan, Itinerary};

const PRODID: &str = "-//trip-planner-rs//Itinerary//EN";
const UID_DOMAIN: &str = "trip-planner-rs";
const DAY_START_HOUR: u32 = 9;
const TRAVEL_BUFFER_MINUTES: i64 = 30;
const MIN_EVENT_HOURS: f64 = 0.5;
const MAX_EVENT_HOURS: f64 = 8.0;
const MAX_LINE_OCTETS: usize = 75;

/// Render `itinerary` as calendar text, starting on `start_date` or tomorrow.
pub fn render_ics(itinerary: &Itinerary, start_date: Option<&str>) -> String {
    render_ics_at(itinerary, start_date, Utc::now())
}

/// Same as [`render_ics`] with an explicit clock.
pub fn render_ics_at(itinerary: &Itinerary, start_date: Option<&str>, now: DateTime<Utc>) -> String {
    let first_day = start_date.and_then(parse_start_date).unwrap_or_else(|| {
        let today = now.date_naive();
        today.succ_opt().unwrap_or(today)
    });
    let stamp = now.format("%Y%m%dT%H%M%SZ").to_string();

    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODID}"),
        "CALSCALE:GREGORIAN".to_string(),
    ];

    for day in &itinerary.days {
        let offset = Duration::days(i64::from(day.day_number.saturating_sub(1)));
        let Some((date, next_date)) = first_day
            .checked_add_signed(offset)
            .and_then(|date| Some((date, date.succ_opt()?)))
        else {
            warn!(
                target: "trip_planner::render",
                day = day.day_number,
                "day falls outside the representable calendar, skipping"
            );
            continue;
        };
        let city = day.city.as_deref().unwrap_or(&itinerary.city);
        push_day_summary(&mut lines, day, city, date, next_date, &stamp);

        let mut cursor = NaiveDateTime::new(
            date,
            NaiveTime::from_hms_opt(DAY_START_HOUR, 0, 0).unwrap_or_default(),
        );
        for (index, activity) in day.activities.iter().enumerate() {
            let Some(end) = cursor.checked_add_signed(event_length(activity)) else {
                break;
            };
            push_activity(&mut lines, day, index, activity, city, cursor, end, &stamp);
            let Some(next) = end.checked_add_signed(Duration::minutes(TRAVEL_BUFFER_MINUTES)) else {
                break;
            };
            cursor = next;
        }
    }

    lines.push("END:VCALENDAR".to_string());

    let mut out = String::new();
    for line in &lines {
        out.push_str(&fold_line(line));
        out.push_str("\r\n");
    }
    out
}

fn push_day_summary(
    lines: &mut Vec<String>,
    day: &DayPlan,
    city: &str,
    date: NaiveDate,
    next_date: NaiveDate,
    stamp: &str,
) {
    lines.push("BEGIN:VEVENT".to_string());
    lines.push(format!("UID:day{}-summary-{}@{}", day.day_number, slug(city), UID_DOMAIN));
    lines.push(format!("DTSTAMP:{stamp}"));
    lines.push(format!("DTSTART;VALUE=DATE:{}", date.format("%Y%m%d")));
    lines.push(format!("DTEND;VALUE=DATE:{}", next_date.format("%Y%m%d")));
    lines.push(format!(
        "SUMMARY:{}",
        escape_text(&format!("Day {}: {} Trip", day.day_number, city))
    ));
    lines.push(format!(
        "DESCRIPTION:{}",
        escape_text(&format!("Total Cost for Day: ${:.2}", day.total_cost()))
    ));
    lines.push("END:VEVENT".to_string());
}

#[allow(clippy::too_many_arguments)]
fn push_activity(
    lines: &mut Vec<String>,
    day: &DayPlan,
    index: usize,
    activity: &Activity,
    city: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
    stamp: &str,
) {
    let mut description = format!(
        "{}\n\nCost: ${:.2}\nTags: {}",
        activity.description,
        activity.cost,
        activity.tags.join(", ")
    );
    if let Some(url) = activity.image_url.as_deref().filter(|url| !url.is_empty()) {
        description.push_str(&format!("\nImage: {url}"));
    }

    lines.push("BEGIN:VEVENT".to_string());
    lines.push(format!(
        "UID:day{}-activity{}-{}@{}",
        day.day_number,
        index + 1,
        slug(city),
        UID_DOMAIN
    ));
    lines.push(format!("DTSTAMP:{stamp}"));
    lines.push(format!("DTSTART:{}", start.format("%Y%m%dT%H%M%S")));
    lines.push(format!("DTEND:{}", end.format("%Y%m%dT%H%M%S")));
    lines.push(format!(
        "SUMMARY:{}",
        escape_text(&format!("{} ({})", activity.name, city))
    ));
    lines.push(format!("DESCRIPTION:{}", escape_text(&description)));
    lines.push("END:VEVENT".to_string());
}

fn event_length(activity: &Activity) -> Duration {
    let hours = if activity.duration_hours.is_finite() {
        activity.duration_hours.clamp(MIN_EVENT_HOURS, MAX_EVENT_HOURS)
    } else {
        1.0
    };
    Duration::minutes((hours * 60.0).round() as i64)
}

fn slug(text: &str) -> String {
    let slug: String = text
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "trip".to_string()
    } else {
        slug.to_string()
    }
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            other => escaped.push(other),
        }
    }
    escaped
}

/// Split into 75-octet lines; continuations start with a space.
fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }

    let mut folded = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut width = 0;
    let mut limit = MAX_LINE_OCTETS;
    for c in line.chars() {
        let len = c.len_utf8();
        if width + len > limit {
            folded.push_str("\r\n ");
            width = 0;
            limit = MAX_LINE_OCTETS - 1;
        }
        folded.push(c);
        width += len;
    }
    folded
}
