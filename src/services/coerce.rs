//! Field resolver tables and scalar coercion for loosely-typed model output.
//!
//! Each table lists the keys tried for one canonical field, in priority
//! order. The first key present wins.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

pub(crate) const CITY_KEYS: &[&str] = &["city", "destination"];
pub(crate) const DAYS_KEY: &str = "days";
pub(crate) const DAY_INDEX_KEYS: &[&str] = &["day_number", "day"];
pub(crate) const DAY_CITY_KEYS: &[&str] = &["city", "location"];
pub(crate) const ACTIVITY_LIST_KEYS: &[&str] = &["activities"];
pub(crate) const NAME_KEYS: &[&str] = &["name", "title"];
pub(crate) const DURATION_KEYS: &[&str] = &["duration", "duration_hours"];

pub(crate) const DEFAULT_DURATION_HOURS: f64 = 1.0;

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[-+]?(?:\d*\.\d+|\d+)").expect("numeric token pattern is valid")
    })
}

/// First signed decimal or integer anywhere in `text`.
pub fn first_number(text: &str) -> Option<f64> {
    number_pattern()
        .find(text)
        .and_then(|found| found.as_str().parse::<f64>().ok())
}

/// Value of the first key from `keys` present in `object`.
pub(crate) fn resolve<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| object.get(*key))
}

/// Move the first present key from `keys` onto `canonical`, dropping the others.
pub(crate) fn rename_first(object: &mut Map<String, Value>, keys: &[&str], canonical: &str) {
    let found = keys.iter().find_map(|key| object.remove(*key));
    for key in keys {
        object.remove(*key);
    }
    if let Some(value) = found {
        object.insert(canonical.to_string(), value);
    }
}

/// Cost in USD: numbers pass through, strings yield their first number,
/// anything else (or a negative result) is free.
pub fn coerce_cost(value: Option<&Value>) -> f64 {
    let cost = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => Some(first_number(text).unwrap_or(0.0)),
        _ => None,
    };
    cost.filter(|cost| cost.is_finite() && *cost >= 0.0)
        .unwrap_or(0.0)
}

/// Duration in hours plus its display text.
///
/// The display text comes from the first textual source in
/// [`DURATION_KEYS`]; the hour value from the first present one.
pub fn coerce_duration(object: &Map<String, Value>) -> (f64, Option<String>) {
    let display = DURATION_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .map(str::to_string);

    let hours = match resolve(object, DURATION_KEYS) {
        Some(Value::String(text)) => first_number(text),
        Some(Value::Number(number)) => number.as_f64(),
        _ => None,
    }
    .filter(|hours| hours.is_finite() && *hours >= 0.0)
    .unwrap_or(DEFAULT_DURATION_HOURS);

    (hours, display)
}

/// Day index from a number or a string like "Day 2".
pub fn coerce_day_index(value: Option<&Value>) -> Option<u32> {
    let index = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => first_number(text),
        _ => None,
    }?;
    (index.is_finite() && index >= 1.0 && index <= u32::MAX as f64).then(|| index as u32)
}

/// "2.5 hours", "1.0 hours"
pub fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{:.1} hours", hours)
    } else {
        format!("{} hours", hours)
    }
}
