use futures::future::join_all;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::coerce::{
    coerce_cost, coerce_day_index, coerce_duration, format_hours, rename_first, resolve,
    ACTIVITY_LIST_KEYS, CITY_KEYS, DAYS_KEY, DAY_CITY_KEYS, DAY_INDEX_KEYS, NAME_KEYS,
};
use super::extractor::extract_json_payload;
use super::image_lookup::{fallback_image_url, image_query, ImageLookup, NoImageLookup};
use crate::error::NormalizeError;
use crate::schemas::{itinerary_schema, validate_payload};
use crate::types::{Itinerary, DEFAULT_TAG, UNKNOWN_CITY};

/// Envelopes deeper than this are not searched for a `days` list.
const MAX_UNWRAP_DEPTH: usize = 8;

/// Result of turning one raw model response into an itinerary.
#[derive(Debug, Clone)]
pub struct ParsedItinerary {
    pub itinerary: Itinerary,
    /// Why the response degraded to an empty plan, if it did
    pub degradation: Option<NormalizeError>,
}

impl ParsedItinerary {
    pub fn is_degraded(&self) -> bool {
        self.degradation.is_some()
    }
}

/// Reshapes loosely-typed model output into the canonical itinerary.
#[derive(Debug, Clone)]
pub struct Normalizer {
    image_lookup: Arc<dyn ImageLookup>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(Arc::new(NoImageLookup))
    }
}

impl Normalizer {
    pub fn new(image_lookup: Arc<dyn ImageLookup>) -> Self {
        Self { image_lookup }
    }

    /// Extract, repair and backfill a raw response.
    ///
    /// Never fails: anything unusable yields an empty plan for
    /// `requested_city`, with the cause recorded as the degradation.
    pub async fn parse_response(&self, raw: &str, requested_city: &str) -> ParsedItinerary {
        let parsed = match extract_json_payload(raw) {
            Ok(value) => self.normalize_value(value).await,
            Err(err) => Err(err),
        };

        match parsed {
            Ok(itinerary) => ParsedItinerary {
                itinerary,
                degradation: None,
            },
            Err(err) => {
                if err.is_expected() {
                    warn!(target: "trip_planner::normalizer", error = %err, "model response degraded to empty plan");
                } else {
                    error!(target: "trip_planner::normalizer", error = %err, "unexpected failure normalizing model response");
                }
                error!(target: "trip_planner::normalizer", raw_response = %raw, "raw model response");
                ParsedItinerary {
                    itinerary: Itinerary::empty(requested_city),
                    degradation: Some(err),
                }
            }
        }
    }

    /// Repair an already-parsed payload and backfill its images.
    pub async fn normalize_value(&self, value: Value) -> Result<Itinerary, NormalizeError> {
        let mut itinerary = repair_itinerary(value)?;
        self.backfill_images(&mut itinerary).await;
        Ok(itinerary)
    }

    /// Re-resolve every activity's image, ignoring whatever the model supplied.
    ///
    /// Lookups for one plan run concurrently; all of them finish before this returns.
    pub async fn backfill_images(&self, itinerary: &mut Itinerary) {
        let city = itinerary.city.clone();
        let queries: Vec<String> = itinerary
            .activities()
            .map(|activity| image_query(&activity.name, &city))
            .collect();

        let lookups = queries.iter().map(|query| async move {
            match self.image_lookup.find_image(query).await {
                Ok(Some(url)) if !url.trim().is_empty() => url,
                Ok(_) => fallback_image_url(query),
                Err(err) => {
                    warn!(target: "trip_planner::images", query = %query, error = %err, "image lookup failed");
                    fallback_image_url(query)
                }
            }
        });
        let urls = join_all(lookups).await;

        let activities = itinerary
            .days
            .iter_mut()
            .flat_map(|day| day.activities.iter_mut());
        for (activity, url) in activities.zip(urls) {
            activity.image_url = Some(url);
        }
    }
}

/// Field-by-field repair of a parsed payload, without image backfill.
pub fn repair_itinerary(value: Value) -> Result<Itinerary, NormalizeError> {
    let mut payload = unwrap_envelope(value);

    let Value::Object(root) = &mut payload else {
        return Err(NormalizeError::shape(
            "<root>",
            "expected a JSON object containing a `days` list",
        ));
    };

    rename_first(root, CITY_KEYS, "city");
    if !matches!(root.get("city"), Some(Value::String(_))) {
        root.insert("city".to_string(), Value::String(UNKNOWN_CITY.to_string()));
    }

    let days = root
        .entry(DAYS_KEY)
        .or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(days) = days else {
        return Err(NormalizeError::shape("/days", "`days` is not a list"));
    };

    for (day_idx, day) in days.iter_mut().enumerate() {
        repair_day(day, day_idx)?;
    }
    renumber_days(days);

    validate_payload(itinerary_schema(), &payload)?;

    let mut itinerary: Itinerary = serde_path_to_error::deserialize(payload).map_err(|err| {
        let path = err.path().to_string();
        NormalizeError::shape(path, err.inner().to_string())
    })?;

    itinerary.valid = false;
    itinerary.validation_error = None;
    Ok(itinerary)
}

/// Replace an outer envelope with the first nested object holding a `days` list.
///
/// Only a literal `city` or `days` key marks the root as the plan itself. An
/// outer city label (`destination`, ...) is carried into the nested plan when
/// that plan has none.
fn unwrap_envelope(value: Value) -> Value {
    let is_plan_root = value
        .as_object()
        .map(|object| object.contains_key("city") || object.contains_key(DAYS_KEY))
        .unwrap_or(false);
    if is_plan_root {
        return value;
    }

    let Some(mut found) = find_days_container(&value, 0).cloned() else {
        return value;
    };
    debug!(target: "trip_planner::normalizer", "unwrapped nested itinerary payload");

    let outer_city = value
        .as_object()
        .and_then(|object| resolve(object, CITY_KEYS))
        .filter(|city| city.is_string());
    if let (Some(city), Value::Object(nested)) = (outer_city, &mut found) {
        if resolve(nested, CITY_KEYS).is_none() {
            nested.insert("city".to_string(), city.clone());
        }
    }
    found
}

fn find_days_container(value: &Value, depth: usize) -> Option<&Value> {
    if depth > MAX_UNWRAP_DEPTH {
        return None;
    }
    match value {
        Value::Object(object) => {
            if matches!(object.get(DAYS_KEY), Some(Value::Array(_))) {
                return Some(value);
            }
            object
                .values()
                .find_map(|child| find_days_container(child, depth + 1))
        }
        Value::Array(items) => items
            .iter()
            .find_map(|child| find_days_container(child, depth + 1)),
        _ => None,
    }
}

fn repair_day(day: &mut Value, day_idx: usize) -> Result<(), NormalizeError> {
    let Value::Object(object) = day else {
        return Err(NormalizeError::shape(
            format!("/days/{day_idx}"),
            "day entry is not an object",
        ));
    };

    let index = coerce_day_index(resolve(object, DAY_INDEX_KEYS)).unwrap_or(day_idx as u32 + 1);
    rename_first(object, DAY_INDEX_KEYS, "day_number");
    object.insert("day_number".to_string(), Value::from(index));

    rename_first(object, DAY_CITY_KEYS, "city");
    if matches!(object.get("city"), Some(Value::Null)) {
        object.remove("city");
    }

    rename_first(object, ACTIVITY_LIST_KEYS, "activities");
    let activities = object
        .entry("activities")
        .or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(activities) = activities else {
        return Err(NormalizeError::shape(
            format!("/days/{day_idx}/activities"),
            "`activities` is not a list",
        ));
    };

    for (activity_idx, activity) in activities.iter_mut().enumerate() {
        let Value::Object(activity) = activity else {
            return Err(NormalizeError::shape(
                format!("/days/{day_idx}/activities/{activity_idx}"),
                "activity is not an object",
            ));
        };
        repair_activity(activity);
    }
    Ok(())
}

fn repair_activity(activity: &mut Map<String, Value>) {
    rename_first(activity, NAME_KEYS, "name");

    let cost = coerce_cost(activity.get("cost"));
    activity.insert("cost".to_string(), Value::from(cost));

    let (hours, display) = coerce_duration(activity);
    let display = display
        .or_else(|| {
            activity
                .get("duration_str")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| format_hours(hours));
    activity.remove("duration");
    activity.insert("duration_hours".to_string(), Value::from(hours));
    activity.insert("duration_str".to_string(), Value::String(display));

    match activity.get("tags") {
        Some(Value::Array(_)) => {}
        Some(Value::String(tag)) if !tag.trim().is_empty() => {
            let tags = vec![Value::String(tag.clone())];
            activity.insert("tags".to_string(), Value::Array(tags));
        }
        _ => {
            let tags = vec![Value::String(DEFAULT_TAG.to_string())];
            activity.insert("tags".to_string(), Value::Array(tags));
        }
    }

    if matches!(activity.get("description"), None | Some(Value::Null)) {
        let fallback = activity.get("name").cloned().unwrap_or(Value::Null);
        activity.insert("description".to_string(), fallback);
    }

    if matches!(activity.get("image_url"), Some(value) if !value.is_string()) {
        activity.remove("image_url");
    }
}

/// Order days by index and renumber them 1..n if the indices are not already contiguous.
fn renumber_days(days: &mut [Value]) {
    let index_of = |day: &Value| day.get("day_number").and_then(Value::as_u64).unwrap_or(0);
    days.sort_by_key(index_of);

    let contiguous = days
        .iter()
        .enumerate()
        .all(|(position, day)| index_of(day) == position as u64 + 1);
    if contiguous {
        return;
    }

    warn!(target: "trip_planner::normalizer", "day indices were not contiguous, renumbering");
    for (position, day) in days.iter_mut().enumerate() {
        if let Value::Object(object) = day {
            object.insert("day_number".to_string(), Value::from(position as u64 + 1));
        }
    }
}
