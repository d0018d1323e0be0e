use serde_json::{Deserializer, Value};
use tracing::debug;

use crate::error::NormalizeError;

/// Isolate and parse the first JSON object (or, failing that, array) in a
/// model response.
///
/// Markdown fences are dropped and everything before the opening bracket is
/// ignored. The first complete value wins, so explanatory text after it is
/// harmless. If the streaming parse fails, the slice between the opening
/// bracket and the last closing bracket of the same kind is tried instead.
pub fn extract_json_payload(text: &str) -> Result<Value, NormalizeError> {
    let cleaned = text.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();

    let (start, closer) = match cleaned.find('{') {
        Some(idx) => (idx, '}'),
        None => match cleaned.find('[') {
            Some(idx) => (idx, ']'),
            None => {
                return Err(NormalizeError::Parse(
                    "response contains no JSON object or array".to_string(),
                ))
            }
        },
    };

    let candidate = &cleaned[start..];
    let stream_error = match Deserializer::from_str(candidate).into_iter::<Value>().next() {
        Some(Ok(value)) => return Ok(value),
        Some(Err(err)) => err.to_string(),
        None => "empty candidate".to_string(),
    };
    debug!(
        target: "trip_planner::extractor",
        error = %stream_error,
        "streaming parse failed, retrying with bracket slice"
    );

    let end = cleaned
        .rfind(closer)
        .filter(|&end| end > start)
        .ok_or_else(|| {
            NormalizeError::Parse(format!(
                "{stream_error}; no closing `{closer}` after position {start}"
            ))
        })?;

    serde_json::from_str(&cleaned[start..=end])
        .map_err(|err| NormalizeError::Parse(format!("{stream_error}; slice parse: {err}")))
}
