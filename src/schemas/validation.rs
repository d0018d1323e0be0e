use serde_json::Value;

use super::SchemaHandle;
use crate::error::NormalizeError;

const MAX_SCHEMA_ERRORS: usize = 3;

/// Check a repaired payload against a canonical schema.
///
/// Violations become a `ShapeMismatch` pointing at the first offending path;
/// a schema that cannot be compiled is an `Unexpected` failure.
pub fn validate_payload(schema: &SchemaHandle, payload: &Value) -> Result<(), NormalizeError> {
    let validator = schema.compiled().map_err(|err| {
        NormalizeError::Unexpected(format!(
            "failed to prepare `{}` schema for validation: {}",
            schema.schema_name(),
            err
        ))
    })?;

    if let Err(errors) = validator.validate(payload) {
        let mut first_path = None;
        let mut details = Vec::new();
        let mut truncated = false;

        for (idx, error) in errors.enumerate() {
            if idx >= MAX_SCHEMA_ERRORS {
                truncated = true;
                break;
            }
            let mut path = error.instance_path.to_string();
            if path.is_empty() {
                path = "<root>".to_string();
            }
            details.push(format!("{}: {}", path, error));
            first_path.get_or_insert(path);
        }

        let mut detail_str = if details.is_empty() {
            format!("payload does not match `{}` schema", schema.schema_name())
        } else {
            details.join("; ")
        };
        if truncated {
            detail_str.push_str("; additional errors truncated");
        }

        return Err(NormalizeError::shape(
            first_path.unwrap_or_else(|| "<root>".to_string()),
            detail_str,
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::itinerary_schema;
    use serde_json::json;

    #[test]
    fn accepts_canonical_payload() {
        let payload = json!({
            "city": "Kyoto",
            "days": [{
                "day_number": 1,
                "activities": [{
                    "name": "Fushimi Inari",
                    "description": "Shrine gates",
                    "cost": 0.0,
                    "duration_hours": 2.0,
                    "duration_str": "2 hours",
                    "tags": ["Culture"]
                }]
            }]
        });
        assert!(validate_payload(itinerary_schema(), &payload).is_ok());
    }

    #[test]
    fn reports_path_of_bad_field() {
        let payload = json!({
            "city": "Kyoto",
            "days": [{
                "day_number": 1,
                "activities": [{
                    "description": "no name",
                    "cost": 0.0,
                    "duration_hours": 2.0,
                    "tags": ["Culture"]
                }]
            }]
        });
        match validate_payload(itinerary_schema(), &payload) {
            Err(NormalizeError::ShapeMismatch { path, message }) => {
                assert_eq!(path, "/days/0/activities/0");
                assert!(message.contains("name"));
            }
            other => panic!("expected shape mismatch, got {:?}", other),
        }
    }
}
