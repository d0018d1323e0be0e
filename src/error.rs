use std::time::Duration;

use thiserror::Error;

/// Main error type for the planner
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid preferences: {0}")]
    InvalidPreferences(String),

    #[error("No model backend has a configured credential: {0}")]
    NoCredentials(String),

    #[error("All model candidates failed. Last error: {0}")]
    AllCandidatesFailed(#[source] BackendError),

    #[error("Image lookup failed: {0}")]
    ImageLookup(String),

    #[error("Planning ended without a result: {0}")]
    Incomplete(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, PlannerError>;

/// Failure of a single model call.
///
/// Display strings keep the upstream status markers (`429`, `404`,
/// `RESOURCE_EXHAUSTED`) because [`ErrorCategory`] classifies by substring.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("model not found: {0}")]
    NotFound(String),

    #[error("missing credential: {0}")]
    MissingCredential(String),

    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// Map an HTTP status and body from a model API onto a backend failure.
    pub fn from_status(status: u16, message: &str) -> Self {
        let detail = format!("HTTP {} {}", status, message);
        if status == 429 || message.contains("RESOURCE_EXHAUSTED") {
            BackendError::QuotaExceeded(detail)
        } else if status == 404 {
            BackendError::NotFound(detail)
        } else {
            BackendError::Other(detail)
        }
    }

    pub fn from_transport(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            BackendError::Timeout(timeout)
        } else {
            BackendError::Other(format!("HTTP request failed: {err}"))
        }
    }
}

/// Expected ways a model response can fail to become an itinerary.
///
/// These never reach callers: the normalizer degrades to an empty plan and
/// reports the cause alongside it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("no parseable JSON structure found: {0}")]
    Parse(String),

    #[error("payload shape mismatch at {path}: {message}")]
    ShapeMismatch { path: String, message: String },

    #[error("unexpected normalization failure: {0}")]
    Unexpected(String),
}

impl NormalizeError {
    pub fn shape(path: impl Into<String>, message: impl Into<String>) -> Self {
        NormalizeError::ShapeMismatch {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this is one of the anticipated degradations rather than a bug.
    pub fn is_expected(&self) -> bool {
        !matches!(self, NormalizeError::Unexpected(_))
    }
}

/// Coarse, user-safe failure category exposed above the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    RateLimited,
    Unavailable,
    Unexpected,
    /// The caller's trip request was rejected before planning
    InvalidRequest,
    /// No usable credentials or settings
    Misconfigured,
}

impl ErrorCategory {
    /// Classify by known substrings; upstream backends do not guarantee structured codes.
    pub fn classify(message: &str) -> Self {
        if message.contains("429")
            || message.contains("RESOURCE_EXHAUSTED")
            || message.to_ascii_lowercase().contains("quota")
        {
            ErrorCategory::RateLimited
        } else if message.contains("404") {
            ErrorCategory::Unavailable
        } else {
            ErrorCategory::Unexpected
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorCategory::RateLimited => {
                "High traffic volume. Please try again in a minute. (Quota Exceeded)"
            }
            ErrorCategory::Unavailable => "AI Model currently unavailable. Please try again later.",
            ErrorCategory::Unexpected => {
                "An unexpected error occurred while generating your plan."
            }
            ErrorCategory::InvalidRequest => {
                "Invalid trip request. Check the destination, budget and number of days."
            }
            ErrorCategory::Misconfigured => {
                "The planner is not configured with an AI provider key. Please contact the operator."
            }
        }
    }
}

impl PlannerError {
    /// Check if retrying the whole request later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            PlannerError::AllCandidatesFailed(_) => {
                self.category() != ErrorCategory::Unexpected
            }
            _ => false,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            PlannerError::InvalidPreferences(_) => ErrorCategory::InvalidRequest,
            PlannerError::NoCredentials(_) | PlannerError::Config(_) => {
                ErrorCategory::Misconfigured
            }
            _ => ErrorCategory::classify(&self.to_string()),
        }
    }

    pub fn user_message(&self) -> &'static str {
        self.category().user_message()
    }

    /// Get the error code for structured responses
    pub fn error_code(&self) -> &'static str {
        match self {
            PlannerError::Config(_) => "CONFIG_ERROR",
            PlannerError::InvalidPreferences(_) => "INVALID_PREFERENCES",
            PlannerError::NoCredentials(_) => "NO_CREDENTIALS",
            PlannerError::AllCandidatesFailed(_) => match self.category() {
                ErrorCategory::RateLimited => "RATE_LIMITED",
                ErrorCategory::Unavailable => "BACKEND_UNAVAILABLE",
                ErrorCategory::Unexpected
                | ErrorCategory::InvalidRequest
                | ErrorCategory::Misconfigured => "BACKEND_ERROR",
            },
            PlannerError::ImageLookup(_) => "IMAGE_LOOKUP_ERROR",
            PlannerError::Incomplete(_) => "INCOMPLETE_RUN",
            PlannerError::Serialization(_) => "SERIALIZATION_ERROR",
            PlannerError::Io(_) => "IO_ERROR",
        }
    }

    /// Convert to a structured, user-safe error payload
    pub fn to_error_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": self.user_message(),
                "retryable": self.is_retryable()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(
            BackendError::from_status(429, "slow down"),
            BackendError::QuotaExceeded(_)
        ));
        assert!(matches!(
            BackendError::from_status(400, "{\"status\": \"RESOURCE_EXHAUSTED\"}"),
            BackendError::QuotaExceeded(_)
        ));
        assert!(matches!(
            BackendError::from_status(404, "no such model"),
            BackendError::NotFound(_)
        ));
        assert!(matches!(
            BackendError::from_status(500, "boom"),
            BackendError::Other(_)
        ));
    }

    #[test]
    fn classification_by_substring() {
        let quota = PlannerError::AllCandidatesFailed(BackendError::from_status(429, "busy"));
        assert_eq!(quota.category(), ErrorCategory::RateLimited);
        assert!(quota.is_retryable());
        assert_eq!(quota.error_code(), "RATE_LIMITED");

        let missing = PlannerError::AllCandidatesFailed(BackendError::from_status(404, "gone"));
        assert_eq!(missing.category(), ErrorCategory::Unavailable);

        let other = PlannerError::AllCandidatesFailed(BackendError::Other("reset".into()));
        assert_eq!(other.category(), ErrorCategory::Unexpected);
        assert!(!other.is_retryable());

        assert_eq!(
            ErrorCategory::classify("Quota Exceeded"),
            ErrorCategory::RateLimited
        );
    }

    #[test]
    fn payload_hides_backend_detail() {
        let error = PlannerError::AllCandidatesFailed(BackendError::Other(
            "HTTP 500 stack trace at line 42".into(),
        ));
        let payload = error.to_error_payload();

        assert_eq!(payload["error"]["code"], "BACKEND_ERROR");
        assert_eq!(
            payload["error"]["message"],
            "An unexpected error occurred while generating your plan."
        );
        assert!(!payload.to_string().contains("stack trace"));
    }

    #[test]
    fn input_and_setup_errors_have_their_own_messages() {
        let invalid = PlannerError::InvalidPreferences("trip must last at least one day".into());
        assert_eq!(invalid.category(), ErrorCategory::InvalidRequest);
        assert_eq!(
            invalid.user_message(),
            "Invalid trip request. Check the destination, budget and number of days."
        );
        assert!(!invalid.is_retryable());

        let missing = PlannerError::NoCredentials("set GOOGLE_API_KEY".into());
        assert_eq!(missing.category(), ErrorCategory::Misconfigured);
        assert_ne!(missing.user_message(), ErrorCategory::Unexpected.user_message());

        // Input detail mentioning a status code must not be mistaken for a backend failure
        let odd = PlannerError::InvalidPreferences("budget must be a non-negative number, got -429".into());
        assert_eq!(odd.category(), ErrorCategory::InvalidRequest);
    }

    #[test]
    fn only_anticipated_degradations_are_expected() {
        assert!(NormalizeError::Parse("x".into()).is_expected());
        assert!(NormalizeError::shape("days[0]", "not an object").is_expected());
        assert!(!NormalizeError::Unexpected("schema".into()).is_expected());
    }
}
