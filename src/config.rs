//! Environment-driven planner configuration.

use std::time::Duration;

use crate::error::{PlannerError, Result};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

pub const DEFAULT_PRIMARY_MODELS: &[&str] = &[
    "gemini-2.0-flash",
    "gemini-flash-latest",
    "gemini-1.5-flash",
    "gemini-pro-latest",
];

pub const DEFAULT_SECONDARY_MODELS: &[&str] = &[
    "google/gemini-2.0-flash-exp:free",
    "meta-llama/llama-3.3-70b-instruct:free",
    "google/gemma-3-27b-it:free",
];

pub const DEFAULT_MAX_REPAIRS: usize = 3;

/// Everything a [`crate::PlannerFactory`] needs to build a planning run.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    /// Primary (Gemini) credential
    pub google_api_key: Option<String>,
    /// Secondary (OpenRouter) credential
    pub openrouter_api_key: Option<String>,
    pub gemini_base_url: String,
    pub openrouter_base_url: String,
    pub primary_models: Vec<String>,
    pub secondary_models: Vec<String>,
    pub primary_timeout: Duration,
    /// Strict timeout for the secondary backend
    pub fallback_timeout: Duration,
    pub image_timeout: Duration,
    pub max_repairs: usize,
    pub image_search: bool,
    /// Ground Gemini answers with Google Search
    pub grounding: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            google_api_key: None,
            openrouter_api_key: None,
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            openrouter_base_url: DEFAULT_OPENROUTER_BASE_URL.to_string(),
            primary_models: to_strings(DEFAULT_PRIMARY_MODELS),
            secondary_models: to_strings(DEFAULT_SECONDARY_MODELS),
            primary_timeout: Duration::from_secs(60),
            fallback_timeout: Duration::from_secs(30),
            image_timeout: Duration::from_secs(10),
            max_repairs: DEFAULT_MAX_REPAIRS,
            image_search: true,
            grounding: true,
        }
    }
}

impl PlannerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, falling back to defaults for
    /// anything unset or blank.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        Ok(Self {
            google_api_key: get("GOOGLE_API_KEY"),
            openrouter_api_key: get("OPENROUTER_API_KEY"),
            gemini_base_url: get("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            openrouter_base_url: get("OPENROUTER_BASE_URL")
                .unwrap_or(defaults.openrouter_base_url),
            primary_models: get("PLANNER_PRIMARY_MODELS")
                .map(|list| split_list(&list))
                .unwrap_or(defaults.primary_models),
            secondary_models: get("PLANNER_SECONDARY_MODELS")
                .map(|list| split_list(&list))
                .unwrap_or(defaults.secondary_models),
            primary_timeout: parse_secs("PLANNER_TIMEOUT_SECS", get("PLANNER_TIMEOUT_SECS"))?
                .unwrap_or(defaults.primary_timeout),
            fallback_timeout: parse_secs(
                "PLANNER_FALLBACK_TIMEOUT_SECS",
                get("PLANNER_FALLBACK_TIMEOUT_SECS"),
            )?
            .unwrap_or(defaults.fallback_timeout),
            image_timeout: parse_secs(
                "PLANNER_IMAGE_TIMEOUT_SECS",
                get("PLANNER_IMAGE_TIMEOUT_SECS"),
            )?
            .unwrap_or(defaults.image_timeout),
            max_repairs: match get("PLANNER_MAX_REPAIRS") {
                Some(raw) => raw.parse().map_err(|_| {
                    PlannerError::Config(format!(
                        "PLANNER_MAX_REPAIRS must be a non-negative integer, got '{raw}'"
                    ))
                })?,
                None => defaults.max_repairs,
            },
            image_search: get("PLANNER_IMAGE_SEARCH")
                .map(|raw| is_enabled(&raw))
                .unwrap_or(defaults.image_search),
            grounding: get("PLANNER_GROUNDING")
                .map(|raw| is_enabled(&raw))
                .unwrap_or(defaults.grounding),
        })
    }

    pub fn has_any_credential(&self) -> bool {
        self.google_api_key.is_some() || self.openrouter_api_key.is_some()
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_secs(key: &str, raw: Option<String>) -> Result<Option<Duration>> {
    raw.map(|raw| {
        raw.parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| PlannerError::Config(format!("{key} must be whole seconds, got '{raw}'")))
    })
    .transpose()
}

fn is_enabled(raw: &str) -> bool {
    !matches!(raw.to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off")
}
