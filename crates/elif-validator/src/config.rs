//! Executor configuration

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Message used when an item has no message of its own
pub const DEFAULT_MESSAGE: &str = "Invalid value";

/// How errors from several chains on the same field are merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Keep only the first error per (location, path)
    #[default]
    FirstPerField,
    /// Keep every error
    All,
}

/// What happens when a custom validator returns an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Record it as a validation failure for that field
    #[default]
    Absorb,
    /// Abort the chain and fail the whole run
    Propagate,
}

/// Which value is reported alongside a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportedValue {
    /// The value as sanitized so far
    #[default]
    Current,
    /// The value as found in the request
    Original,
}

impl FromStr for DedupPolicy {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first_per_field" | "first" => Ok(DedupPolicy::FirstPerField),
            "all" => Ok(DedupPolicy::All),
            _ => Err(invalid("dedup", s, "first_per_field or all")),
        }
    }
}

impl FromStr for ErrorPolicy {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "absorb" => Ok(ErrorPolicy::Absorb),
            "propagate" => Ok(ErrorPolicy::Propagate),
            _ => Err(invalid("error_policy", s, "absorb or propagate")),
        }
    }
}

impl FromStr for ReportedValue {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "current" => Ok(ReportedValue::Current),
            "original" => Ok(ReportedValue::Original),
            _ => Err(invalid("reported_value", s, "current or original")),
        }
    }
}

fn invalid(field: &str, value: &str, expected: &str) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

/// Settings shared by every chain an [`Executor`](crate::Executor) runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub dedup: DedupPolicy,
    /// Used by chains that don't call `on_error()` themselves
    pub error_policy: ErrorPolicy,
    pub reported_value: ReportedValue,
    pub default_message: String,
}

impl ValidatorConfig {
    pub fn new() -> Self {
        Self {
            dedup: DedupPolicy::FirstPerField,
            error_policy: ErrorPolicy::Absorb,
            reported_value: ReportedValue::Current,
            default_message: DEFAULT_MESSAGE.to_string(),
        }
    }

    /// Load configuration from `ELIF_VALIDATOR_*` environment variables,
    /// falling back to the defaults for anything unset
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let mut config = Self::new();

        if let Ok(dedup) = env::var("ELIF_VALIDATOR_DEDUP") {
            config.dedup = dedup.parse()?;
        }
        if let Ok(policy) = env::var("ELIF_VALIDATOR_ERROR_POLICY") {
            config.error_policy = policy.parse()?;
        }
        if let Ok(reported) = env::var("ELIF_VALIDATOR_REPORTED_VALUE") {
            config.reported_value = reported.parse()?;
        }
        if let Ok(message) = env::var("ELIF_VALIDATOR_DEFAULT_MESSAGE") {
            config.default_message = message;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.default_message.trim().is_empty() {
            return Err(invalid(
                "default_message",
                &self.default_message,
                "a non-empty message",
            ));
        }
        Ok(())
    }

    pub fn with_dedup(mut self, dedup: DedupPolicy) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    pub fn with_reported_value(mut self, reported: ReportedValue) -> Self {
        self.reported_value = reported;
        self
    }

    pub fn with_default_message(mut self, message: impl Into<String>) -> Self {
        self.default_message = message.into();
        self
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ValidatorConfig::default();
        assert_eq!(config.dedup, DedupPolicy::FirstPerField);
        assert_eq!(config.error_policy, ErrorPolicy::Absorb);
        assert_eq!(config.reported_value, ReportedValue::Current);
        assert_eq!(config.default_message, "Invalid value");
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("ALL".parse::<DedupPolicy>().unwrap(), DedupPolicy::All);
        assert_eq!("propagate".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::Propagate);
        assert_eq!("original".parse::<ReportedValue>().unwrap(), ReportedValue::Original);

        let error = "sometimes".parse::<ErrorPolicy>().unwrap_err();
        assert!(matches!(error, ConfigurationError::InvalidValue { ref field, .. } if field == "error_policy"));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ValidatorConfig = serde_json::from_str(r#"{ "dedup": "all" }"#).unwrap();
        assert_eq!(config.dedup, DedupPolicy::All);
        assert_eq!(config.default_message, "Invalid value");
    }

    #[test]
    fn test_from_env() {
        env::set_var("ELIF_VALIDATOR_DEDUP", "all");
        env::set_var("ELIF_VALIDATOR_DEFAULT_MESSAGE", "Bad input");
        let config = ValidatorConfig::from_env().unwrap();
        assert_eq!(config.dedup, DedupPolicy::All);
        assert_eq!(config.default_message, "Bad input");

        env::set_var("ELIF_VALIDATOR_REPORTED_VALUE", "sometimes");
        assert!(ValidatorConfig::from_env().is_err());

        env::remove_var("ELIF_VALIDATOR_DEDUP");
        env::remove_var("ELIF_VALIDATOR_DEFAULT_MESSAGE");
        env::remove_var("ELIF_VALIDATOR_REPORTED_VALUE");
    }

    #[test]
    fn test_empty_default_message_rejected() {
        let config = ValidatorConfig::new().with_default_message("  ");
        assert!(config.validate().is_err());
    }
}
