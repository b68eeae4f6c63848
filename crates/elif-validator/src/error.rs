//! Validation error types and handling

use crate::record::Location;
use crate::rules::Arity;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Error type custom validators and conditions may return
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// How a recorded failure came about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The predicate returned false (after negation)
    Invalid,
    /// A custom validator returned an error that was absorbed as a failure
    Errored,
}

/// A single failed validation for one concrete field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldError {
    /// Where in the request the field lives
    pub location: Location,
    /// Concrete path of the field, e.g. `users[0].email`
    pub path: String,
    /// The value that failed, absent when the field was missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Human-readable error message
    pub message: String,
    /// Rule that produced the failure (`isEmail`, `custom`, `exists`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    pub kind: FailureKind,
}

impl FieldError {
    /// Create a new validation error
    pub fn new(location: Location, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location,
            path: path.into(),
            value: None,
            message: message.into(),
            rule: None,
            kind: FailureKind::Invalid,
        }
    }

    /// Set the offending value
    pub fn value(mut self, value: Option<Value>) -> Self {
        self.value = value;
        self
    }

    /// Set the rule name
    pub fn rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    pub fn kind(mut self, kind: FailureKind) -> Self {
        self.kind = kind;
        self
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}: {}", self.location, self.message)
        } else {
            write!(f, "{}.{}: {}", self.location, self.path, self.message)
        }
    }
}

/// Mistakes in how a chain or the validator was configured.
///
/// These surface from `ChainBuilder::build()` and
/// `ValidatorConfig::from_env()`, before any request is processed.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("unknown validation rule `{rule}`")]
    UnknownRule { rule: String },

    #[error("rule `{rule}` takes {expected} argument(s), got {actual}")]
    Arity {
        rule: String,
        expected: Arity,
        actual: usize,
    },

    #[error("invalid arguments for rule `{rule}`: {reason}")]
    InvalidArguments { rule: String, reason: String },

    #[error("malformed field path `{path}`: {reason}")]
    MalformedLocator { path: String, reason: String },

    #[error("with_message() called before any validator was added")]
    MessageWithoutValidator,

    #[error("invalid value `{value}` for {field}, expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },
}

/// Errors that abort a validation run
#[derive(Debug, Error)]
pub enum RunError {
    /// A custom validator or sanitizer failed on a chain configured to propagate errors
    #[error("validator for {location} field `{path}` failed: {source}")]
    Unexpected {
        location: Location,
        path: String,
        #[source]
        source: BoxError,
    },
}
