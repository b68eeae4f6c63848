//! Per-chain results and the merged validation report

use crate::config::DedupPolicy;
use crate::error::FieldError;
use crate::record::Location;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// Final value of one resolved field instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedField {
    pub location: Location,
    pub path: String,
    /// Value after sanitizers ran; `None` when the field is missing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Outcome of running one chain against one record
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChainResult {
    errors: Vec<FieldError>,
    values: Vec<MatchedField>,
}

impl ChainResult {
    pub fn new(errors: Vec<FieldError>, values: Vec<MatchedField>) -> Self {
        Self { errors, values }
    }

    /// Errors in instance order, then item order
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Final values of the instances that ran
    pub fn values(&self) -> &[MatchedField] {
        &self.values
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Merge chain results in submission order
pub fn merge(results: Vec<ChainResult>, dedup: DedupPolicy) -> ValidationReport {
    let mut errors = Vec::new();
    let mut matched = Vec::new();
    let mut seen: HashSet<(Location, String)> = HashSet::new();

    for result in results {
        for error in result.errors {
            let first = seen.insert((error.location, error.path.clone()));
            if first || dedup == DedupPolicy::All {
                errors.push(error);
            }
        }
        matched.extend(result.values);
    }

    ValidationReport { errors, matched }
}

/// Errors from every chain of a run, plus the sanitized data they saw
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    errors: Vec<FieldError>,
    matched: Vec<MatchedField>,
}

impl ValidationReport {
    /// True when no chain reported an error
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }

    /// First error per field, keyed `location.path` (`body.email`), in report order
    pub fn mapped(&self) -> IndexMap<String, &FieldError> {
        let mut mapped = IndexMap::new();
        for error in &self.errors {
            mapped.entry(field_key(error)).or_insert(error);
        }
        mapped
    }

    /// Errors for a specific path, in any location
    pub fn field_errors(&self, path: &str) -> Vec<&FieldError> {
        self.errors.iter().filter(|error| error.path == path).collect()
    }

    pub fn has_field_errors(&self, path: &str) -> bool {
        self.errors.iter().any(|error| error.path == path)
    }

    /// Sanitized values by path; missing fields are left out and later chains win
    pub fn matched_data(&self) -> IndexMap<String, Value> {
        let mut data = IndexMap::new();
        for field in &self.matched {
            if let Some(value) = &field.value {
                data.insert(field.path.clone(), value.clone());
            }
        }
        data
    }

    /// Every matched instance, including missing ones
    pub fn matched_fields(&self) -> &[MatchedField] {
        &self.matched
    }

    /// Errors grouped by `location.path`, first-seen order
    pub fn fields(&self) -> IndexMap<String, Vec<&FieldError>> {
        let mut fields: IndexMap<String, Vec<&FieldError>> = IndexMap::new();
        for error in &self.errors {
            fields.entry(field_key(error)).or_default().push(error);
        }
        fields
    }

    /// Convert to JSON for API responses
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "error": {
                "code": "validation_failed",
                "message": "Validation failed",
                "fields": self.fields()
            }
        })
    }
}

fn field_key(error: &FieldError) -> String {
    format!("{}.{}", error.location, error.path)
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            write!(f, "No validation errors")
        } else {
            write!(f, "Validation failed for {} field(s):", self.fields().len())?;
            for error in &self.errors {
                write!(f, "\n  {}", error)?;
            }
            Ok(())
        }
    }
}
