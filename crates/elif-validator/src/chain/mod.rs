//! Fluent validation chain builder
//!
//! A chain is started with one of the location constructors, grows one
//! validation item per method call and is frozen by [`ChainBuilder::build`],
//! which is where configuration mistakes surface.
//!
//! ```rust,no_run
//! use elif_validator::{body, LengthOptions};
//!
//! let chain = body("password")
//!     .is_length(LengthOptions::min(8))
//!     .with_message("Password must be at least 8 characters")
//!     .not()
//!     .contains("password")
//!     .build();
//! ```

mod sanitize;
mod standard;

use crate::config::ErrorPolicy;
use crate::error::{ConfigurationError, RunError};
use crate::executor::Executor;
use crate::item::{
    Absence, Condition, CustomFn, IntoCustomOutcome, Message, Meta, SanitizerFn, ValidationItem,
};
use crate::locator::FieldPath;
use crate::record::{Location, Record};
use crate::report::ChainResult;
use crate::rules::RuleRegistry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Field names accepted by the chain constructors
pub trait IntoFields {
    fn into_fields(self) -> Vec<String>;
}

impl IntoFields for &str {
    fn into_fields(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoFields for String {
    fn into_fields(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoFields for &String {
    fn into_fields(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl<S: Into<String>> IntoFields for Vec<S> {
    fn into_fields(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<S: Into<String>, const N: usize> IntoFields for [S; N] {
    fn into_fields(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<S: Into<String> + Clone> IntoFields for &[S] {
    fn into_fields(self) -> Vec<String> {
        self.iter().cloned().map(Into::into).collect()
    }
}

/// Chain over every location: body, cookies, headers, params, query
pub fn check(fields: impl IntoFields) -> ChainBuilder {
    ChainBuilder::new(fields.into_fields(), Location::ALL.to_vec())
}

pub fn body(fields: impl IntoFields) -> ChainBuilder {
    ChainBuilder::new(fields.into_fields(), vec![Location::Body])
}

pub fn cookie(fields: impl IntoFields) -> ChainBuilder {
    ChainBuilder::new(fields.into_fields(), vec![Location::Cookies])
}

/// Header names are matched case-insensitively
pub fn header(fields: impl IntoFields) -> ChainBuilder {
    ChainBuilder::new(fields.into_fields(), vec![Location::Headers])
}

pub fn param(fields: impl IntoFields) -> ChainBuilder {
    ChainBuilder::new(fields.into_fields(), vec![Location::Params])
}

pub fn query(fields: impl IntoFields) -> ChainBuilder {
    ChainBuilder::new(fields.into_fields(), vec![Location::Query])
}

/// Chain over an explicit set of locations, searched in the order given
pub fn check_locations(
    fields: impl IntoFields,
    locations: impl IntoIterator<Item = Location>,
) -> ChainBuilder {
    let mut unique = Vec::new();
    for location in locations {
        if !unique.contains(&location) {
            unique.push(location);
        }
    }
    ChainBuilder::new(fields.into_fields(), unique)
}

/// Chain-level options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainOptions {
    /// Stop an instance at its first failure
    pub bail: bool,
    /// Skip instances whose value is absent under this strategy
    pub optional: Option<Absence>,
    /// Overrides the executor's configured policy
    pub error_policy: Option<ErrorPolicy>,
}

/// Options for `exists()`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExistsOptions {
    /// Treat `false`, `0`, `""` and `null` as missing
    pub check_falsy: bool,
    /// Treat `null` as missing
    pub check_null: bool,
}

impl ExistsOptions {
    pub fn falsy() -> Self {
        Self {
            check_falsy: true,
            check_null: false,
        }
    }

    pub fn null() -> Self {
        Self {
            check_falsy: false,
            check_null: true,
        }
    }

    pub fn absence(&self) -> Absence {
        if self.check_falsy {
            Absence::Falsy
        } else if self.check_null {
            Absence::NullOrUndefined
        } else {
            Absence::UndefinedOnly
        }
    }
}

/// Options for `is_array()`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrayOptions {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl ArrayOptions {
    pub fn min(min: usize) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn range(min: usize, max: usize) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}

/// An item as appended, before standard rules are bound to a registry
enum Draft {
    Standard {
        rule_id: String,
        args: Vec<Value>,
        negated: bool,
        message: Option<Message>,
    },
    Ready(ValidationItem),
}

/// Accumulates validation items for one or more fields
pub struct ChainBuilder {
    fields: Vec<String>,
    locations: Vec<Location>,
    registry: Arc<RuleRegistry>,
    drafts: Vec<Draft>,
    negate_next: bool,
    last_validator: Option<usize>,
    options: ChainOptions,
    error: Option<ConfigurationError>,
}

impl ChainBuilder {
    fn new(fields: Vec<String>, locations: Vec<Location>) -> Self {
        Self {
            fields,
            locations,
            registry: RuleRegistry::shared(),
            drafts: Vec::new(),
            negate_next: false,
            last_validator: None,
            options: ChainOptions::default(),
            error: None,
        }
    }

    /// Keep the first configuration error; `build()` reports it
    pub(crate) fn fail(mut self, error: ConfigurationError) -> Self {
        if self.error.is_none() {
            self.error = Some(error);
        }
        self
    }

    fn take_negation(&mut self) -> bool {
        std::mem::take(&mut self.negate_next)
    }

    fn push_validator(mut self, draft: Draft) -> Self {
        self.last_validator = Some(self.drafts.len());
        self.drafts.push(draft);
        self
    }

    fn push_custom(mut self, name: &str, function: CustomFn) -> Self {
        let negated = self.take_negation();
        self.push_validator(Draft::Ready(ValidationItem::Custom {
            name: name.to_string(),
            function,
            negated,
            message: None,
        }))
    }

    pub(crate) fn push_sanitizer(mut self, name: &str, function: SanitizerFn) -> Self {
        self.drafts.push(Draft::Ready(ValidationItem::Sanitizer {
            name: name.to_string(),
            function,
        }));
        self
    }

    /// Negate the next validator
    pub fn not(mut self) -> Self {
        self.negate_next = true;
        self
    }

    /// Set the message of the most recently added validator
    pub fn with_message(mut self, message: impl Into<Message>) -> Self {
        let Some(index) = self.last_validator else {
            return self.fail(ConfigurationError::MessageWithoutValidator);
        };
        match &mut self.drafts[index] {
            Draft::Standard { message: slot, .. }
            | Draft::Ready(ValidationItem::Custom { message: slot, .. }) => {
                *slot = Some(message.into());
            }
            Draft::Ready(_) => {}
        }
        self
    }

    /// Append a standard rule by name with JSON arguments
    pub fn add_standard_validation(mut self, rule_id: impl Into<String>, args: Vec<Value>) -> Self {
        let negated = self.take_negation();
        self.push_validator(Draft::Standard {
            rule_id: rule_id.into(),
            args,
            negated,
            message: None,
        })
    }

    /// Append a custom predicate; it may return `bool` or `Result<bool, E>`
    pub fn custom<F, R>(self, f: F) -> Self
    where
        F: Fn(Option<&Value>, &Meta) -> R + Send + Sync + 'static,
        R: IntoCustomOutcome,
    {
        self.push_custom("custom", CustomFn::new(f))
    }

    pub fn custom_async<F, Fut, R>(self, f: F) -> Self
    where
        F: Fn(Option<Value>, Meta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoCustomOutcome,
    {
        self.push_custom("custom", CustomFn::new_async(f))
    }

    /// Fail when the value is absent
    pub fn exists(self, options: ExistsOptions) -> Self {
        let absence = options.absence();
        self.push_custom(
            "exists",
            CustomFn::new(move |value, _| !absence.is_absent(value)),
        )
    }

    /// Fail on an empty string, shorthand for `.not().is_empty(..)`
    pub fn not_empty(self, options: crate::rules::EmptyOptions) -> Self {
        self.not().is_empty(options)
    }

    /// Fail unless the value is an array with a length inside the bounds
    pub fn is_array(self, options: ArrayOptions) -> Self {
        self.push_custom(
            "isArray",
            CustomFn::new(move |value, _| match value {
                Some(Value::Array(items)) => {
                    options.min.map_or(true, |min| items.len() >= min)
                        && options.max.map_or(true, |max| items.len() <= max)
                }
                _ => false,
            }),
        )
    }

    /// Fail unless the value is a JSON string
    pub fn is_string(self) -> Self {
        self.push_custom(
            "isString",
            CustomFn::new(|value, _| matches!(value, Some(Value::String(_)))),
        )
    }

    /// Only continue when the predicate passes
    pub fn when<F, R>(mut self, condition: F) -> Self
    where
        F: Fn(Option<&Value>, &Meta) -> R + Send + Sync + 'static,
        R: IntoCustomOutcome,
    {
        self.drafts.push(Draft::Ready(ValidationItem::Conditional {
            condition: Condition::Custom(CustomFn::new(condition)),
        }));
        self
    }

    /// Only continue when `chain` reports no errors for the same record
    pub fn when_chain(mut self, chain: ValidationChain) -> Self {
        self.drafts.push(Draft::Ready(ValidationItem::Conditional {
            condition: Condition::Chain(Box::new(chain)),
        }));
        self
    }

    /// Stop each instance at its first failure
    pub fn bail(mut self) -> Self {
        self.options.bail = true;
        self
    }

    /// Skip instances whose value is absent under `absence`
    pub fn optional(mut self, absence: Absence) -> Self {
        self.options.optional = Some(absence);
        self
    }

    pub fn on_error(mut self, policy: ErrorPolicy) -> Self {
        self.options.error_policy = Some(policy);
        self
    }

    /// Resolve standard rules against `registry` instead of the built-in one
    pub fn with_registry(mut self, registry: Arc<RuleRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Freeze the chain, checking field paths and standard rule arguments
    pub fn build(self) -> Result<ValidationChain, ConfigurationError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let fields = self
            .fields
            .iter()
            .map(|field| FieldPath::parse(field))
            .collect::<Result<Vec<_>, _>>()?;

        let mut items = Vec::with_capacity(self.drafts.len());
        for draft in self.drafts {
            let item = match draft {
                Draft::Standard {
                    rule_id,
                    args,
                    negated,
                    message,
                } => {
                    let rule = self.registry.bind(&rule_id, &args)?;
                    ValidationItem::Standard {
                        rule_id,
                        rule,
                        args,
                        negated,
                        message,
                    }
                }
                Draft::Ready(item) => item,
            };
            items.push(item);
        }

        debug!(
            fields = ?self.fields,
            locations = ?self.locations,
            items = items.len(),
            "validation chain built"
        );

        Ok(ValidationChain {
            fields,
            locations: self.locations,
            items,
            options: self.options,
        })
    }
}

impl fmt::Debug for ChainBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainBuilder")
            .field("fields", &self.fields)
            .field("locations", &self.locations)
            .field("items", &self.drafts.len())
            .field("negate_next", &self.negate_next)
            .field("options", &self.options)
            .field("error", &self.error)
            .finish()
    }
}

/// A frozen chain, ready to run against any number of records
#[derive(Debug, Clone)]
pub struct ValidationChain {
    fields: Vec<FieldPath>,
    locations: Vec<Location>,
    items: Vec<ValidationItem>,
    options: ChainOptions,
}

impl ValidationChain {
    pub fn fields(&self) -> &[FieldPath] {
        &self.fields
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn items(&self) -> &[ValidationItem] {
        &self.items
    }

    pub fn options(&self) -> &ChainOptions {
        &self.options
    }

    /// Run this chain alone with the default configuration
    pub async fn run(&self, record: impl Into<Arc<Record>>) -> Result<ChainResult, RunError> {
        Executor::default().run_chain(self, record.into()).await
    }
}
