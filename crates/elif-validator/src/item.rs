//! Validation items, the steps a chain runs against every field instance

use crate::chain::ValidationChain;
use crate::error::BoxError;
use crate::locator::ConcretePath;
use crate::record::{Location, Record};
use crate::rules::PreparedRule;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Where the value under test came from, handed to custom validators and sanitizers
#[derive(Debug, Clone)]
pub struct Meta {
    record: Arc<Record>,
    location: Location,
    path: ConcretePath,
}

impl Meta {
    pub fn new(record: Arc<Record>, location: Location, path: ConcretePath) -> Self {
        Self {
            record,
            location,
            path,
        }
    }

    /// The whole record, for cross-field checks
    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn path(&self) -> &ConcretePath {
        &self.path
    }
}

/// When a value counts as absent, for `optional()` and `exists()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Absence {
    /// Only a missing value
    #[default]
    UndefinedOnly,
    /// A missing value or JSON `null`
    NullOrUndefined,
    /// Missing, `null`, `false`, `0` or `""`
    Falsy,
}

impl Absence {
    pub fn is_absent(&self, value: Option<&Value>) -> bool {
        match (self, value) {
            (_, None) => true,
            (Absence::UndefinedOnly, Some(_)) => false,
            (Absence::NullOrUndefined, Some(value)) => value.is_null(),
            (Absence::Falsy, Some(value)) => match value {
                Value::Null => true,
                Value::Bool(b) => !b,
                Value::Number(n) => n.as_f64() == Some(0.0),
                Value::String(s) => s.is_empty(),
                Value::Array(_) | Value::Object(_) => false,
            },
        }
    }
}

/// What a custom validator produced: pass/fail, or an error it raised
pub type CustomOutcome = Result<bool, BoxError>;

/// Return types accepted from custom validators
pub trait IntoCustomOutcome {
    fn into_outcome(self) -> CustomOutcome;
}

impl IntoCustomOutcome for bool {
    fn into_outcome(self) -> CustomOutcome {
        Ok(self)
    }
}

impl<E> IntoCustomOutcome for Result<bool, E>
where
    E: Into<BoxError>,
{
    fn into_outcome(self) -> CustomOutcome {
        self.map_err(Into::into)
    }
}

type SyncCustom = dyn Fn(Option<&Value>, &Meta) -> CustomOutcome + Send + Sync;
type AsyncCustom = dyn Fn(Option<Value>, Meta) -> BoxFuture<'static, CustomOutcome> + Send + Sync;

/// A caller-supplied predicate, synchronous or asynchronous
#[derive(Clone)]
pub enum CustomFn {
    Sync(Arc<SyncCustom>),
    Async(Arc<AsyncCustom>),
}

impl CustomFn {
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(Option<&Value>, &Meta) -> R + Send + Sync + 'static,
        R: IntoCustomOutcome,
    {
        CustomFn::Sync(Arc::new(move |value, meta| f(value, meta).into_outcome()))
    }

    pub fn new_async<F, Fut, R>(f: F) -> Self
    where
        F: Fn(Option<Value>, Meta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoCustomOutcome,
    {
        CustomFn::Async(Arc::new(move |value, meta| {
            let future = f(value, meta);
            Box::pin(async move { future.await.into_outcome() })
        }))
    }

    pub async fn call(&self, value: Option<&Value>, meta: &Meta) -> CustomOutcome {
        match self {
            CustomFn::Sync(f) => f(value, meta),
            CustomFn::Async(f) => f(value.cloned(), meta.clone()).await,
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(self, CustomFn::Async(_))
    }
}

impl fmt::Debug for CustomFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomFn::Sync(_) => f.write_str("CustomFn::Sync"),
            CustomFn::Async(_) => f.write_str("CustomFn::Async"),
        }
    }
}

/// Return types accepted from sanitizers; `None` makes the value missing
pub trait IntoSanitized {
    fn into_sanitized(self) -> Option<Value>;
}

impl IntoSanitized for Value {
    fn into_sanitized(self) -> Option<Value> {
        Some(self)
    }
}

impl IntoSanitized for Option<Value> {
    fn into_sanitized(self) -> Option<Value> {
        self
    }
}

type SyncSanitizer = dyn Fn(Option<&Value>, &Meta) -> Option<Value> + Send + Sync;
type AsyncSanitizer = dyn Fn(Option<Value>, Meta) -> BoxFuture<'static, Option<Value>> + Send + Sync;

/// A value rewrite, synchronous or asynchronous
#[derive(Clone)]
pub enum SanitizerFn {
    Sync(Arc<SyncSanitizer>),
    Async(Arc<AsyncSanitizer>),
}

impl SanitizerFn {
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(Option<&Value>, &Meta) -> R + Send + Sync + 'static,
        R: IntoSanitized,
    {
        SanitizerFn::Sync(Arc::new(move |value, meta| f(value, meta).into_sanitized()))
    }

    pub fn new_async<F, Fut, R>(f: F) -> Self
    where
        F: Fn(Option<Value>, Meta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoSanitized,
    {
        SanitizerFn::Async(Arc::new(move |value, meta| {
            let future = f(value, meta);
            Box::pin(async move { future.await.into_sanitized() })
        }))
    }

    pub async fn call(&self, value: Option<&Value>, meta: &Meta) -> Option<Value> {
        match self {
            SanitizerFn::Sync(f) => f(value, meta),
            SanitizerFn::Async(f) => f(value.cloned(), meta.clone()).await,
        }
    }
}

impl fmt::Debug for SanitizerFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SanitizerFn::Sync(_) => f.write_str("SanitizerFn::Sync"),
            SanitizerFn::Async(_) => f.write_str("SanitizerFn::Async"),
        }
    }
}

type MessageFn = dyn Fn(Option<&Value>, &Meta) -> String + Send + Sync;

/// Error message of a validation item
#[derive(Clone)]
pub enum Message {
    Static(String),
    /// Built from the failing value and its location
    Dynamic(Arc<MessageFn>),
}

impl Message {
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(Option<&Value>, &Meta) -> String + Send + Sync + 'static,
    {
        Message::Dynamic(Arc::new(f))
    }

    pub fn render(&self, value: Option<&Value>, meta: &Meta) -> String {
        match self {
            Message::Static(text) => text.clone(),
            Message::Dynamic(f) => f(value, meta),
        }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::Static(text.to_string())
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::Static(text)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Static(text) => f.debug_tuple("Static").field(text).finish(),
            Message::Dynamic(_) => f.write_str("Dynamic"),
        }
    }
}

/// What a `Conditional` item checks before the rest of the chain runs
#[derive(Clone, Debug)]
pub enum Condition {
    /// Holds when the predicate passes
    Custom(CustomFn),
    /// Holds when the chain reports no errors against the same record
    Chain(Box<ValidationChain>),
}

/// One step of a built chain
#[derive(Clone)]
pub enum ValidationItem {
    Standard {
        rule_id: String,
        rule: Arc<dyn PreparedRule>,
        args: Vec<Value>,
        negated: bool,
        message: Option<Message>,
    },
    Custom {
        /// `custom`, or the helper that created it (`exists`, `isArray`, ...)
        name: String,
        function: CustomFn,
        negated: bool,
        message: Option<Message>,
    },
    Conditional {
        condition: Condition,
    },
    Sanitizer {
        name: String,
        function: SanitizerFn,
    },
}

impl ValidationItem {
    /// Rule id for standard items, helper or sanitizer name otherwise
    pub fn rule_id(&self) -> &str {
        match self {
            ValidationItem::Standard { rule_id, .. } => rule_id,
            ValidationItem::Custom { name, .. } => name,
            ValidationItem::Conditional { .. } => "if",
            ValidationItem::Sanitizer { name, .. } => name,
        }
    }

    pub fn args(&self) -> &[Value] {
        match self {
            ValidationItem::Standard { args, .. } => args,
            _ => &[],
        }
    }

    pub fn is_negated(&self) -> bool {
        match self {
            ValidationItem::Standard { negated, .. } | ValidationItem::Custom { negated, .. } => {
                *negated
            }
            _ => false,
        }
    }

    pub fn message(&self) -> Option<&Message> {
        match self {
            ValidationItem::Standard { message, .. } | ValidationItem::Custom { message, .. } => {
                message.as_ref()
            }
            _ => None,
        }
    }

    /// Standard and custom items produce pass/fail; the others don't
    pub fn is_validator(&self) -> bool {
        matches!(
            self,
            ValidationItem::Standard { .. } | ValidationItem::Custom { .. }
        )
    }
}

impl fmt::Debug for ValidationItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationItem::Standard {
                rule_id,
                args,
                negated,
                message,
                ..
            } => f
                .debug_struct("Standard")
                .field("rule_id", rule_id)
                .field("args", args)
                .field("negated", negated)
                .field("message", message)
                .finish(),
            ValidationItem::Custom {
                name,
                function,
                negated,
                message,
            } => f
                .debug_struct("Custom")
                .field("name", name)
                .field("function", function)
                .field("negated", negated)
                .field("message", message)
                .finish(),
            ValidationItem::Conditional { condition } => f
                .debug_struct("Conditional")
                .field("condition", condition)
                .finish(),
            ValidationItem::Sanitizer { name, function } => f
                .debug_struct("Sanitizer")
                .field("name", name)
                .field("function", function)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta() -> Meta {
        let record = Record::new().with_body(json!({ "password": "secret" }));
        Meta::new(Arc::new(record), Location::Body, ConcretePath::root())
    }

    #[test]
    fn test_absence_strategies() {
        let zero = json!(0);
        let null = Value::Null;
        let empty = json!("");
        let text_zero = json!("0");

        assert!(Absence::UndefinedOnly.is_absent(None));
        assert!(!Absence::UndefinedOnly.is_absent(Some(&null)));

        assert!(Absence::NullOrUndefined.is_absent(Some(&null)));
        assert!(!Absence::NullOrUndefined.is_absent(Some(&empty)));

        assert!(Absence::Falsy.is_absent(Some(&zero)));
        assert!(Absence::Falsy.is_absent(Some(&json!(0.0))));
        assert!(Absence::Falsy.is_absent(Some(&json!(false))));
        assert!(Absence::Falsy.is_absent(Some(&empty)));
        assert!(!Absence::Falsy.is_absent(Some(&text_zero)));
        assert!(!Absence::Falsy.is_absent(Some(&json!([]))));
    }

    #[tokio::test]
    async fn test_custom_fn_outcomes() {
        let meta = meta();
        let value = json!("secret");

        let plain = CustomFn::new(|value, _| value.is_some());
        assert!(plain.call(Some(&value), &meta).await.unwrap());
        assert!(!plain.call(None, &meta).await.unwrap());

        let matches_password = CustomFn::new(|value, meta| {
            if value == meta.record().body().get("password") {
                Ok(true)
            } else {
                Err("Passwords do not match")
            }
        });
        assert!(matches_password.call(Some(&value), &meta).await.unwrap());
        let error = matches_password.call(Some(&json!("other")), &meta).await.unwrap_err();
        assert_eq!(error.to_string(), "Passwords do not match");
    }

    #[tokio::test]
    async fn test_async_custom_fn() {
        let check = CustomFn::new_async(|value, _| async move { value == Some(json!("ok")) });
        assert!(check.is_async());
        assert!(check.call(Some(&json!("ok")), &meta()).await.unwrap());
        assert!(!check.call(Some(&json!("no")), &meta()).await.unwrap());
    }

    #[tokio::test]
    async fn test_sanitizer_fn() {
        let upper = SanitizerFn::new(|value, _| {
            value.and_then(Value::as_str).map(|s| json!(s.to_uppercase()))
        });
        assert_eq!(upper.call(Some(&json!("abc")), &meta()).await, Some(json!("ABC")));
        assert_eq!(upper.call(None, &meta()).await, None);

        let fill = SanitizerFn::new(|_, _| json!("filled"));
        assert_eq!(fill.call(None, &meta()).await, Some(json!("filled")));
    }

    #[test]
    fn test_dynamic_message() {
        let message = Message::dynamic(|value, meta| {
            format!("{} at {} is invalid", value.map(Value::to_string).unwrap_or_default(), meta.location())
        });
        assert_eq!(message.render(Some(&json!(3)), &meta()), "3 at body is invalid");
        assert_eq!(Message::from("Fixed").render(None, &meta()), "Fixed");
    }
}
