//! Standard rules and the registry that resolves them by name
//!
//! A standard rule is a predicate over the string form of a field value plus
//! a list of JSON arguments. Rules are looked up and prepared when a chain is
//! built: arguments are parsed and patterns compiled once, so an unknown rule
//! or a bad argument is reported before any request is seen.

pub mod encoding;
pub mod identifiers;
pub mod network;
pub mod numeric;
pub mod string;
pub mod temporal;

use crate::error::ConfigurationError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub use encoding::HashAlgorithm;
pub use network::{EmailOptions, FqdnOptions, MacAddressOptions, UrlOptions};
pub use numeric::{DecimalOptions, FloatOptions, IntOptions, NumericOptions};
pub use identifiers::IssnOptions;
pub use string::{EmptyOptions, LengthOptions};
pub use temporal::Iso8601Options;

/// Number of arguments a rule accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: usize,
}

impl Arity {
    pub const NONE: Arity = Arity { min: 0, max: 0 };

    pub const fn exactly(count: usize) -> Self {
        Self { min: count, max: count }
    }

    /// Up to `max` arguments, all optional
    pub const fn optional(max: usize) -> Self {
        Self { min: 0, max }
    }

    pub const fn range(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && count <= self.max
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{} to {}", self.min, self.max)
        }
    }
}

/// A named predicate usable through `ChainBuilder::add_standard_validation`
pub trait StandardRule: Send + Sync {
    /// Rule identifier, e.g. `isEmail`
    fn name(&self) -> &str;

    /// Accepted argument count
    fn arity(&self) -> Arity {
        Arity::NONE
    }

    /// Parse and check `args` once, when a chain is built
    fn prepare(&self, args: &[Value]) -> Result<Arc<dyn PreparedRule>, String>;
}

/// A rule bound to its arguments, ready to test values
#[async_trait]
pub trait PreparedRule: Send + Sync {
    /// Test the string form of a value
    async fn test(&self, input: &str) -> bool;
}

type Matcher = Arc<dyn Fn(&str) -> bool + Send + Sync>;
type PrepareFn = Arc<dyn Fn(&[Value]) -> Result<Matcher, String> + Send + Sync>;

/// A rule backed by plain functions
#[derive(Clone)]
pub struct FnRule {
    name: String,
    arity: Arity,
    prepare: PrepareFn,
}

impl FnRule {
    /// A rule handed its raw arguments on every test
    pub fn new<F>(name: impl Into<String>, arity: Arity, test: F) -> Self
    where
        F: Fn(&str, &[Value]) -> bool + Send + Sync + 'static,
    {
        let test = Arc::new(test);
        Self::prepared(name, arity, move |args: &[Value]| {
            let test = Arc::clone(&test);
            let args = args.to_vec();
            Ok(move |input: &str| test(input, &args))
        })
    }

    /// A rule that turns its arguments into a matcher once, rejecting bad ones
    pub fn prepared<P, M>(name: impl Into<String>, arity: Arity, prepare: P) -> Self
    where
        P: Fn(&[Value]) -> Result<M, String> + Send + Sync + 'static,
        M: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            arity,
            prepare: Arc::new(move |args: &[Value]| {
                prepare(args).map(|matcher| Arc::new(matcher) as Matcher)
            }),
        }
    }
}

impl fmt::Debug for FnRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRule")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

impl StandardRule for FnRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> Arity {
        self.arity
    }

    fn prepare(&self, args: &[Value]) -> Result<Arc<dyn PreparedRule>, String> {
        let matcher = (self.prepare)(args)?;
        Ok(Arc::new(FnMatcher(matcher)))
    }
}

struct FnMatcher(Matcher);

#[async_trait]
impl PreparedRule for FnMatcher {
    async fn test(&self, input: &str) -> bool {
        (self.0)(input)
    }
}

/// A rule configured by a single optional options object
pub(crate) fn options_rule<T>(name: &str, test: fn(&str, &T) -> bool) -> FnRule
where
    T: DeserializeOwned + Default + Send + Sync + 'static,
{
    FnRule::prepared(name, Arity::optional(1), move |args: &[Value]| {
        let opts: T = options(args, 0)?;
        Ok(move |input: &str| test(input, &opts))
    })
}

static STANDARD: Lazy<Arc<RuleRegistry>> = Lazy::new(|| Arc::new(RuleRegistry::standard()));

/// Maps rule names to rules
#[derive(Clone, Default)]
pub struct RuleRegistry {
    rules: HashMap<String, Arc<dyn StandardRule>>,
}

impl RuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in rule
    pub fn standard() -> Self {
        let mut registry = Self::new();
        string::register(&mut registry);
        encoding::register(&mut registry);
        numeric::register(&mut registry);
        identifiers::register(&mut registry);
        network::register(&mut registry);
        temporal::register(&mut registry);
        registry
    }

    /// The process-wide built-in registry used by chains that don't attach their own
    pub fn shared() -> Arc<RuleRegistry> {
        Arc::clone(&STANDARD)
    }

    /// Add a rule, replacing any rule of the same name
    pub fn register<R>(&mut self, rule: R) -> &mut Self
    where
        R: StandardRule + 'static,
    {
        self.rules.insert(rule.name().to_string(), Arc::new(rule));
        self
    }

    /// Add a rule backed by a closure
    pub fn register_fn<F>(&mut self, name: impl Into<String>, arity: Arity, test: F) -> &mut Self
    where
        F: Fn(&str, &[Value]) -> bool + Send + Sync + 'static,
    {
        self.register(FnRule::new(name, arity, test))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Registered rule names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Look up a rule by name
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn StandardRule>, ConfigurationError> {
        self.rules
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigurationError::UnknownRule {
                rule: name.to_string(),
            })
    }

    /// Look up a rule and prepare it with `args`
    pub fn bind(&self, name: &str, args: &[Value]) -> Result<Arc<dyn PreparedRule>, ConfigurationError> {
        let rule = self.lookup(name)?;

        let arity = rule.arity();
        if !arity.accepts(args.len()) {
            return Err(ConfigurationError::Arity {
                rule: name.to_string(),
                expected: arity,
                actual: args.len(),
            });
        }

        rule.prepare(args)
            .map_err(|reason| ConfigurationError::InvalidArguments {
                rule: name.to_string(),
                reason,
            })
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.names())
            .finish()
    }
}

/// String form of a value as standard rules see it.
///
/// Missing and null become the empty string, strings pass through,
/// integral floats drop their fraction (`1.0` is `"1"`), everything else is
/// rendered as compact JSON.
pub fn stringify(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < MAX_EXACT_FLOAT => {
                (f as i64).to_string()
            }
            _ => n.to_string(),
        },
        Some(other) => other.to_string(),
    }
}

// 2^53, past which not every integer is representable
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Deserialize the options object at `index`; missing or null means defaults
pub(crate) fn options<T>(args: &[Value], index: usize) -> Result<T, String>
where
    T: DeserializeOwned + Default,
{
    match args.get(index) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| e.to_string()),
    }
}

/// Compile one of the built-in patterns
pub(crate) fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("built-in pattern is valid")
}

/// Optional string argument at `index`
pub(crate) fn string_arg(args: &[Value], index: usize) -> Option<String> {
    match args.get(index) {
        None | Some(Value::Null) => None,
        Some(value) => Some(stringify(Some(value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct AlwaysTrue;

    impl StandardRule for AlwaysTrue {
        fn name(&self) -> &str {
            "alwaysTrue"
        }

        fn prepare(&self, _args: &[Value]) -> Result<Arc<dyn PreparedRule>, String> {
            Ok(Arc::new(AlwaysTrue))
        }
    }

    #[async_trait]
    impl PreparedRule for AlwaysTrue {
        async fn test(&self, _input: &str) -> bool {
            true
        }
    }

    #[test]
    fn test_standard_registry_contents() {
        let registry = RuleRegistry::standard();
        for name in ["isEmail", "isInt", "matches", "isLength", "isEmpty", "isUUID", "isURL"] {
            assert!(registry.contains(name), "missing {}", name);
        }
        assert!(registry.len() > 50);
    }

    #[test]
    fn test_unknown_rule() {
        let registry = RuleRegistry::standard();
        let result = registry.lookup("isMagic");
        assert!(matches!(result, Err(ConfigurationError::UnknownRule { .. })));
    }

    #[test]
    fn test_bind_checks_arity_and_args() {
        let registry = RuleRegistry::standard();

        let result = registry.bind("isAscii", &[json!(1)]);
        assert!(matches!(result, Err(ConfigurationError::Arity { actual: 1, .. })));

        let result = registry.bind("isLength", &[json!({ "min": "two" })]);
        assert!(matches!(result, Err(ConfigurationError::InvalidArguments { .. })));

        assert!(registry.bind("isLength", &[json!({ "min": 2 })]).is_ok());
    }

    #[tokio::test]
    async fn test_register_custom_rule() {
        let mut registry = RuleRegistry::new();
        registry
            .register(AlwaysTrue)
            .register_fn("isShout", Arity::NONE, |input, _| input.ends_with('!'));

        assert_eq!(registry.names(), vec!["alwaysTrue", "isShout"]);

        let rule = registry.bind("isShout", &[]).unwrap();
        assert!(rule.test("hey!").await);
        assert!(!rule.test("hey").await);

        let rule = registry.bind("alwaysTrue", &[]).unwrap();
        assert!(rule.test("").await);
    }

    #[tokio::test]
    async fn test_prepared_rule_keeps_its_arguments() {
        let mut registry = RuleRegistry::new();
        registry.register(FnRule::prepared("isPrefixed", Arity::exactly(1), |args: &[Value]| {
            let prefix = string_arg(args, 0).ok_or("prefix is required")?;
            Ok(move |input: &str| input.starts_with(&prefix))
        }));

        let rule = registry.bind("isPrefixed", &[json!("id-")]).unwrap();
        assert!(rule.test("id-42").await);
        assert!(!rule.test("42").await);

        let result = registry.bind("isPrefixed", &[Value::Null]);
        assert!(matches!(result, Err(ConfigurationError::InvalidArguments { .. })));
    }

    #[test]
    fn test_stringify() {
        assert_eq!(stringify(None), "");
        assert_eq!(stringify(Some(&Value::Null)), "");
        assert_eq!(stringify(Some(&json!("abc"))), "abc");
        assert_eq!(stringify(Some(&json!(42))), "42");
        assert_eq!(stringify(Some(&json!(1.5))), "1.5");
        assert_eq!(stringify(Some(&json!(1.0))), "1");
        assert_eq!(stringify(Some(&json!(-3.0))), "-3");
        assert_eq!(stringify(Some(&json!(1e300))), "1e300");
        assert_eq!(stringify(Some(&json!(true))), "true");
        assert_eq!(stringify(Some(&json!({ "a": 1 }))), r#"{"a":1}"#);
    }

    #[test]
    fn test_integral_float_passes_is_int() {
        assert!(check("isInt", &stringify(Some(&json!(1.0))), &[]));
        assert!(!check("isInt", &stringify(Some(&json!(1.5))), &[]));
    }
}

/// Bind `name` from the shared registry and test `input` against it
#[cfg(test)]
pub(crate) fn check(name: &str, input: &str, args: &[Value]) -> bool {
    use futures_util::FutureExt;

    let rule = RuleRegistry::shared()
        .bind(name, args)
        .unwrap_or_else(|e| panic!("{} failed to bind: {}", name, e));
    rule.test(input)
        .now_or_never()
        .expect("standard rules finish without waiting")
}

/// Whether `name` refuses `args` when a chain is built
#[cfg(test)]
pub(crate) fn rejects(name: &str, args: &[Value]) -> bool {
    RuleRegistry::shared().bind(name, args).is_err()
}
