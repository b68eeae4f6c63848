//! Runs built chains against a record
//!
//! Every chain, and every field instance within a chain, runs as its own
//! future; they are driven together with `join_all` on the caller's task.
//! Items of one instance run strictly in order.

use crate::chain::ValidationChain;
use crate::config::{ErrorPolicy, ReportedValue, ValidatorConfig};
use crate::error::{FailureKind, FieldError, RunError};
use crate::item::{Condition, Meta, ValidationItem};
use crate::locator::{resolve, ConcretePath};
use crate::record::{Location, Record};
use crate::report::{merge, ChainResult, MatchedField, ValidationReport};
use crate::rules::stringify;
use futures_util::future::{join_all, BoxFuture};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace, warn, Instrument};

/// One concrete field a chain runs against
#[derive(Debug, Clone)]
struct Instance {
    location: Location,
    path: ConcretePath,
    original: Option<Value>,
}

/// What one instance produced
struct InstanceOutcome {
    errors: Vec<FieldError>,
    /// `None` when the instance was skipped as optional
    matched: Option<MatchedField>,
}

/// Executes validation chains with a shared configuration
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ValidatorConfig,
}

impl Executor {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Run every chain and merge their results.
    ///
    /// A propagated custom-validator error fails the run, but only after
    /// all chains have finished.
    pub async fn run(
        &self,
        chains: &[ValidationChain],
        record: impl Into<Arc<Record>>,
    ) -> Result<ValidationReport, RunError> {
        let record = record.into();
        debug!(chains = chains.len(), "validation run started");

        let outcomes = join_all(
            chains
                .iter()
                .map(|chain| self.run_chain(chain, Arc::clone(&record))),
        )
        .await;

        let mut results = Vec::with_capacity(outcomes.len());
        let mut failure = None;
        for outcome in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(error) => {
                    failure.get_or_insert(error);
                }
            }
        }
        if let Some(error) = failure {
            return Err(error);
        }

        let report = merge(results, self.config.dedup);
        debug!(errors = report.len(), "validation run finished");
        Ok(report)
    }

    /// Run one chain; boxed because conditional items may run chains themselves
    pub fn run_chain<'a>(
        &'a self,
        chain: &'a ValidationChain,
        record: Arc<Record>,
    ) -> BoxFuture<'a, Result<ChainResult, RunError>> {
        let paths: Vec<&str> = chain.fields().iter().map(|field| field.as_str()).collect();
        let span = tracing::debug_span!(
            "validation_chain",
            paths = ?paths,
            locations = ?chain.locations()
        );

        Box::pin(
            async move {
                let instances = select_instances(chain, &record);
                trace!(instances = instances.len(), "instances resolved");

                let outcomes = join_all(
                    instances
                        .into_iter()
                        .map(|instance| self.run_instance(chain, &record, instance)),
                )
                .await;

                let mut errors = Vec::new();
                let mut values = Vec::new();
                let mut failure = None;
                for outcome in outcomes {
                    match outcome {
                        Ok(outcome) => {
                            errors.extend(outcome.errors);
                            values.extend(outcome.matched);
                        }
                        Err(error) => {
                            failure.get_or_insert(error);
                        }
                    }
                }
                if let Some(error) = failure {
                    return Err(error);
                }

                debug!(errors = errors.len(), "validation chain finished");
                Ok(ChainResult::new(errors, values))
            }
            .instrument(span),
        )
    }

    async fn run_instance(
        &self,
        chain: &ValidationChain,
        record: &Arc<Record>,
        instance: Instance,
    ) -> Result<InstanceOutcome, RunError> {
        let Instance {
            location,
            path,
            original,
        } = instance;
        let options = chain.options();

        if let Some(absence) = options.optional {
            if absence.is_absent(original.as_ref()) {
                trace!(%location, path = %path, "optional value absent, skipping");
                return Ok(InstanceOutcome {
                    errors: Vec::new(),
                    matched: None,
                });
            }
        }

        let policy = options.error_policy.unwrap_or(self.config.error_policy);
        let meta = Meta::new(Arc::clone(record), location, path.clone());
        let path_text = path.to_string();
        let mut current = original.clone();
        let mut errors = Vec::new();

        for item in chain.items() {
            let failures_before = errors.len();

            match item {
                ValidationItem::Sanitizer { function, .. } => {
                    current = function.call(current.as_ref(), &meta).await;
                }
                ValidationItem::Conditional { condition } => {
                    let holds = match condition {
                        Condition::Custom(function) => {
                            match function.call(current.as_ref(), &meta).await {
                                Ok(holds) => holds,
                                Err(error) if policy == ErrorPolicy::Propagate => {
                                    warn!(%location, path = %path_text, %error, "condition failed, propagating");
                                    return Err(RunError::Unexpected {
                                        location,
                                        path: path_text,
                                        source: error,
                                    });
                                }
                                Err(error) => {
                                    warn!(%location, path = %path_text, %error, "condition failed");
                                    false
                                }
                            }
                        }
                        Condition::Chain(condition) => !self
                            .run_chain(condition, Arc::clone(record))
                            .await?
                            .has_errors(),
                    };
                    if !holds {
                        trace!(%location, path = %path_text, "condition not met, stopping");
                        break;
                    }
                }
                ValidationItem::Standard {
                    rule_id,
                    rule,
                    negated,
                    message,
                    ..
                } => {
                    // arrays are tested element by element
                    let elements: Vec<(Option<usize>, Option<&Value>)> = match &current {
                        Some(Value::Array(items)) => {
                            items.iter().enumerate().map(|(i, item)| (Some(i), Some(item))).collect()
                        }
                        other => vec![(None, other.as_ref())],
                    };
                    for (index, element) in elements {
                        let passed = rule.test(&stringify(element)).await != *negated;
                        trace!(rule = %rule_id, path = %path_text, passed, "rule evaluated");
                        if !passed {
                            let message = match message {
                                Some(message) => message.render(element, &meta),
                                None => self.config.default_message.clone(),
                            };
                            let value = match index {
                                Some(index) => reported_element(
                                    self.config.reported_value,
                                    element,
                                    &original,
                                    index,
                                ),
                                None => reported(self.config.reported_value, &current, &original),
                            };
                            errors.push(self.failure(
                                location,
                                &path_text,
                                rule_id,
                                message,
                                FailureKind::Invalid,
                                value,
                            ));
                        }
                    }
                }
                ValidationItem::Custom {
                    name,
                    function,
                    negated,
                    message,
                } => match function.call(current.as_ref(), &meta).await {
                    Ok(result) => {
                        let passed = result != *negated;
                        trace!(rule = %name, path = %path_text, passed, "custom validator evaluated");
                        if !passed {
                            let message = match message {
                                Some(message) => message.render(current.as_ref(), &meta),
                                None => self.config.default_message.clone(),
                            };
                            errors.push(self.failure(
                                location,
                                &path_text,
                                name,
                                message,
                                FailureKind::Invalid,
                                reported(self.config.reported_value, &current, &original),
                            ));
                        }
                    }
                    Err(error) if policy == ErrorPolicy::Propagate => {
                        warn!(rule = %name, %location, path = %path_text, %error, "custom validator failed, propagating");
                        return Err(RunError::Unexpected {
                            location,
                            path: path_text,
                            source: error,
                        });
                    }
                    Err(error) if *negated => {
                        trace!(rule = %name, path = %path_text, %error, "negated custom validator failed, passing");
                    }
                    Err(error) => {
                        warn!(rule = %name, %location, path = %path_text, %error, "custom validator failed");
                        let message = match message {
                            Some(message) => message.render(current.as_ref(), &meta),
                            None => error.to_string(),
                        };
                        errors.push(self.failure(
                            location,
                            &path_text,
                            name,
                            message,
                            FailureKind::Errored,
                            reported(self.config.reported_value, &current, &original),
                        ));
                    }
                },
            }

            if options.bail && errors.len() > failures_before {
                trace!(%location, path = %path_text, "bailing after first failure");
                break;
            }
        }

        Ok(InstanceOutcome {
            errors,
            matched: Some(MatchedField {
                location,
                path: path_text,
                value: current,
            }),
        })
    }

    fn failure(
        &self,
        location: Location,
        path: &str,
        rule: &str,
        message: String,
        kind: FailureKind,
        value: Option<Value>,
    ) -> FieldError {
        FieldError::new(location, path, message)
            .value(value)
            .rule(rule)
            .kind(kind)
    }
}

fn reported(which: ReportedValue, current: &Option<Value>, original: &Option<Value>) -> Option<Value> {
    match which {
        ReportedValue::Current => current.clone(),
        ReportedValue::Original => original.clone(),
    }
}

/// Value reported for the failing element at `index` of an array
fn reported_element(
    which: ReportedValue,
    element: Option<&Value>,
    original: &Option<Value>,
    index: usize,
) -> Option<Value> {
    match (which, original) {
        (ReportedValue::Current, _) => element.cloned(),
        (ReportedValue::Original, Some(Value::Array(items))) => items.get(index).cloned(),
        (ReportedValue::Original, other) => other.clone(),
    }
}

/// Resolve every field of `chain` in every location it searches.
///
/// With several locations, a field found anywhere drops its missing
/// instances; a field found nowhere keeps one missing instance in the
/// first location.
fn select_instances(chain: &ValidationChain, record: &Record) -> Vec<Instance> {
    let mut instances = Vec::new();

    for field in chain.fields() {
        let mut found = Vec::new();
        for &location in chain.locations() {
            let lookup = if location == Location::Headers {
                field.to_lowercase()
            } else {
                field.clone()
            };
            found.extend(resolve(record.get(location), &lookup).into_iter().map(|resolved| {
                Instance {
                    location,
                    path: resolved.path,
                    original: resolved.value.cloned(),
                }
            }));
        }

        let multi_location = chain.locations().len() > 1;
        if found.is_empty() {
            if let Some(&location) = chain.locations().first() {
                instances.push(Instance {
                    location,
                    path: field.unmatched_path(),
                    original: None,
                });
            }
        } else if multi_location && found.iter().any(|instance| instance.original.is_some()) {
            instances.extend(found.into_iter().filter(|instance| instance.original.is_some()));
        } else if multi_location {
            instances.extend(found.into_iter().take(1));
        } else {
            instances.extend(found);
        }
    }

    instances
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{body, check, header, query};
    use crate::config::DedupPolicy;
    use crate::item::Absence;
    use crate::rules::{EmptyOptions, IntOptions, LengthOptions};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn record(body: Value) -> Record {
        Record::new().with_body(body)
    }

    #[tokio::test]
    async fn test_passing_chain_has_no_errors() {
        let chain = body("email").is_email(Default::default()).build().unwrap();
        let result = chain.run(record(json!({ "email": "user@example.com" }))).await.unwrap();

        assert!(!result.has_errors());
        assert_eq!(result.values()[0].value, Some(json!("user@example.com")));
    }

    #[tokio::test]
    async fn test_failure_records_location_path_value_and_rule() {
        let chain = body("age").is_int(IntOptions::new().min(18)).build().unwrap();
        let result = chain.run(record(json!({ "age": 12 }))).await.unwrap();

        let error = &result.errors()[0];
        assert_eq!(error.location, Location::Body);
        assert_eq!(error.path, "age");
        assert_eq!(error.value, Some(json!(12)));
        assert_eq!(error.message, "Invalid value");
        assert_eq!(error.rule.as_deref(), Some("isInt"));
        assert_eq!(error.kind, FailureKind::Invalid);
    }

    #[tokio::test]
    async fn test_missing_field_runs_against_none() {
        let chain = body("name").not_empty(EmptyOptions::default()).build().unwrap();
        let result = chain.run(record(json!({}))).await.unwrap();

        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.errors()[0].value, None);
    }

    #[tokio::test]
    async fn test_arrays_are_tested_per_element() {
        let chain = body("tags").is_length(LengthOptions::max(3)).build().unwrap();
        let result = chain.run(record(json!({ "tags": ["ok", "toolong", "bad!!"] }))).await.unwrap();

        assert_eq!(result.errors().len(), 2);
        assert!(result.errors().iter().all(|e| e.path == "tags"));

        let values: Vec<_> = result.errors().iter().map(|e| e.value.clone()).collect();
        assert_eq!(values, vec![Some(json!("toolong")), Some(json!("bad!!"))]);
    }

    #[tokio::test]
    async fn test_array_element_feeds_dynamic_message() {
        let chain = body("tags")
            .is_length(LengthOptions::max(3))
            .with_message(crate::Message::dynamic(|value, _| {
                format!("`{}` is too long", stringify(value))
            }))
            .build()
            .unwrap();
        let result = chain.run(record(json!({ "tags": ["ok", "toolong"] }))).await.unwrap();

        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.errors()[0].message, "`toolong` is too long");
    }

    #[tokio::test]
    async fn test_array_element_reported_as_original() {
        let chain = body("tags")
            .custom_sanitizer(|value, _| match value {
                Some(Value::Array(items)) => Value::Array(
                    items
                        .iter()
                        .map(|item| json!(format!("{}!!", stringify(Some(item)))))
                        .collect(),
                ),
                other => other.cloned().unwrap_or(Value::Null),
            })
            .is_length(LengthOptions::max(4))
            .build()
            .unwrap();
        let data = record(json!({ "tags": ["ab", "abc"] }));

        let current = Executor::default().run(&[chain.clone()], data.clone()).await.unwrap();
        assert_eq!(current.errors()[0].value, Some(json!("abc!!")));

        let executor = Executor::new(ValidatorConfig::new().with_reported_value(ReportedValue::Original));
        let original = executor.run(&[chain], data).await.unwrap();
        assert_eq!(original.errors()[0].value, Some(json!("abc")));
    }

    #[tokio::test]
    async fn test_wildcard_instances_run_in_order() {
        let chain = body("users.*.email")
            .is_email(Default::default())
            .build()
            .unwrap();
        let data = json!({
            "users": [
                { "email": "bad" },
                { "email": "good@example.com" },
                { "email": "also bad" }
            ]
        });
        let result = chain.run(record(data)).await.unwrap();

        let paths: Vec<&str> = result.errors().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["users[0].email", "users[2].email"]);
    }

    #[tokio::test]
    async fn test_vacuous_wildcard_runs_once_against_none() {
        let chain = body("items.*.sku").exists(Default::default()).build().unwrap();
        let result = chain.run(record(json!({}))).await.unwrap();

        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.errors()[0].path, "items.*.sku");
    }

    #[tokio::test]
    async fn test_optional_skips_absent_values() {
        let chain = query("page")
            .optional(Absence::NullOrUndefined)
            .is_int(IntOptions::default())
            .build()
            .unwrap();

        let skipped = chain.run(Record::new().with_query(json!({ "page": null }))).await.unwrap();
        assert!(!skipped.has_errors());
        assert!(skipped.values().is_empty());

        let checked = chain.run(Record::new().with_query(json!({ "page": "two" }))).await.unwrap();
        assert!(checked.has_errors());
    }

    #[tokio::test]
    async fn test_optional_uses_original_value() {
        let chain = body("nickname")
            .optional(Absence::Falsy)
            .default_value("")
            .not_empty(EmptyOptions::default())
            .build()
            .unwrap();
        let result = chain.run(record(json!({ "nickname": "" }))).await.unwrap();
        assert!(!result.has_errors());
    }

    #[tokio::test]
    async fn test_sanitizers_feed_later_validators() {
        let chain = body("code")
            .trim(None)
            .to_upper_case()
            .is_length(LengthOptions::range(3, 3))
            .is_uppercase()
            .build()
            .unwrap();
        let result = chain.run(record(json!({ "code": "  abc  " }))).await.unwrap();

        assert!(!result.has_errors());
        assert_eq!(result.values()[0].value, Some(json!("ABC")));
    }

    #[tokio::test]
    async fn test_reported_value_original() {
        let chain = body("code").trim(None).is_int(IntOptions::default()).build().unwrap();
        let data = record(json!({ "code": " x " }));

        let current = Executor::default().run(&[chain.clone()], data.clone()).await.unwrap();
        assert_eq!(current.errors()[0].value, Some(json!("x")));

        let executor = Executor::new(ValidatorConfig::new().with_reported_value(ReportedValue::Original));
        let original = executor.run(&[chain], data).await.unwrap();
        assert_eq!(original.errors()[0].value, Some(json!(" x ")));
    }

    #[tokio::test]
    async fn test_custom_error_is_absorbed() {
        let chain = body("username")
            .custom(|_, _| Err::<bool, _>("lookup failed"))
            .build()
            .unwrap();
        let result = chain.run(record(json!({ "username": "ann" }))).await.unwrap();

        let error = &result.errors()[0];
        assert_eq!(error.kind, FailureKind::Errored);
        assert_eq!(error.message, "lookup failed");
        assert_eq!(error.rule.as_deref(), Some("custom"));
    }

    #[tokio::test]
    async fn test_custom_error_message_override() {
        let chain = body("username")
            .custom(|_, _| Err::<bool, _>("lookup failed"))
            .with_message("Username unavailable")
            .build()
            .unwrap();
        let result = chain.run(record(json!({ "username": "ann" }))).await.unwrap();
        assert_eq!(result.errors()[0].message, "Username unavailable");
    }

    #[tokio::test]
    async fn test_negated_custom_error_passes() {
        let chain = body("username")
            .not()
            .custom(|_, _| Err::<bool, _>("boom"))
            .build()
            .unwrap();
        let result = chain.run(record(json!({ "username": "ann" }))).await.unwrap();
        assert!(!result.has_errors());
    }

    #[tokio::test]
    async fn test_propagate_fails_run_after_other_chains() {
        let finished = Arc::new(AtomicBool::new(false));

        let failing = body("a")
            .on_error(ErrorPolicy::Propagate)
            .custom(|_, _| Err::<bool, _>("database down"))
            .build()
            .unwrap();
        let slow = {
            let finished = Arc::clone(&finished);
            body("b")
                .custom_async(move |_, _| {
                    let finished = Arc::clone(&finished);
                    async move {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        finished.store(true, Ordering::SeqCst);
                        true
                    }
                })
                .build()
                .unwrap()
        };

        let result = Executor::default()
            .run(&[failing, slow], record(json!({ "a": 1, "b": "x" })))
            .await;

        match result {
            Err(RunError::Unexpected { location, path, source }) => {
                assert_eq!(location, Location::Body);
                assert_eq!(path, "a");
                assert_eq!(source.to_string(), "database down");
            }
            other => panic!("expected propagated error, got {:?}", other),
        }
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_propagate_applies_to_conditions() {
        let propagating = body("a")
            .on_error(ErrorPolicy::Propagate)
            .when(|_, _| Err::<bool, _>("db down"))
            .exists(Default::default())
            .build()
            .unwrap();
        let result = Executor::default().run(&[propagating], record(json!({}))).await;
        match result {
            Err(RunError::Unexpected { path, source, .. }) => {
                assert_eq!(path, "a");
                assert_eq!(source.to_string(), "db down");
            }
            other => panic!("expected propagated error, got {:?}", other),
        }

        let absorbing = body("a")
            .when(|_, _| Err::<bool, _>("db down"))
            .exists(Default::default())
            .build()
            .unwrap();
        let report = Executor::default().run(&[absorbing], record(json!({}))).await.unwrap();
        assert!(report.is_empty());
    }

    #[tokio::test]
    async fn test_config_error_policy_applies_to_chains_without_one() {
        let chain = body("a").custom(|_, _| Err::<bool, _>("boom")).build().unwrap();
        let executor = Executor::new(ValidatorConfig::new().with_error_policy(ErrorPolicy::Propagate));
        assert!(executor.run(&[chain], record(json!({ "a": 1 }))).await.is_err());
    }

    #[tokio::test]
    async fn test_conditional_custom_stops_silently() {
        let chain = body("reason")
            .when(|_, meta| meta.record().body().get("status") == Some(&json!("rejected")))
            .not_empty(EmptyOptions::default())
            .build()
            .unwrap();

        let approved = chain.run(record(json!({ "status": "approved" }))).await.unwrap();
        assert!(!approved.has_errors());

        let rejected = chain.run(record(json!({ "status": "rejected" }))).await.unwrap();
        assert!(rejected.has_errors());
    }

    #[tokio::test]
    async fn test_conditional_chain() {
        let has_password = body("password").exists(Default::default()).build().unwrap();
        let chain = body("password_confirmation")
            .when_chain(has_password)
            .custom(|value, meta| value == meta.record().body().get("password"))
            .with_message("Passwords do not match")
            .build()
            .unwrap();

        let without = chain.run(record(json!({}))).await.unwrap();
        assert!(!without.has_errors());

        let mismatch = chain
            .run(record(json!({ "password": "a", "password_confirmation": "b" })))
            .await
            .unwrap();
        assert_eq!(mismatch.errors()[0].message, "Passwords do not match");
    }

    #[tokio::test]
    async fn test_dynamic_message() {
        let chain = body("qty")
            .is_int(IntOptions::new().max(10))
            .with_message(crate::Message::dynamic(|value, meta| {
                format!("{} is too many for {}", stringify(value), meta.path())
            }))
            .build()
            .unwrap();
        let result = chain.run(record(json!({ "qty": 50 }))).await.unwrap();
        assert_eq!(result.errors()[0].message, "50 is too many for qty");
    }

    #[tokio::test]
    async fn test_check_prefers_defined_locations() {
        let chain = check("token").exists(Default::default()).build().unwrap();
        let data = Record::new().with_query(json!({ "token": "abc" }));
        let result = chain.run(data).await.unwrap();

        assert!(!result.has_errors());
        assert_eq!(result.values().len(), 1);
        assert_eq!(result.values()[0].location, Location::Query);

        let missing = chain.run(Record::new()).await.unwrap();
        assert_eq!(missing.errors().len(), 1);
        assert_eq!(missing.errors()[0].location, Location::Body);
    }

    #[tokio::test]
    async fn test_header_lookup_is_case_insensitive() {
        let chain = header("X-Api-Key").exists(Default::default()).build().unwrap();
        let mut data = Record::new();
        data.insert_header("x-api-key", "secret");

        let result = chain.run(data).await.unwrap();
        assert!(!result.has_errors());
        assert_eq!(result.values()[0].path, "x-api-key");
    }

    #[tokio::test]
    async fn test_dedup_policy_from_config() {
        let first = body("email").is_email(Default::default()).build().unwrap();
        let second = body("email").contains("@company.com").build().unwrap();
        let data = record(json!({ "email": "nope" }));

        let report = Executor::default().run(&[first.clone(), second.clone()], data.clone()).await.unwrap();
        assert_eq!(report.len(), 1);

        let executor = Executor::new(ValidatorConfig::new().with_dedup(DedupPolicy::All));
        let report = executor.run(&[first, second], data).await.unwrap();
        assert_eq!(report.len(), 2);
    }
}
