//! # elif-validator
//!
//! Declarative request validation for the elif framework - similar to
//! express-validator. Chains of validators and sanitizers are built once
//! per field and run against the body, cookies, headers, params and query
//! of each request.
//!
//! ```rust,no_run
//! use elif_validator::{body, query, Executor, IntOptions, Record};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let chains = vec![
//!     body("email").trim(None).is_email(Default::default()).build()?,
//!     query("page").optional(Default::default()).is_int(IntOptions::new().min(1)).build()?,
//! ];
//!
//! let record = Record::new()
//!     .with_body(json!({ "email": " user@example.com " }))
//!     .with_query(json!({ "page": "2" }));
//!
//! let report = Executor::default().run(&chains, record).await?;
//! assert!(report.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod config;
pub mod error;
pub mod executor;
pub mod item;
pub mod locator;
pub mod record;
pub mod report;
pub mod rules;

// Re-exports for easy access
pub use chain::{
    body, check, check_locations, cookie, header, param, query, ArrayOptions, ChainBuilder,
    ChainOptions, ExistsOptions, IntoFields, ValidationChain,
};
pub use config::{DedupPolicy, ErrorPolicy, ReportedValue, ValidatorConfig, DEFAULT_MESSAGE};
pub use error::{BoxError, ConfigurationError, FailureKind, FieldError, RunError};
pub use executor::Executor;
pub use item::{
    Absence, Condition, CustomFn, CustomOutcome, IntoCustomOutcome, IntoSanitized, Message, Meta,
    SanitizerFn, ValidationItem,
};
pub use locator::{resolve, ConcretePath, FieldPath, PathElement, Resolved, Segment};
pub use record::{Location, Record};
pub use report::{merge, ChainResult, MatchedField, ValidationReport};
pub use rules::{Arity, FnRule, PreparedRule, RuleRegistry, StandardRule};

// Rule options
pub use rules::{
    DecimalOptions, EmailOptions, EmptyOptions, FloatOptions, FqdnOptions, HashAlgorithm,
    IntOptions, IssnOptions, Iso8601Options, LengthOptions, MacAddressOptions, NumericOptions,
    UrlOptions,
};
