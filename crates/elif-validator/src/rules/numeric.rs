//! Numeric string rules

use super::{options, options_rule, pattern, stringify, Arity, FnRule, RuleRegistry};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Options for `isFloat`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FloatOptions {
    /// Minimum value (inclusive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Maximum value (inclusive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Exclusive lower bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,
    /// Exclusive upper bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<f64>,
}

impl FloatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Set value range (min and max)
    pub fn range(self, min: f64, max: f64) -> Self {
        self.min(min).max(max)
    }

    pub fn gt(mut self, gt: f64) -> Self {
        self.gt = Some(gt);
        self
    }

    pub fn lt(mut self, lt: f64) -> Self {
        self.lt = Some(lt);
        self
    }

    fn contains(&self, num: f64) -> bool {
        self.min.map_or(true, |min| num >= min)
            && self.max.map_or(true, |max| num <= max)
            && self.gt.map_or(true, |gt| num > gt)
            && self.lt.map_or(true, |lt| num < lt)
    }
}

/// Options for `isInt`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<i64>,
    /// Accept `007`; a lone `0` is always accepted
    pub allow_leading_zeroes: bool,
}

impl IntOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }

    /// Set value range (min and max)
    pub fn range(self, min: i64, max: i64) -> Self {
        self.min(min).max(max)
    }

    pub fn gt(mut self, gt: i64) -> Self {
        self.gt = Some(gt);
        self
    }

    pub fn lt(mut self, lt: i64) -> Self {
        self.lt = Some(lt);
        self
    }

    pub fn allow_leading_zeroes(mut self, allow: bool) -> Self {
        self.allow_leading_zeroes = allow;
        self
    }

    fn contains(&self, num: i128) -> bool {
        self.min.map_or(true, |min| num >= min as i128)
            && self.max.map_or(true, |max| num <= max as i128)
            && self.gt.map_or(true, |gt| num > gt as i128)
            && self.lt.map_or(true, |lt| num < lt as i128)
    }
}

impl Default for IntOptions {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            gt: None,
            lt: None,
            allow_leading_zeroes: true,
        }
    }
}

/// Options for `isDecimal`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecimalOptions {
    /// Require a fractional part
    pub force_decimal: bool,
    /// Allowed count of fractional digits: `"2"`, `"1,3"` or open-ended `"1,"`
    pub decimal_digits: String,
}

impl Default for DecimalOptions {
    fn default() -> Self {
        Self {
            force_decimal: false,
            decimal_digits: "1,".to_string(),
        }
    }
}

/// Options for `isNumeric`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NumericOptions {
    /// Digits only: no sign and no decimal point
    pub no_symbols: bool,
}

static INT: Lazy<Regex> = Lazy::new(|| pattern(r"^[-+]?[0-9]+$"));
static INT_NO_LEADING_ZEROES: Lazy<Regex> = Lazy::new(|| pattern(r"^[-+]?(?:[1-9][0-9]*|0)$"));
static FLOAT: Lazy<Regex> =
    Lazy::new(|| pattern(r"^[-+]?(?:[0-9]+)?(?:\.[0-9]*)?(?:[eE][-+]?[0-9]+)?$"));
static NUMERIC: Lazy<Regex> = Lazy::new(|| pattern(r"^[-+]?(?:[0-9]*\.)?[0-9]+$"));
static DECIMAL_DIGITS: Lazy<Regex> = Lazy::new(|| pattern(r"^[0-9]+(?:,[0-9]*)?$"));
static LATITUDE: Lazy<Regex> =
    Lazy::new(|| pattern(r"^[-+]?(?:90(?:\.0+)?|[1-8]?[0-9](?:\.[0-9]+)?)$"));
static LONGITUDE: Lazy<Regex> = Lazy::new(|| {
    pattern(r"^[-+]?(?:180(?:\.0+)?|1[0-7][0-9](?:\.[0-9]+)?|[0-9]{1,2}(?:\.[0-9]+)?)$")
});

pub(crate) fn register(registry: &mut RuleRegistry) {
    registry
        .register(options_rule("isInt", is_int))
        .register(options_rule("isFloat", is_float))
        .register(FnRule::prepared("isDecimal", Arity::optional(1), |args: &[Value]| {
            let regex = decimal_pattern(&options(args, 0)?)?;
            Ok(move |input: &str| is_decimal(input, &regex))
        }))
        .register(options_rule("isNumeric", is_numeric))
        .register(FnRule::prepared("isDivisibleBy", Arity::exactly(1), |args: &[Value]| {
            let divisor = divisor(args).ok_or("divisor must be a non-zero number")?;
            Ok(move |input: &str| is_divisible_by(input, divisor))
        }))
        .register(FnRule::new("isPort", Arity::NONE, is_port))
        .register(FnRule::new("isLatLong", Arity::NONE, is_lat_long));
}

pub fn is_int(input: &str, opts: &IntOptions) -> bool {
    int_within(input, opts)
}

fn int_within(input: &str, opts: &IntOptions) -> bool {
    let shape = if opts.allow_leading_zeroes {
        &INT
    } else {
        &INT_NO_LEADING_ZEROES
    };
    if !shape.is_match(input) {
        return false;
    }

    // digits beyond i128 are still integers, just out of any configurable range
    match input.parse::<i128>() {
        Ok(num) => opts.contains(num),
        Err(_) => opts.min.is_none() && opts.max.is_none() && opts.gt.is_none() && opts.lt.is_none(),
    }
}

pub fn is_float(input: &str, opts: &FloatOptions) -> bool {
    if matches!(input, "" | "." | "-" | "+") || !FLOAT.is_match(input) {
        return false;
    }

    match input.parse::<f64>() {
        Ok(num) => num.is_finite() && opts.contains(num),
        Err(_) => false,
    }
}

/// Pattern accepting the decimals `opts` describes
pub fn decimal_pattern(opts: &DecimalOptions) -> Result<Regex, String> {
    if !DECIMAL_DIGITS.is_match(&opts.decimal_digits) {
        return Err(format!("invalid decimal_digits `{}`", opts.decimal_digits));
    }
    let quantifier = format!("{{{}}}", opts.decimal_digits);
    let fraction = if opts.force_decimal {
        format!(r"\.[0-9]{}", quantifier)
    } else {
        format!(r"(?:\.[0-9]{})?", quantifier)
    };
    Regex::new(&format!(r"^[-+]?(?:[0-9]+)?{}$", fraction)).map_err(|e| e.to_string())
}

/// Match against a pattern built by [`decimal_pattern`]
pub fn is_decimal(input: &str, pattern: &Regex) -> bool {
    !matches!(input, "" | "-" | "+") && pattern.is_match(input)
}

pub fn is_numeric(input: &str, opts: &NumericOptions) -> bool {
    if opts.no_symbols {
        !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit())
    } else {
        NUMERIC.is_match(input)
    }
}

fn divisor(args: &[Value]) -> Option<f64> {
    let divisor = match args.first() {
        Some(Value::Number(num)) => num.as_f64(),
        other => stringify(other).parse::<f64>().ok(),
    }?;
    (divisor.is_finite() && divisor != 0.0).then_some(divisor)
}

pub fn is_divisible_by(input: &str, divisor: f64) -> bool {
    if !is_float(input, &FloatOptions::default()) {
        return false;
    }
    match input.parse::<f64>() {
        Ok(num) => num % divisor == 0.0,
        Err(_) => false,
    }
}

pub fn is_port(input: &str, _args: &[Value]) -> bool {
    int_within(input, &IntOptions::new().range(0, 65535).allow_leading_zeroes(false))
}

/// `"lat,long"`, optionally wrapped in parentheses
pub fn is_lat_long(input: &str, _args: &[Value]) -> bool {
    let inner = if input.starts_with('(') || input.ends_with(')') {
        match input.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')) {
            Some(inner) => inner,
            None => return false,
        }
    } else {
        input
    };
    match inner.split_once(',') {
        Some((lat, long)) => LATITUDE.is_match(lat) && LONGITUDE.is_match(long.trim_start()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{check, rejects};
    use serde_json::json;

    #[test]
    fn test_int_shapes() {
        let any = IntOptions::default();
        assert!(is_int("42", &any));
        assert!(is_int("-7", &any));
        assert!(is_int("+0", &any));
        assert!(is_int("007", &any));
        assert!(!is_int("3.14", &any));
        assert!(!is_int("", &any));
        assert!(!is_int("abc", &any));
        assert!(is_int("123456789012345678901234567890123456789012", &any));

        let strict = IntOptions::new().allow_leading_zeroes(false);
        assert!(!is_int("007", &strict));
        assert!(is_int("0", &strict));
    }

    #[test]
    fn test_int_bounds() {
        let range = [json!(IntOptions::new().range(18, 120))];
        assert!(check("isInt", "18", &range));
        assert!(check("isInt", "120", &range));
        assert!(!check("isInt", "17", &range));
        assert!(!check("isInt", "121", &range));

        let exclusive = [json!({ "gt": 0, "lt": 10 })];
        assert!(!check("isInt", "0", &exclusive));
        assert!(check("isInt", "9", &exclusive));
        assert!(!check("isInt", "10", &exclusive));
    }

    #[test]
    fn test_int_options_serialize() {
        let opts = json!(IntOptions::new().min(1));
        assert_eq!(opts, json!({ "min": 1, "allow_leading_zeroes": true }));
        assert!(rejects("isInt", &[json!({ "minimum": 1 })]));
    }

    #[test]
    fn test_float() {
        let any = FloatOptions::default();
        for ok in ["3.14", "-0.5", ".5", "5.", "1e10", "+2E-3", "42"] {
            assert!(is_float(ok, &any), "{} should be a float", ok);
        }
        for bad in ["", ".", "-", "abc", "1.2.3", "1e"] {
            assert!(!is_float(bad, &any), "{} should not be a float", bad);
        }

        let range = [json!(FloatOptions::new().range(0.0, 1.0))];
        assert!(check("isFloat", "0.5", &range));
        assert!(!check("isFloat", "1.5", &range));
    }

    #[test]
    fn test_decimal() {
        assert!(check("isDecimal", "10", &[]));
        assert!(check("isDecimal", "0.25", &[]));
        assert!(check("isDecimal", "-.5", &[]));
        assert!(!check("isDecimal", "1.", &[]));
        assert!(!check("isDecimal", "-", &[]));

        let money = decimal_pattern(&DecimalOptions {
            force_decimal: true,
            decimal_digits: "2".to_string(),
        })
        .unwrap();
        assert!(is_decimal("9.99", &money));
        assert!(!is_decimal("9.9", &money));
        assert!(!is_decimal("9", &money));

        assert!(rejects("isDecimal", &[json!({ "decimal_digits": "x" })]));
    }

    #[test]
    fn test_numeric() {
        assert!(check("isNumeric", "123", &[]));
        assert!(check("isNumeric", "-1.5", &[]));
        assert!(!check("isNumeric", "1e5", &[]));
        assert!(!check("isNumeric", "-1", &[json!({ "no_symbols": true })]));
    }

    #[test]
    fn test_divisible_by() {
        assert!(check("isDivisibleBy", "10", &[json!(5)]));
        assert!(!check("isDivisibleBy", "11", &[json!(5)]));
        assert!(check("isDivisibleBy", "9", &[json!("3")]));
        assert!(!is_divisible_by("abc", 3.0));
        assert!(rejects("isDivisibleBy", &[json!(0)]));
    }

    #[test]
    fn test_port() {
        assert!(is_port("8080", &[]));
        assert!(is_port("0", &[]));
        assert!(!is_port("65536", &[]));
        assert!(!is_port("080", &[]));
        assert!(!is_port("-1", &[]));
    }

    #[test]
    fn test_lat_long() {
        assert!(is_lat_long("40.7128,-74.0060", &[]));
        assert!(is_lat_long("(40.7128, -74.0060)", &[]));
        assert!(!is_lat_long("91,0", &[]));
        assert!(!is_lat_long("0,181", &[]));
        assert!(!is_lat_long("(1,2", &[]));
        assert!(!is_lat_long("12.5", &[]));
    }
}
