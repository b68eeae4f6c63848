//! Sanitizer methods
//!
//! Built-in sanitizers work on the string form of the value and apply to
//! each element of an array. A missing value stays missing, except for
//! `default_value`.

use super::ChainBuilder;
use crate::item::{IntoSanitized, Meta, SanitizerFn};
use crate::rules::stringify;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};
use std::future::Future;

static FLOAT_PREFIX: Lazy<Regex> =
    Lazy::new(|| crate::rules::pattern(r"^[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?"));

/// Apply `f` to the string form of the value, or of each array element
fn map_strings<F>(value: Option<&Value>, f: F) -> Option<Value>
where
    F: Fn(&str) -> Value,
{
    match value? {
        Value::Array(items) => Some(Value::Array(
            items.iter().map(|item| f(&stringify(Some(item)))).collect(),
        )),
        other => Some(f(&stringify(Some(other)))),
    }
}

fn is_trimmed(c: char, chars: Option<&str>) -> bool {
    match chars {
        Some(chars) => chars.contains(c),
        None => c.is_whitespace(),
    }
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '/' => escaped.push_str("&#x2F;"),
            '\\' => escaped.push_str("&#x5C;"),
            '`' => escaped.push_str("&#96;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn unescape_html(input: &str) -> String {
    // `&amp;` last so `&amp;lt;` becomes `&lt;` rather than `<`
    input
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&#x2F;", "/")
        .replace("&#x5C;", "\\")
        .replace("&#96;", "`")
        .replace("&amp;", "&")
}

/// Leading integer in `radix`, `null` when there is none
fn parse_int(input: &str, radix: u32) -> Value {
    let trimmed = input.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits = if radix == 16 {
        digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
            .unwrap_or(digits)
    } else {
        digits
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_digit(radix))
        .map_or(digits.len(), |(index, _)| index);
    if end == 0 {
        return Value::Null;
    }
    match i64::from_str_radix(&format!("{}{}", sign, &digits[..end]), radix) {
        Ok(number) => Value::Number(number.into()),
        Err(_) => Value::Null,
    }
}

/// Leading decimal number, `null` when there is none
fn parse_float(input: &str) -> Value {
    let Some(prefix) = FLOAT_PREFIX.find(input.trim_start()) else {
        return Value::Null;
    };
    prefix
        .as_str()
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or(Value::Null, Value::Number)
}

fn to_boolean(input: &str, strict: bool) -> bool {
    if strict {
        input == "1" || input == "true"
    } else {
        !matches!(input, "0" | "false" | "")
    }
}

impl ChainBuilder {
    /// Rewrite the value; return a `Value`, or `None` to make it missing
    pub fn custom_sanitizer<F, R>(self, f: F) -> Self
    where
        F: Fn(Option<&Value>, &Meta) -> R + Send + Sync + 'static,
        R: IntoSanitized,
    {
        self.push_sanitizer("customSanitizer", SanitizerFn::new(f))
    }

    pub fn custom_sanitizer_async<F, Fut, R>(self, f: F) -> Self
    where
        F: Fn(Option<Value>, Meta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoSanitized,
    {
        self.push_sanitizer("customSanitizer", SanitizerFn::new_async(f))
    }

    fn map_sanitizer<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&str) -> Value + Send + Sync + 'static,
    {
        self.push_sanitizer(name, SanitizerFn::new(move |value, _| map_strings(value, &f)))
    }

    /// Strip `chars` (whitespace when `None`) from both ends
    pub fn trim(self, chars: Option<&str>) -> Self {
        let chars = chars.map(str::to_string);
        self.map_sanitizer("trim", move |s| {
            Value::String(s.trim_matches(|c| is_trimmed(c, chars.as_deref())).to_string())
        })
    }

    pub fn ltrim(self, chars: Option<&str>) -> Self {
        let chars = chars.map(str::to_string);
        self.map_sanitizer("ltrim", move |s| {
            Value::String(s.trim_start_matches(|c| is_trimmed(c, chars.as_deref())).to_string())
        })
    }

    pub fn rtrim(self, chars: Option<&str>) -> Self {
        let chars = chars.map(str::to_string);
        self.map_sanitizer("rtrim", move |s| {
            Value::String(s.trim_end_matches(|c| is_trimmed(c, chars.as_deref())).to_string())
        })
    }

    /// Replace HTML-significant characters with entities
    pub fn escape(self) -> Self {
        self.map_sanitizer("escape", |s| Value::String(escape_html(s)))
    }

    pub fn unescape(self) -> Self {
        self.map_sanitizer("unescape", |s| Value::String(unescape_html(s)))
    }

    /// Parse a leading integer (base 10 when `radix` is `None`); `null` when there is none
    pub fn to_int(self, radix: Option<u32>) -> Self {
        let radix = radix.filter(|radix| (2..=36).contains(radix)).unwrap_or(10);
        self.map_sanitizer("toInt", move |s| parse_int(s, radix))
    }

    pub fn to_float(self) -> Self {
        self.map_sanitizer("toFloat", parse_float)
    }

    /// Non-strict: everything but `"0"`, `"false"` and `""` is true.
    /// Strict: only `"1"` and `"true"` are true.
    pub fn to_boolean(self, strict: bool) -> Self {
        self.map_sanitizer("toBoolean", move |s| Value::Bool(to_boolean(s, strict)))
    }

    pub fn to_lower_case(self) -> Self {
        self.map_sanitizer("toLowerCase", |s| Value::String(s.to_lowercase()))
    }

    pub fn to_upper_case(self) -> Self {
        self.map_sanitizer("toUpperCase", |s| Value::String(s.to_uppercase()))
    }

    /// Remove every character found in `chars`
    pub fn blacklist(self, chars: impl Into<String>) -> Self {
        let chars = chars.into();
        self.map_sanitizer("blacklist", move |s| {
            Value::String(s.chars().filter(|c| !chars.contains(*c)).collect())
        })
    }

    /// Keep only characters found in `chars`
    pub fn whitelist(self, chars: impl Into<String>) -> Self {
        let chars = chars.into();
        self.map_sanitizer("whitelist", move |s| {
            Value::String(s.chars().filter(|c| chars.contains(*c)).collect())
        })
    }

    /// Replace a missing, `null` or empty-string value
    pub fn default_value(self, default: impl Into<Value>) -> Self {
        let default = default.into();
        self.push_sanitizer(
            "default",
            SanitizerFn::new(move |value, _| match value {
                None | Some(Value::Null) => default.clone(),
                Some(Value::String(s)) if s.is_empty() => default.clone(),
                Some(other) => other.clone(),
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_strings_handles_arrays_and_missing() {
        let upper = |s: &str| Value::String(s.to_uppercase());
        assert_eq!(map_strings(Some(&json!("ab")), upper), Some(json!("AB")));
        assert_eq!(map_strings(Some(&json!(["a", 1])), upper), Some(json!(["A", "1"])));
        assert_eq!(map_strings(None, upper), None);
    }

    #[test]
    fn test_escape_round_trip() {
        let raw = r#"<a href="/x">Tom & 'Jerry'</a>"#;
        let escaped = escape_html(raw);
        assert_eq!(
            escaped,
            "&lt;a href=&quot;&#x2F;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;&#x2F;a&gt;"
        );
        assert_eq!(unescape_html(&escaped), raw);
        assert_eq!(unescape_html("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("42", 10), json!(42));
        assert_eq!(parse_int("  -17abc", 10), json!(-17));
        assert_eq!(parse_int("ff", 16), json!(255));
        assert_eq!(parse_int("0x1A", 16), json!(26));
        assert_eq!(parse_int("abc", 10), Value::Null);
        assert_eq!(parse_int("", 10), Value::Null);
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("2.75"), json!(2.75));
        assert_eq!(parse_float("2.5kg"), json!(2.5));
        assert_eq!(parse_float(".5"), json!(0.5));
        assert_eq!(parse_float("1e3"), json!(1000.0));
        assert_eq!(parse_float("kg"), Value::Null);
    }

    #[test]
    fn test_to_boolean_modes() {
        assert!(to_boolean("yes", false));
        assert!(!to_boolean("0", false));
        assert!(!to_boolean("", false));
        assert!(!to_boolean("yes", true));
        assert!(to_boolean("true", true));
        assert!(to_boolean("1", true));
    }

    #[test]
    fn test_trim_chars() {
        assert!(is_trimmed(' ', None));
        assert!(is_trimmed('-', Some("-_")));
        assert!(!is_trimmed(' ', Some("-_")));
    }
}
