//! Character-set, length and pattern rules

use super::{options_rule, string_arg, stringify, Arity, FnRule, RuleRegistry};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Options for `isLength` and `isByteLength`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LengthOptions {
    /// Minimum length (inclusive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<usize>,
    /// Maximum length (inclusive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<usize>,
}

impl LengthOptions {
    pub fn min(min: usize) -> Self {
        Self { min: Some(min), max: None }
    }

    pub fn max(max: usize) -> Self {
        Self { min: None, max: Some(max) }
    }

    pub fn range(min: usize, max: usize) -> Self {
        Self { min: Some(min), max: Some(max) }
    }

    fn contains(&self, length: usize) -> bool {
        self.min.map_or(true, |min| length >= min) && self.max.map_or(true, |max| length <= max)
    }
}

/// Options for `isEmpty`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmptyOptions {
    /// Treat whitespace-only strings as empty
    pub ignore_whitespace: bool,
}

static SLUG: Lazy<Regex> = Lazy::new(|| super::pattern(r"^[a-z0-9]+(?:[-_][a-z0-9]+)*$"));

pub(crate) fn register(registry: &mut RuleRegistry) {
    registry
        .register(FnRule::prepared("contains", Arity::exactly(1), |args: &[Value]| {
            let needle = stringify(args.first());
            Ok(move |input: &str| input.contains(&needle))
        }))
        .register(FnRule::prepared("equals", Arity::exactly(1), |args: &[Value]| {
            let expected = stringify(args.first());
            Ok(move |input: &str| input == expected)
        }))
        .register(FnRule::prepared("isAlpha", Arity::optional(1), |args: &[Value]| {
            let class = locale(args)?;
            Ok(move |input: &str| is_alpha(input, class))
        }))
        .register(FnRule::prepared("isAlphanumeric", Arity::optional(1), |args: &[Value]| {
            let class = locale(args)?;
            Ok(move |input: &str| is_alphanumeric(input, class))
        }))
        .register(FnRule::new("isAscii", Arity::NONE, is_ascii))
        .register(FnRule::new("isFullWidth", Arity::NONE, is_full_width))
        .register(FnRule::new("isHalfWidth", Arity::NONE, is_half_width))
        .register(FnRule::new("isVariableWidth", Arity::NONE, is_variable_width))
        .register(FnRule::new("isMultibyte", Arity::NONE, is_multibyte))
        .register(FnRule::new("isSurrogatePair", Arity::NONE, is_surrogate_pair))
        .register(FnRule::new("isLowercase", Arity::NONE, is_lowercase))
        .register(FnRule::new("isUppercase", Arity::NONE, is_uppercase))
        .register(FnRule::prepared("isWhitelisted", Arity::exactly(1), |args: &[Value]| {
            let allowed = stringify(args.first());
            Ok(move |input: &str| is_whitelisted(input, &allowed))
        }))
        .register(options_rule("isEmpty", is_empty))
        .register(options_rule("isLength", is_length))
        .register(options_rule("isByteLength", is_byte_length))
        .register(FnRule::prepared("isIn", Arity::exactly(1), |args: &[Value]| {
            let allowed = allowed_values(args)?;
            Ok(move |input: &str| is_in(input, &allowed))
        }))
        .register(FnRule::prepared("matches", Arity::range(1, 2), |args: &[Value]| {
            let pattern = string_arg(args, 0).ok_or("missing pattern")?;
            let regex = compile_pattern(&pattern, string_arg(args, 1).as_deref())?;
            Ok(move |input: &str| regex.is_match(input))
        }))
        .register(FnRule::new("isSlug", Arity::NONE, is_slug));
}

/// Character class of an alphabet locale
pub type CharClass = fn(char) -> bool;

fn alphabet(locale: Option<&str>) -> Option<CharClass> {
    let class: CharClass = match locale.unwrap_or("en-US") {
        "en-US" => |c| c.is_ascii_alphabetic(),
        "de-DE" => |c| c.is_ascii_alphabetic() || "ÄÖÜäöüß".contains(c),
        "fr-FR" => |c| {
            c.is_ascii_alphabetic() || "ÀÂÆÇÉÈÊËÏÎÔŒÙÛÜŸàâæçéèêëïîôœùûüÿ".contains(c)
        },
        "es-ES" => |c| c.is_ascii_alphabetic() || "ÁÉÍÑÓÚÜáéíñóúü".contains(c),
        "ru-RU" => |c| ('А'..='я').contains(&c) || c == 'Ё' || c == 'ё',
        "any" => char::is_alphabetic,
        _ => return None,
    };
    Some(class)
}

fn locale(args: &[Value]) -> Result<CharClass, String> {
    let locale = string_arg(args, 0);
    alphabet(locale.as_deref())
        .ok_or_else(|| format!("unsupported locale `{}`", locale.unwrap_or_default()))
}

pub fn is_alpha(input: &str, class: CharClass) -> bool {
    !input.is_empty() && input.chars().all(class)
}

pub fn is_alphanumeric(input: &str, class: CharClass) -> bool {
    !input.is_empty() && input.chars().all(|c| c.is_ascii_digit() || class(c))
}

pub fn is_ascii(input: &str, _args: &[Value]) -> bool {
    !input.is_empty() && input.is_ascii()
}

fn is_half_width_char(c: char) -> bool {
    matches!(
        c,
        '\u{20}'..='\u{7E}' | '\u{FF61}'..='\u{FF9F}' | '\u{FFA0}'..='\u{FFDC}' | '\u{FFE8}'..='\u{FFEE}'
    )
}

pub fn is_full_width(input: &str, _args: &[Value]) -> bool {
    input.chars().any(|c| !is_half_width_char(c))
}

pub fn is_half_width(input: &str, _args: &[Value]) -> bool {
    input.chars().any(is_half_width_char)
}

pub fn is_variable_width(input: &str, args: &[Value]) -> bool {
    is_full_width(input, args) && is_half_width(input, args)
}

pub fn is_multibyte(input: &str, _args: &[Value]) -> bool {
    !input.is_ascii()
}

/// True when the string holds a character outside the Basic Multilingual Plane
pub fn is_surrogate_pair(input: &str, _args: &[Value]) -> bool {
    input.chars().any(|c| c as u32 > 0xFFFF)
}

pub fn is_lowercase(input: &str, _args: &[Value]) -> bool {
    input == input.to_lowercase()
}

pub fn is_uppercase(input: &str, _args: &[Value]) -> bool {
    input == input.to_uppercase()
}

pub fn is_whitelisted(input: &str, allowed: &str) -> bool {
    input.chars().all(|c| allowed.contains(c))
}

pub fn is_empty(input: &str, opts: &EmptyOptions) -> bool {
    if opts.ignore_whitespace {
        input.trim().is_empty()
    } else {
        input.is_empty()
    }
}

/// Length in characters (Unicode scalar values)
pub fn is_length(input: &str, opts: &LengthOptions) -> bool {
    opts.contains(input.chars().count())
}

/// Length in UTF-8 bytes
pub fn is_byte_length(input: &str, opts: &LengthOptions) -> bool {
    opts.contains(input.len())
}

/// Values accepted by `isIn`
#[derive(Debug, Clone, PartialEq)]
pub enum Allowed {
    /// Any element, compared by string form
    List(Vec<String>),
    /// Any key of an object
    Keys(Vec<String>),
    /// Any substring
    Within(String),
}

fn allowed_values(args: &[Value]) -> Result<Allowed, String> {
    match args.first() {
        Some(Value::Array(values)) => Ok(Allowed::List(
            values.iter().map(|value| stringify(Some(value))).collect(),
        )),
        Some(Value::Object(map)) => Ok(Allowed::Keys(map.keys().cloned().collect())),
        Some(Value::String(haystack)) => Ok(Allowed::Within(haystack.clone())),
        _ => Err("expected an array, object or string of allowed values".to_string()),
    }
}

/// Membership in a list of values, the keys of an object, or a substring of a string
pub fn is_in(input: &str, allowed: &Allowed) -> bool {
    match allowed {
        Allowed::List(values) | Allowed::Keys(values) => values.iter().any(|value| value == input),
        Allowed::Within(haystack) => haystack.contains(input),
    }
}

/// Compile a pattern with JavaScript-style modifiers (`i`, `m`, `s`; `g` and `u` are accepted and ignored)
pub fn compile_pattern(pattern: &str, modifiers: Option<&str>) -> Result<Regex, String> {
    let mut flags = String::new();
    for modifier in modifiers.unwrap_or_default().chars() {
        match modifier {
            'i' | 'm' | 's' => flags.push(modifier),
            'g' | 'u' => {}
            other => return Err(format!("unsupported regex modifier `{}`", other)),
        }
    }

    let source = if flags.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{}){}", flags, pattern)
    };
    Regex::new(&source).map_err(|e| e.to_string())
}

pub fn is_slug(input: &str, _args: &[Value]) -> bool {
    SLUG.is_match(input)
}
