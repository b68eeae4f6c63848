//! Checksummed identifier rules: cards, securities, books and serials

use super::{options_rule, pattern, string_arg, Arity, FnRule, RuleRegistry};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Options for `isISSN`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IssnOptions {
    /// Reject a lower-case `x` check digit
    pub case_sensitive: bool,
    /// Require the hyphen between the two halves
    pub require_hyphen: bool,
}

static ISIN: Lazy<Regex> = Lazy::new(|| pattern(r"^[A-Z]{2}[0-9A-Z]{9}[0-9]$"));
static ISRC: Lazy<Regex> = Lazy::new(|| pattern(r"^[A-Z]{2}[0-9A-Z]{3}[0-9]{2}[0-9]{5}$"));
static BIC: Lazy<Regex> =
    Lazy::new(|| pattern(r"^[A-Za-z]{6}[A-Za-z0-9]{2}(?:[A-Za-z0-9]{3})?$"));

pub(crate) fn register(registry: &mut RuleRegistry) {
    registry
        .register(FnRule::new("isCreditCard", Arity::NONE, is_credit_card))
        .register(FnRule::new("isISIN", Arity::NONE, is_isin))
        .register(FnRule::prepared("isISBN", Arity::optional(1), |args: &[Value]| {
            let version = isbn_version(args)?;
            Ok(move |input: &str| is_isbn(input, version))
        }))
        .register(options_rule("isISSN", is_issn))
        .register(FnRule::new("isISRC", Arity::NONE, is_isrc))
        .register(FnRule::new("isBIC", Arity::NONE, is_bic));
}

/// Luhn checksum over a string of ASCII digits
fn luhn(digits: &str) -> bool {
    let mut sum = 0;
    for (position, byte) in digits.bytes().rev().enumerate() {
        let mut digit = u32::from(byte - b'0');
        if position % 2 == 1 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }
    sum % 10 == 0
}

/// Card numbers may be grouped with spaces or dashes
pub fn is_credit_card(input: &str, _args: &[Value]) -> bool {
    let digits: String = input.chars().filter(|c| *c != ' ' && *c != '-').collect();
    (12..=19).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit()) && luhn(&digits)
}

pub fn is_isin(input: &str, _args: &[Value]) -> bool {
    if !ISIN.is_match(input) {
        return false;
    }
    let expanded: String = input
        .chars()
        .map(|c| match c.to_digit(36) {
            Some(value) => value.to_string(),
            None => String::new(),
        })
        .collect();
    luhn(&expanded)
}

fn isbn_version(args: &[Value]) -> Result<Option<u8>, String> {
    match string_arg(args, 0).as_deref() {
        None => Ok(None),
        Some("10") => Ok(Some(10)),
        Some("13") => Ok(Some(13)),
        Some(other) => Err(format!("unsupported ISBN version `{}`", other)),
    }
}

fn is_isbn10(isbn: &str) -> bool {
    let bytes = isbn.as_bytes();
    if bytes.len() != 10 || !bytes[..9].iter().all(u8::is_ascii_digit) {
        return false;
    }
    let check = match bytes[9] {
        b'X' => 10,
        digit @ b'0'..=b'9' => u32::from(digit - b'0'),
        _ => return false,
    };
    let sum: u32 = bytes[..9]
        .iter()
        .enumerate()
        .map(|(i, b)| (i as u32 + 1) * u32::from(b - b'0'))
        .sum::<u32>()
        + 10 * check;
    sum % 11 == 0
}

fn is_isbn13(isbn: &str) -> bool {
    if isbn.len() != 13 || !isbn.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let sum: u32 = isbn
        .bytes()
        .enumerate()
        .map(|(i, b)| u32::from(b - b'0') * if i % 2 == 0 { 1 } else { 3 })
        .sum();
    sum % 10 == 0
}

/// ISBN-10 or ISBN-13; spaces and hyphens are ignored
pub fn is_isbn(input: &str, version: Option<u8>) -> bool {
    let isbn: String = input.chars().filter(|c| *c != ' ' && *c != '-').collect();
    match version {
        None => is_isbn10(&isbn) || is_isbn13(&isbn),
        Some(10) => is_isbn10(&isbn),
        Some(_) => is_isbn13(&isbn),
    }
}

pub fn is_issn(input: &str, opts: &IssnOptions) -> bool {
    let compact = match input.split_once('-') {
        Some((head, tail)) if head.len() == 4 => format!("{}{}", head, tail),
        Some(_) => return false,
        None if opts.require_hyphen => return false,
        None => input.to_string(),
    };
    let bytes = compact.as_bytes();
    if bytes.len() != 8 || !bytes[..7].iter().all(u8::is_ascii_digit) {
        return false;
    }

    let check = match bytes[7] {
        b'X' => 10,
        b'x' if !opts.case_sensitive => 10,
        digit @ b'0'..=b'9' => u32::from(digit - b'0'),
        _ => return false,
    };
    let sum: u32 = bytes[..7]
        .iter()
        .enumerate()
        .map(|(i, b)| (8 - i as u32) * u32::from(b - b'0'))
        .sum::<u32>()
        + check;
    sum % 11 == 0
}

pub fn is_isrc(input: &str, _args: &[Value]) -> bool {
    ISRC.is_match(input)
}

pub fn is_bic(input: &str, _args: &[Value]) -> bool {
    BIC.is_match(input)
}
