//! Date and time rules

use super::{options_rule, pattern, string_arg, Arity, FnRule, RuleRegistry};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Options for `isISO8601`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Iso8601Options {
    /// Reject calendar dates that don't exist, e.g. `2023-02-30`
    pub strict: bool,
    /// Only accept `T` between date and time
    pub strict_separator: bool,
}

static ISO_DATE: Lazy<Regex> = Lazy::new(|| {
    pattern(concat!(
        r"^[+-]?[0-9]{4}(?:",
        r"-(?:0[1-9]|1[0-2])(?:-(?:0[1-9]|[12][0-9]|3[01]))?",
        r"|(?:0[1-9]|1[0-2])(?:0[1-9]|[12][0-9]|3[01])",
        r"|-?W(?:0[1-9]|[1-4][0-9]|5[0-3])(?:-?[1-7])?",
        r"|-?(?:00[1-9]|0[1-9][0-9]|[12][0-9]{2}|3(?:[0-5][0-9]|6[0-6]))",
        r")?$"
    ))
});
static ISO_TIME: Lazy<Regex> = Lazy::new(|| {
    pattern(concat!(
        r"^(?:[01][0-9]|2[0-3])(?::?[0-5][0-9](?::?[0-5][0-9](?:[.,][0-9]+)?)?)?",
        r"(?:Z|[+-](?:[01][0-9]|2[0-3])(?::?[0-5][0-9])?)?$"
    ))
});
static CALENDAR_DATE: Lazy<Regex> =
    Lazy::new(|| pattern(r"^[+-]?([0-9]{4})-?([0-9]{2})-?([0-9]{2})$"));
static ORDINAL_DATE: Lazy<Regex> = Lazy::new(|| pattern(r"^[+-]?([0-9]{4})-?([0-9]{3})$"));

pub(crate) fn register(registry: &mut RuleRegistry) {
    registry
        .register(options_rule("isISO8601", is_iso8601))
        .register(FnRule::new("isRFC3339", Arity::NONE, is_rfc3339))
        .register(FnRule::prepared("isAfter", Arity::optional(1), |args: &[Value]| {
            let comparison = comparison_date(args)?;
            Ok(move |input: &str| is_after(input, comparison))
        }))
        .register(FnRule::prepared("isBefore", Arity::optional(1), |args: &[Value]| {
            let comparison = comparison_date(args)?;
            Ok(move |input: &str| is_before(input, comparison))
        }));
}

/// Calendar, week and ordinal dates with an optional time and offset
pub fn is_iso8601(input: &str, opts: &Iso8601Options) -> bool {
    let separators: &[char] = if opts.strict_separator { &['T'] } else { &['T', 't', ' '] };
    let (date, time) = match input.split_once(separators) {
        Some((date, time)) => (date, Some(time)),
        None => (input, None),
    };

    if !ISO_DATE.is_match(date) || !time.map_or(true, |time| ISO_TIME.is_match(time)) {
        return false;
    }
    !opts.strict || date_exists(date)
}

fn date_exists(date: &str) -> bool {
    // week dates, and year or year-month forms, can't name a missing day
    if let Some(captures) = CALENDAR_DATE.captures(date) {
        let number = |index: usize| captures[index].parse::<u32>().ok();
        return match (captures[1].parse::<i32>().ok(), number(2), number(3)) {
            (Some(year), Some(month), Some(day)) => NaiveDate::from_ymd_opt(year, month, day).is_some(),
            _ => false,
        };
    }
    if let Some(captures) = ORDINAL_DATE.captures(date) {
        return match (captures[1].parse::<i32>().ok(), captures[2].parse::<u32>().ok()) {
            (Some(year), Some(ordinal)) => NaiveDate::from_yo_opt(year, ordinal).is_some(),
            _ => false,
        };
    }
    true
}

pub fn is_rfc3339(input: &str, _args: &[Value]) -> bool {
    DateTime::parse_from_rfc3339(input).is_ok()
}

/// Parse the date forms accepted by `isAfter` and `isBefore`.
///
/// Values without an offset are taken as UTC.
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(input) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(input, format) {
            return Some(parsed.and_utc());
        }
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(parsed) = NaiveDate::parse_from_str(input, format) {
            return parsed.and_hms_opt(0, 0, 0).map(|midnight| midnight.and_utc());
        }
    }
    None
}

/// The argument date; `None` stands for the moment of each test
fn comparison_date(args: &[Value]) -> Result<Option<DateTime<Utc>>, String> {
    match string_arg(args, 0) {
        Some(date) => parse_date(&date)
            .map(Some)
            .ok_or_else(|| format!("cannot parse comparison date `{}`", date)),
        None => Ok(None),
    }
}

/// Strictly later than `comparison`, or now
pub fn is_after(input: &str, comparison: Option<DateTime<Utc>>) -> bool {
    match parse_date(input) {
        Some(date) => date > comparison.unwrap_or_else(Utc::now),
        None => false,
    }
}

/// Strictly earlier than `comparison`, or now
pub fn is_before(input: &str, comparison: Option<DateTime<Utc>>) -> bool {
    match parse_date(input) {
        Some(date) => date < comparison.unwrap_or_else(Utc::now),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{check, rejects};
    use serde_json::json;

    #[test]
    fn test_iso8601_forms() {
        for ok in [
            "2023-06-15",
            "20230615",
            "2023-06",
            "2023",
            "2023-W24",
            "2023-W24-4",
            "2023-166",
            "2023-06-15T10:30:00Z",
            "2023-06-15T10:30:00.123+02:00",
            "2023-06-15 10:30",
        ] {
            assert!(check("isISO8601", ok, &[]), "{} should be ISO 8601", ok);
        }
        for bad in ["2023-13-01", "2023-06-15T25:00", "15/06/2023", "2023-06-15T", "yesterday"] {
            assert!(!check("isISO8601", bad, &[]), "{} should not be ISO 8601", bad);
        }
    }

    #[test]
    fn test_iso8601_strict() {
        let strict = [json!({ "strict": true })];
        assert!(check("isISO8601", "2023-02-30", &[]));
        assert!(!check("isISO8601", "2023-02-30", &strict));
        assert!(check("isISO8601", "2024-02-29", &strict));
        assert!(!check("isISO8601", "2023-366", &strict));
        assert!(check("isISO8601", "2024-366", &strict));

        let strict_separator = [json!({ "strict_separator": true })];
        assert!(!check("isISO8601", "2023-06-15 10:30", &strict_separator));
        assert!(check("isISO8601", "2023-06-15T10:30", &strict_separator));
    }

    #[test]
    fn test_rfc3339() {
        assert!(is_rfc3339("2023-06-15T10:30:00Z", &[]));
        assert!(is_rfc3339("2023-06-15T10:30:00.5-05:00", &[]));
        assert!(!is_rfc3339("2023-06-15", &[]));
        assert!(!is_rfc3339("2023-06-15T10:30:00", &[]));
    }

    #[test]
    fn test_after_and_before() {
        let pivot = [json!("2023-06-15")];
        assert!(check("isAfter", "2023-06-16", &pivot));
        assert!(!check("isAfter", "2023-06-15", &pivot));
        assert!(check("isBefore", "2023-06-14T23:59:59Z", &pivot));
        assert!(!check("isBefore", "not a date", &pivot));

        assert!(is_after("2999-01-01", None));
        assert!(is_before("1999-01-01", None));
        assert!(rejects("isAfter", &[json!("someday")]));
    }
}
