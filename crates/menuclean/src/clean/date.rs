//! Free-text date coercion and year clamping.

use chrono::{Datelike, NaiveDate};

use crate::table::Value;

/// Earliest year kept by cleaning.
pub const MIN_YEAR: i64 = 1500;
/// Latest year kept by cleaning.
pub const MAX_YEAR: i64 = 2025;

/// Layouts tried in order; the first one that matches wins.
#[derive(Debug, Clone, Copy)]
enum DateLayout {
    YearMonthDay(char),
    YearMonth(char),
    Year,
}

// Year-only appears twice; the second attempt can never succeed where the
// first failed.
const LAYOUTS: [DateLayout; 6] = [
    DateLayout::YearMonthDay('-'),
    DateLayout::YearMonthDay('/'),
    DateLayout::YearMonth('-'),
    DateLayout::YearMonth('/'),
    DateLayout::Year,
    DateLayout::Year,
];

impl DateLayout {
    fn parse(self, s: &str) -> Option<NaiveDate> {
        match self {
            DateLayout::YearMonthDay(sep) => {
                let mut parts = s.split(sep);
                let (y, m, d) = (parts.next()?, parts.next()?, parts.next()?);
                if parts.next().is_some() {
                    return None;
                }
                NaiveDate::from_ymd_opt(year(y)?, month_or_day(m)?, month_or_day(d)?)
            }
            DateLayout::YearMonth(sep) => {
                let (y, m) = s.split_once(sep)?;
                if m.contains(sep) {
                    return None;
                }
                NaiveDate::from_ymd_opt(year(y)?, month_or_day(m)?, 1)
            }
            DateLayout::Year => NaiveDate::from_ymd_opt(year(s)?, 1, 1),
        }
    }
}

fn year(s: &str) -> Option<i32> {
    if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok().filter(|y| *y >= 1)
}

fn month_or_day(s: &str) -> Option<u32> {
    if s.is_empty() || s.len() > 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Parse the first layout that reads the whole string.
///
/// Surrounding whitespace is not skipped; `" 1900"` matches nothing.
fn parse_any(s: &str) -> Option<NaiveDate> {
    LAYOUTS.iter().find_map(|layout| layout.parse(s))
}

/// Parse `YYYY-MM-DD` (one- or two-digit month and day accepted).
pub fn parse_strict_ymd(s: &str) -> Option<NaiveDate> {
    DateLayout::YearMonthDay('-').parse(s)
}

/// Pull a year into `[MIN_YEAR, MAX_YEAR]`.
pub fn clamp_year(year: i64) -> i64 {
    year.clamp(MIN_YEAR, MAX_YEAR)
}

/// Move a date's year into range, keeping month and day.
fn clamp_date(date: NaiveDate) -> NaiveDate {
    let target = clamp_year(date.year() as i64) as i32;
    if target == date.year() {
        return date;
    }
    date.with_year(target)
        .or_else(|| NaiveDate::from_ymd_opt(target, date.month(), 28))
        .unwrap_or(date)
}

/// Coerce a free-text date into `YYYY-MM-DD` with its year clamped.
///
/// Returns an empty string when no layout matches.
pub fn normalize_date(raw: &str) -> String {
    parse_any(raw)
        .map(|d| clamp_date(d).format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Cell-level form of [`normalize_date`]; nulls and unreadable values
/// become [`Value::Null`].
pub(crate) fn normalize_date_value(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Date(d) => Value::Date(clamp_date(*d)),
        other => parse_any(&other.to_string())
            .map(|d| Value::Date(clamp_date(d)))
            .unwrap_or(Value::Null),
    }
}

/// Cell-level year clamp; only numeric values outside the range change.
pub(crate) fn clamp_year_value(value: &Value) -> Value {
    match value.as_f64() {
        Some(v) if v < MIN_YEAR as f64 => Value::Integer(MIN_YEAR),
        Some(v) if v > MAX_YEAR as f64 => Value::Integer(MAX_YEAR),
        _ => value.clone(),
    }
}
