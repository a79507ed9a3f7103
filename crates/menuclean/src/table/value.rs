//! Cell values and the comparison rules both engines share.

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

/// Timestamp layouts recognised when comparing text cells.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S UTC",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%SZ",
];

/// A single cell in a [`RecordTable`](super::RecordTable).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Missing value (empty cell).
    #[default]
    Null,
    /// Whole number.
    Integer(i64),
    /// Floating-point number.
    Float(f64),
    /// Free text, kept verbatim.
    Text(String),
    /// Calendar date in canonical `YYYY-MM-DD` form.
    Date(NaiveDate),
}

impl Value {
    /// Infer a value from a raw cell.
    ///
    /// Numbers and dates are only recognised in their canonical rendering so
    /// that writing the value back reproduces the input byte for byte.
    /// Anything else stays text; numeric-looking text such as `007` or
    /// `+5` still answers [`Value::as_f64`].
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Value::Null;
        }

        if let Ok(i) = raw.parse::<i64>() {
            if i.to_string() == raw {
                return Value::Integer(i);
            }
        }

        if let Some(f) = numeric_text(raw) {
            if Value::Float(f).to_string() == raw {
                return Value::Float(f);
            }
        }

        if raw.len() == 10 {
            if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                if date.format("%Y-%m-%d").to_string() == raw {
                    return Value::Date(date);
                }
            }
        }

        Value::Text(raw.to_string())
    }

    /// Returns true for a missing value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => numeric_text(s),
            _ => None,
        }
    }

    /// Integer view of the value; whole numbers qualify.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            other => other
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                .map(|f| f as i64),
        }
    }

    /// Text view of the value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Order two values.
    ///
    /// Returns `None` when either side is null or the kinds cannot be ordered,
    /// so comparison predicates never match missing data.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Text(b)) => {
                parse_timestamp(b).map(|ts| midnight(*a).cmp(&ts))
            }
            (Value::Text(a), Value::Date(b)) => {
                parse_timestamp(a).map(|ts| ts.cmp(&midnight(*b)))
            }
            (Value::Text(a), Value::Text(b)) => {
                if let (Some(x), Some(y)) = (numeric_text(a), numeric_text(b)) {
                    return x.partial_cmp(&y);
                }
                match (parse_timestamp(a), parse_timestamp(b)) {
                    (Some(x), Some(y)) => Some(x.cmp(&y)),
                    _ => Some(a.as_str().cmp(b.as_str())),
                }
            }
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }

    /// Cell equality as seen by the change reporter.
    ///
    /// Nulls are equal to each other and numbers compare by value regardless
    /// of whether they were read as integers or floats.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => self.to_string() == other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(i) => write!(f, "{}", i),
            // Whole floats keep their decimal point so they read back as floats.
            Value::Float(x) if x.fract() == 0.0 && x.abs() < 1.0e16 => write!(f, "{:.1}", x),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Parse a timestamp in one of the layouts found in the menu exports.
///
/// A bare `YYYY-MM-DD` date is read as midnight.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim();
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .map(midnight)
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

/// Numeric reading of a text cell, surrounding whitespace allowed.
fn numeric_text(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if !looks_numeric(trimmed) {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
}

fn looks_numeric(s: &str) -> bool {
    s.bytes().any(|b| b.is_ascii_digit())
        && s
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_infers_kinds() {
        assert_eq!(Value::parse(""), Value::Null);
        assert_eq!(Value::parse("  "), Value::from("  "));
        assert_eq!(Value::parse("42"), Value::Integer(42));
        assert_eq!(Value::parse("-3"), Value::Integer(-3));
        assert_eq!(Value::parse("0.45"), Value::Float(0.45));
        assert_eq!(
            Value::parse("1900-04-15"),
            Value::Date(NaiveDate::from_ymd_opt(1900, 4, 15).unwrap())
        );
        assert_eq!(Value::parse("1900-4-15"), Value::Text("1900-4-15".to_string()));
        assert_eq!(Value::parse("nan"), Value::Text("nan".to_string()));
        assert_eq!(Value::parse("Oyster Bay"), Value::Text("Oyster Bay".to_string()));
    }

    #[test]
    fn test_display_round_trips() {
        for raw in ["42", "0.45", "2.0", "1900-04-15", "2011-03-28 15:00:44 UTC", "Consomme"] {
            assert_eq!(Value::parse(raw).to_string(), raw);
        }
        assert_eq!(Value::Null.to_string(), "");
    }

    #[test]
    fn test_non_canonical_numbers_keep_their_text() {
        for raw in ["007", "+5", " 12 ", "0.50", "1e3", ".5"] {
            let value = Value::parse(raw);
            assert_eq!(value, Value::Text(raw.to_string()));
            assert_eq!(value.to_string(), raw);
        }
        assert_eq!(Value::parse("007").as_i64(), Some(7));
        assert_eq!(Value::parse(" 12 ").as_f64(), Some(12.0));
        assert_eq!(Value::parse("0.50").compare(&Value::Float(0.6)), Some(Ordering::Less));
        assert_eq!(Value::parse("+5").compare(&Value::parse("10")), Some(Ordering::Less));
        assert_eq!(Value::parse("9").compare(&Value::parse("10")), Some(Ordering::Less));
        assert!(Value::parse("007").same_as(&Value::Integer(7)));
        assert_eq!(Value::parse("abc").as_f64(), None);
    }

    #[test]
    fn test_compare_numeric_across_kinds() {
        assert_eq!(Value::Integer(2).compare(&Value::Float(2.5)), Some(Ordering::Less));
        assert_eq!(Value::Float(3.0).compare(&Value::Integer(3)), Some(Ordering::Equal));
        assert_eq!(Value::Null.compare(&Value::Integer(1)), None);
        assert_eq!(Value::Integer(1).compare(&Value::from("abc")), None);
    }

    #[test]
    fn test_compare_timestamps_chronologically() {
        let earlier = Value::from("2011-03-28 15:00:44 UTC");
        let later = Value::from("2011-04-19 19:10:05 UTC");
        assert_eq!(earlier.compare(&later), Some(Ordering::Less));

        let date = Value::parse("2011-03-29");
        assert_eq!(date.compare(&earlier), Some(Ordering::Greater));
    }

    #[test]
    fn test_same_as() {
        assert!(Value::Null.same_as(&Value::Null));
        assert!(Value::Integer(5).same_as(&Value::Float(5.0)));
        assert!(!Value::Float(0.4).same_as(&Value::Float(0.5)));
        assert!(Value::Null.same_as(&Value::from("")));
        assert!(!Value::Null.same_as(&Value::Integer(0)));
    }
}
