//! Cell values and token classification.
//!
//! Tokens are graded `empty < int < float < time < string`. A column takes the
//! highest grade among its cells, and every cell is then re-read as that type.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::cmp::Ordering;
use std::fmt;

/// Type of a dataset dimension, ordered by grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DimensionType {
    Empty,
    Int,
    Float,
    Time,
    String,
}

impl DimensionType {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            DimensionType::Int | DimensionType::Float | DimensionType::Time
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DimensionType::Empty => "empty",
            DimensionType::Int => "int",
            DimensionType::Float => "float",
            DimensionType::Time => "time",
            DimensionType::String => "string",
        }
    }
}

impl fmt::Display for DimensionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single typed cell. Time values are epoch milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Empty,
    Int(i64),
    Float(f64),
    Time(i64),
    String(String),
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

fn is_int_token(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn parse_float_token(text: &str) -> Option<f64> {
    // `f64::from_str` also accepts "inf" and "NaN", which are strings here.
    let numeric_chars = text
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'));
    if !numeric_chars || !text.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse::<f64>().ok()
}

/// Parse a date or datetime token into epoch milliseconds.
pub fn parse_time(text: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp_millis());
        }
    }
    None
}

impl Value {
    /// Classify a raw token, returning its grade and parsed value.
    pub fn check_token(text: &str) -> (DimensionType, Value) {
        if text.is_empty() {
            return (DimensionType::Empty, Value::Empty);
        }
        if is_int_token(text) {
            if let Ok(v) = text.parse::<i64>() {
                return (DimensionType::Int, Value::Int(v));
            }
        }
        if let Some(v) = parse_float_token(text) {
            return (DimensionType::Float, Value::Float(v));
        }
        if let Some(ms) = parse_time(text) {
            return (DimensionType::Time, Value::Time(ms));
        }
        (DimensionType::String, Value::String(text.to_string()))
    }

    /// Read a raw token as the given column type.
    ///
    /// Falls back to a string value when the token does not fit the type.
    pub fn tokenize(text: &str, ty: DimensionType) -> Value {
        let parsed = match ty {
            DimensionType::Empty => Some(Value::Empty),
            DimensionType::Int => text.parse::<i64>().ok().map(Value::Int),
            DimensionType::Float => parse_float_token(text).map(Value::Float),
            DimensionType::Time => parse_time(text).map(Value::Time),
            DimensionType::String => None,
        };
        parsed.unwrap_or_else(|| Value::String(text.to_string()))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Time(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Total order used by filters and samplers.
    ///
    /// Numbers compare numerically, empties sort first, anything else compares
    /// by its textual form.
    pub fn compare(&self, other: &Value) -> Ordering {
        if let (Some(a), Some(b)) = (self.as_f64(), other.as_f64()) {
            return a.total_cmp(&b);
        }
        match (self, other) {
            (Value::Empty, Value::Empty) => Ordering::Equal,
            (Value::Empty, _) => Ordering::Less,
            (_, Value::Empty) => Ordering::Greater,
            _ => self.to_string().cmp(&other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Time(ms) => match DateTime::from_timestamp_millis(*ms) {
                Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
                None => write!(f, "{}", ms),
            },
            Value::String(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_token_grades() {
        assert_eq!(Value::check_token("").0, DimensionType::Empty);
        assert_eq!(Value::check_token("-42"), (DimensionType::Int, Value::Int(-42)));
        assert_eq!(Value::check_token("3.5"), (DimensionType::Float, Value::Float(3.5)));
        assert_eq!(Value::check_token("2016-01-02").0, DimensionType::Time);
        assert_eq!(Value::check_token("audi").0, DimensionType::String);
    }

    #[test]
    fn test_nan_and_inf_are_strings() {
        assert_eq!(Value::check_token("NaN").0, DimensionType::String);
        assert_eq!(Value::check_token("inf").0, DimensionType::String);
    }

    #[test]
    fn test_tokenize_promotes_ints_to_float() {
        assert_eq!(Value::tokenize("3", DimensionType::Float), Value::Float(3.0));
        assert_eq!(
            Value::tokenize("x", DimensionType::Int),
            Value::String("x".to_string())
        );
    }

    #[test]
    fn test_compare_mixed_numbers() {
        assert_eq!(Value::Int(2).compare(&Value::Float(2.5)), Ordering::Less);
        assert_eq!(Value::Empty.compare(&Value::Int(0)), Ordering::Less);
        assert_eq!(
            Value::String("b".into()).compare(&Value::String("a".into())),
            Ordering::Greater
        );
    }

    #[test]
    fn test_time_display() {
        let ms = parse_time("2016-01-02").unwrap();
        assert_eq!(Value::Time(ms).to_string(), "2016-01-02 00:00:00");
    }
}
