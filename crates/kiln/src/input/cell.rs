//! Typed cell values.

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Formats tried, in order, when coercing text to a date/time.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y", "%Y%m%d"];

/// A single value in a [`DataTable`](super::DataTable).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Cell {
    /// Missing value.
    #[default]
    Null,
    /// Any numeric value. Integers are stored as whole floats.
    Number(f64),
    /// Free text.
    Text(String),
    /// A date and time.
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Build a cell from raw delimited text.
    pub fn from_raw(raw: &str) -> Self {
        if is_null_value(raw) {
            return Cell::Null;
        }
        match parse_number(raw) {
            Some(n) => Cell::Number(n),
            None => Cell::Text(raw.to_string()),
        }
    }

    /// Check whether the cell is missing.
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// The numeric value, when the cell holds a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The text value, when the cell holds text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Coerce to a number the way a lenient numeric conversion does:
    /// numbers pass through, numeric text is parsed, datetimes become
    /// nanoseconds since the epoch, everything else is missing.
    pub fn to_numeric(&self) -> Cell {
        match self {
            Cell::Number(n) => Cell::Number(*n),
            Cell::Text(s) => parse_number(s).map(Cell::Number).unwrap_or(Cell::Null),
            Cell::DateTime(dt) => dt
                .and_utc()
                .timestamp_nanos_opt()
                .map(|ns| Cell::Number(ns as f64))
                .unwrap_or(Cell::Null),
            Cell::Null => Cell::Null,
        }
    }

    /// Coerce to a date/time; unparseable values become missing.
    pub fn to_datetime(&self) -> Cell {
        match self {
            Cell::DateTime(dt) => Cell::DateTime(*dt),
            Cell::Text(s) => parse_datetime(s).map(Cell::DateTime).unwrap_or(Cell::Null),
            Cell::Number(_) | Cell::Null => Cell::Null,
        }
    }

    /// Total ordering used when sorting mixed cells: nulls first, then
    /// numbers, datetimes and text.
    pub fn total_cmp(&self, other: &Cell) -> Ordering {
        fn rank(cell: &Cell) -> u8 {
            match cell {
                Cell::Null => 0,
                Cell::Number(_) => 1,
                Cell::DateTime(_) => 2,
                Cell::Text(_) => 3,
            }
        }
        match (self, other) {
            (Cell::Number(a), Cell::Number(b)) => a.total_cmp(b),
            (Cell::DateTime(a), Cell::DateTime(b)) => a.cmp(b),
            (Cell::Text(a), Cell::Text(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Number(n) => f.write_str(&format_number(*n)),
            Cell::Text(s) => f.write_str(s),
            Cell::DateTime(dt) => {
                if dt.time() == NaiveTime::MIN {
                    write!(f, "{}", dt.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                }
            }
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value as f64)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Null)
    }
}

/// Check if a raw value represents a missing/null value.
pub fn is_null_value(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("na")
        || trimmed.eq_ignore_ascii_case("n/a")
        || trimmed.eq_ignore_ascii_case("nan")
        || trimmed.eq_ignore_ascii_case("null")
        || trimmed.eq_ignore_ascii_case("none")
        || trimmed.eq_ignore_ascii_case("nil")
        || trimmed == "."
        || trimmed == "-"
}

/// Parse a finite number from text.
pub fn parse_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// Parse a date/time from text using the supported formats.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }
    None
}

/// Render a number without a trailing fraction when it is whole.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
