//! Core type definitions for column classification.

use serde::{Deserialize, Serialize};

use crate::input::Cell;

/// Inferred data type for a column.
///
/// Columns are never declared; the type is read off the cells currently in
/// the column, so it changes as transforms rewrite values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Whole numbers with no missing values.
    Integer,
    /// Numbers with a fractional part or with missing values.
    Float,
    /// Text values, or a mix of kinds.
    String,
    /// Date and/or time values.
    DateTime,
    /// No non-null values to decide from.
    #[default]
    Unknown,
}

impl ColumnType {
    /// Returns true if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }

    /// Returns true if this type is temporal.
    pub fn is_temporal(&self) -> bool {
        matches!(self, ColumnType::DateTime)
    }

    /// Label shown to users next to a column.
    pub fn dtype_name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "int64",
            ColumnType::Float => "float64",
            ColumnType::String | ColumnType::Unknown => "object",
            ColumnType::DateTime => "datetime64[ns]",
        }
    }

    /// Infer the type of a column from its cells.
    pub fn infer<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> Self {
        let mut has_null = false;
        let mut numbers = 0usize;
        let mut fractional = false;
        let mut datetimes = 0usize;
        let mut other = 0usize;

        for cell in cells {
            match cell {
                Cell::Null => has_null = true,
                Cell::Number(n) => {
                    numbers += 1;
                    if n.fract() != 0.0 {
                        fractional = true;
                    }
                }
                Cell::DateTime(_) => datetimes += 1,
                Cell::Text(_) => other += 1,
            }
        }

        match (numbers, datetimes, other) {
            (0, 0, 0) => ColumnType::Unknown,
            (n, 0, 0) if n > 0 => {
                if fractional || has_null {
                    ColumnType::Float
                } else {
                    ColumnType::Integer
                }
            }
            (0, d, 0) if d > 0 => ColumnType::DateTime,
            _ => ColumnType::String,
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dtype_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_integer_and_float() {
        let ints = [Cell::Number(1.0), Cell::Number(2.0)];
        assert_eq!(ColumnType::infer(&ints), ColumnType::Integer);

        let with_null = [Cell::Number(1.0), Cell::Null];
        assert_eq!(ColumnType::infer(&with_null), ColumnType::Float);

        let fractional = [Cell::Number(1.5)];
        assert_eq!(ColumnType::infer(&fractional), ColumnType::Float);
    }

    #[test]
    fn test_infer_mixed_is_string() {
        let mixed = [Cell::Number(1.0), Cell::Text("a".into())];
        assert_eq!(ColumnType::infer(&mixed), ColumnType::String);
        assert_eq!(ColumnType::infer(&mixed).dtype_name(), "object");
    }

    #[test]
    fn test_infer_all_null_is_unknown() {
        let nulls = [Cell::Null, Cell::Null];
        assert_eq!(ColumnType::infer(&nulls), ColumnType::Unknown);
        assert!(!ColumnType::Unknown.is_numeric());
    }
}
