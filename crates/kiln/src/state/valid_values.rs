//! Per-column valid values, recomputed after every dataset change.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::DatasetConfig;
use crate::input::{Cell, DataTable};
use crate::schema::{UniqueValues, distinct_sorted};

/// Legal or observed values of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidValues {
    /// A fixed inclusive integer range.
    Range { min: i64, max: i64 },
    /// The distinct values seen in the column.
    Observed { values: UniqueValues },
}

impl ValidValues {
    /// Whether a value is acceptable. Missing values never are.
    pub fn accepts(&self, cell: &Cell) -> bool {
        match self {
            ValidValues::Range { min, max } => cell
                .to_numeric()
                .as_number()
                .is_some_and(|v| v >= *min as f64 && v <= *max as f64),
            ValidValues::Observed { values } => {
                if cell.is_null() {
                    return false;
                }
                match values {
                    UniqueValues::Numeric(nums) => cell
                        .to_numeric()
                        .as_number()
                        .is_some_and(|v| nums.iter().any(|n| *n == v)),
                    UniqueValues::Text(texts) => {
                        let text = cell.to_string();
                        texts.iter().any(|t| *t == text)
                    }
                }
            }
        }
    }
}

impl fmt::Display for ValidValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidValues::Range { min, max } => write!(f, "{}..={}", min, max),
            ValidValues::Observed { values } => write!(f, "[{}]", values.rendered().join(", ")),
        }
    }
}

/// Valid values for every column, in column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidValuesMap {
    columns: IndexMap<String, ValidValues>,
}

impl ValidValuesMap {
    /// Compute the map for a table. Deterministic and total: a column of
    /// mixed values falls back to a text ordering rather than failing.
    pub fn compute(table: &DataTable, config: &DatasetConfig) -> Self {
        let columns = table
            .headers
            .iter()
            .enumerate()
            .map(|(col, name)| {
                let valid = if *name == config.age_column {
                    let (min, max) = config.age_range;
                    ValidValues::Range { min, max }
                } else {
                    ValidValues::Observed {
                        values: distinct_sorted(table.column_values(col)),
                    }
                };
                (name.clone(), valid)
            })
            .collect();
        Self { columns }
    }

    pub fn get(&self, column: &str) -> Option<&ValidValues> {
        self.columns.get(column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ValidValues)> {
        self.columns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_ranges_and_observed() {
        let table = DataTable::from_columns(vec![
            ("bdate_age", vec![Cell::Number(30.0), Cell::Number(90.0)]),
            ("city", vec![Cell::from("b"), Cell::from("a")]),
            ("n", vec![Cell::from("10"), Cell::Number(9.0)]),
        ])
        .unwrap();
        let map = ValidValuesMap::compute(&table, &DatasetConfig::default());

        assert_eq!(
            map.get("bdate_age"),
            Some(&ValidValues::Range { min: 16, max: 75 })
        );
        assert_eq!(
            map.get("city").unwrap().to_string(),
            "[a, b]"
        );
        assert_eq!(
            map.get("n"),
            Some(&ValidValues::Observed {
                values: UniqueValues::Numeric(vec![9.0, 10.0])
            })
        );
        let names: Vec<&String> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["bdate_age", "city", "n"]);
    }

    #[test]
    fn test_accepts() {
        let range = ValidValues::Range { min: 16, max: 75 };
        assert!(range.accepts(&Cell::Number(16.0)));
        assert!(range.accepts(&Cell::from("75")));
        assert!(!range.accepts(&Cell::Number(76.0)));
        assert!(!range.accepts(&Cell::Null));

        let observed = ValidValues::Observed {
            values: UniqueValues::Text(vec!["a".into()]),
        };
        assert!(observed.accepts(&Cell::from("a")));
        assert!(!observed.accepts(&Cell::from("b")));
    }

    #[test]
    fn test_serializes_in_column_order() {
        let table = DataTable::from_columns(vec![
            ("z", vec![Cell::Number(1.0)]),
            ("a", vec![Cell::Null]),
        ])
        .unwrap();
        let map = ValidValuesMap::compute(&table, &DatasetConfig::default());
        let json = serde_json::to_string(&map).unwrap();
        assert!(json.find("\"z\"").unwrap() < json.find("\"a\"").unwrap());
        let back: ValidValuesMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
