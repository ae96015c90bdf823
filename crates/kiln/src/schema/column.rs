//! Column summaries and statistics.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::ColumnType;
use crate::input::{Cell, DataTable, format_number, parse_number};

/// Distinct non-null values of a column, sorted.
///
/// Numeric when every distinct value reads as a number, otherwise the
/// values' text forms sorted lexicographically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum UniqueValues {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl UniqueValues {
    /// Number of distinct values.
    pub fn len(&self) -> usize {
        match self {
            UniqueValues::Numeric(v) => v.len(),
            UniqueValues::Text(v) => v.len(),
        }
    }

    /// Whether there are no values at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values rendered for display.
    pub fn rendered(&self) -> Vec<String> {
        match self {
            UniqueValues::Numeric(v) => v.iter().map(|n| format_number(*n)).collect(),
            UniqueValues::Text(v) => v.clone(),
        }
    }
}

/// Collect the distinct non-null values of a column and sort them.
///
/// Never fails: heterogeneous columns fall back to a text sort.
pub fn distinct_sorted<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> UniqueValues {
    let present: Vec<&Cell> = cells.into_iter().filter(|c| !c.is_null()).collect();

    let numeric: Option<Vec<f64>> = present
        .iter()
        .map(|cell| match cell {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => parse_number(s),
            _ => None,
        })
        .collect();

    match numeric {
        Some(mut values) => {
            values.sort_by(|a, b| a.total_cmp(b));
            values.dedup_by(|a, b| a == b);
            UniqueValues::Numeric(values)
        }
        None => {
            let mut values: Vec<String> = present.iter().map(|c| c.to_string()).collect();
            values.sort();
            values.dedup();
            UniqueValues::Text(values)
        }
    }
}

/// Summary of one column shown after every transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSummary {
    /// Column name.
    pub column: String,
    /// Inferred data type.
    pub dtype: ColumnType,
    /// Total number of rows.
    pub row_count: usize,
    /// Number of missing values.
    pub null_count: usize,
    /// Number of distinct non-null values.
    pub unique_count: usize,
    /// Distinct values shown, already capped.
    pub shown_values: Vec<String>,
    /// Whether `shown_values` is a preview of a longer list.
    pub truncated: bool,
}

impl ColumnSummary {
    /// Summarize a column. When there are more than `cap` distinct values
    /// only the first `preview` are kept.
    pub fn new(table: &DataTable, col: usize, cap: usize, preview: usize) -> Self {
        let unique = distinct_sorted(table.column_values(col));
        let mut shown_values = unique.rendered();
        let unique_count = shown_values.len();
        let truncated = unique_count > cap;
        if truncated {
            shown_values.truncate(preview);
        }

        Self {
            column: table.headers[col].clone(),
            dtype: table.column_type(col),
            row_count: table.row_count(),
            null_count: table.null_count(col),
            unique_count,
            shown_values,
            truncated,
        }
    }
}

impl fmt::Display for ColumnSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Details for column '{}':", self.column)?;
        writeln!(f, "- Data type: {}", self.dtype)?;
        writeln!(f, "- Null count: {}", self.null_count)?;
        write!(f, "- Unique values: {}", self.shown_values.join(", "))?;
        if self.truncated {
            write!(
                f,
                " (first {} of {} unique values)",
                self.shown_values.len(),
                self.unique_count
            )?;
        }
        Ok(())
    }
}

/// Statistics for numeric columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
    pub median: f64,
    /// First quartile (25th percentile).
    pub q1: f64,
    /// Third quartile (75th percentile).
    pub q3: f64,
}

impl NumericStatistics {
    /// Compute statistics over non-missing values. `None` when empty.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let std = if sorted.len() > 1 {
            (sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        } else {
            0.0
        };

        Some(Self {
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean,
            std,
            median: quantile(&sorted, 0.5),
            q1: quantile(&sorted, 0.25),
            q3: quantile(&sorted, 0.75),
        })
    }

    /// Calculate the interquartile range.
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    /// Inclusive bounds outside which a value is an outlier.
    pub fn iqr_bounds(&self, multiplier: f64) -> (f64, f64) {
        let iqr = self.iqr();
        (self.q1 - multiplier * iqr, self.q3 + multiplier * iqr)
    }
}

/// Quantile of sorted values with linear interpolation between the two
/// closest ranks.
pub(crate) fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let weight = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Most frequent value; ties go to the smallest in [`Cell::total_cmp`] order.
pub(crate) fn mode<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> Option<Cell> {
    let mut present: Vec<&Cell> = cells.into_iter().filter(|c| !c.is_null()).collect();
    present.sort_by(|a, b| a.total_cmp(b));

    let mut best: Option<(&Cell, usize)> = None;
    let mut i = 0;
    while i < present.len() {
        let mut j = i + 1;
        while j < present.len() && present[j] == present[i] {
            j += 1;
        }
        let count = j - i;
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((present[i], count));
        }
        i = j;
    }
    best.map(|(cell, _)| cell.clone())
}
