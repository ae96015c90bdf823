//! Generic column transforms available for every dataset.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Transform, TransformContext};
use crate::error::{KilnError, Result};
use crate::input::{Cell, DataTable};
use crate::schema::NumericStatistics;

/// All generic transforms, in the order they are listed to users.
pub fn builtin_transforms() -> Vec<Arc<dyn Transform>> {
    vec![
        Arc::new(ConvertToNumeric),
        Arc::new(FillMissingValues::default()),
        Arc::new(EncodeCategorical),
        Arc::new(ConvertToDatetime),
        Arc::new(RemoveOutliers),
        Arc::new(RemoveNulls),
    ]
}

/// Coerce a column to numbers; unparseable values become missing.
pub struct ConvertToNumeric;

impl Transform for ConvertToNumeric {
    fn name(&self) -> &str {
        "convert_to_numeric"
    }

    fn description(&self) -> &str {
        "Coerce the column to numbers; invalid values become missing"
    }

    fn apply(
        &self,
        _ctx: &TransformContext<'_>,
        mut dataset: DataTable,
        column: &str,
    ) -> Result<Option<DataTable>> {
        let col = dataset.require_column(self.name(), column)?;
        dataset.map_column(col, Cell::to_numeric);
        Ok(Some(dataset))
    }
}

/// How missing values are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMethod {
    Mean,
    #[default]
    Median,
    Mode,
}

impl FromStr for FillMethod {
    type Err = KilnError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mean" => Ok(FillMethod::Mean),
            "median" => Ok(FillMethod::Median),
            "mode" => Ok(FillMethod::Mode),
            _ => Err(KilnError::Validation(format!(
                "Unknown fill method '{}'. Use mean, median, or mode.",
                s
            ))),
        }
    }
}

impl std::fmt::Display for FillMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FillMethod::Mean => write!(f, "mean"),
            FillMethod::Median => write!(f, "median"),
            FillMethod::Mode => write!(f, "mode"),
        }
    }
}

/// Fill missing values with the column's mean, median, or mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct FillMissingValues {
    method: FillMethod,
}

impl FillMissingValues {
    pub fn new(method: FillMethod) -> Self {
        Self { method }
    }

    pub fn method(&self) -> FillMethod {
        self.method
    }

    fn fill_value(&self, dataset: &DataTable, col: usize) -> Result<Option<Cell>> {
        if self.method == FillMethod::Mode {
            return crate::schema::mode(dataset.column_values(col))
                .map(Some)
                .ok_or_else(|| {
                    KilnError::runtime(self.name(), "column has no values to take the mode of")
                });
        }

        let values = dataset.numeric_values(col).map_err(|offender| {
            KilnError::runtime(
                self.name(),
                format!(
                    "cannot compute the {} of non-numeric value '{}'",
                    self.method, offender
                ),
            )
        })?;

        // An all-missing column fills with nothing
        Ok(NumericStatistics::from_values(&values).map(|stats| match self.method {
            FillMethod::Mean => Cell::Number(stats.mean),
            _ => Cell::Number(stats.median),
        }))
    }
}

impl Transform for FillMissingValues {
    fn name(&self) -> &str {
        "fill_missing_values"
    }

    fn description(&self) -> &str {
        match self.method {
            FillMethod::Mean => "Fill missing values with the column mean",
            FillMethod::Median => "Fill missing values with the column median",
            FillMethod::Mode => "Fill missing values with the most frequent value",
        }
    }

    fn apply(
        &self,
        _ctx: &TransformContext<'_>,
        mut dataset: DataTable,
        column: &str,
    ) -> Result<Option<DataTable>> {
        let col = dataset.require_column(self.name(), column)?;
        if let Some(fill) = self.fill_value(&dataset, col)? {
            dataset.map_column(col, |cell| {
                if cell.is_null() {
                    fill.clone()
                } else {
                    cell.clone()
                }
            });
        }
        Ok(Some(dataset))
    }
}

/// Replace each distinct value (as text) with its rank among all distinct
/// values. Missing values are encoded too, as the text `nan`.
pub struct EncodeCategorical;

impl EncodeCategorical {
    fn label(cell: &Cell) -> String {
        match cell {
            Cell::Null => "nan".to_string(),
            other => other.to_string(),
        }
    }
}

impl Transform for EncodeCategorical {
    fn name(&self) -> &str {
        "encode_categorical"
    }

    fn description(&self) -> &str {
        "Encode each distinct value as an integer code"
    }

    fn apply(
        &self,
        _ctx: &TransformContext<'_>,
        mut dataset: DataTable,
        column: &str,
    ) -> Result<Option<DataTable>> {
        let col = dataset.require_column(self.name(), column)?;

        let mut labels: Vec<String> = dataset.column_values(col).map(Self::label).collect();
        labels.sort();
        labels.dedup();

        dataset.map_column(col, |cell| {
            let label = Self::label(cell);
            // Every label was collected above
            let code = labels.binary_search(&label).unwrap_or_default();
            Cell::Number(code as f64)
        });
        Ok(Some(dataset))
    }
}

/// Coerce a column to date/time values; unparseable values become missing.
pub struct ConvertToDatetime;

impl Transform for ConvertToDatetime {
    fn name(&self) -> &str {
        "convert_to_datetime"
    }

    fn description(&self) -> &str {
        "Coerce the column to date/time values; invalid values become missing"
    }

    fn apply(
        &self,
        _ctx: &TransformContext<'_>,
        mut dataset: DataTable,
        column: &str,
    ) -> Result<Option<DataTable>> {
        let col = dataset.require_column(self.name(), column)?;
        dataset.map_column(col, Cell::to_datetime);
        Ok(Some(dataset))
    }
}

/// Drop rows whose value lies outside `[Q1 - k*IQR, Q3 + k*IQR]`.
///
/// Rows with a missing value are kept; removing them is `remove_nulls`' job.
pub struct RemoveOutliers;

impl Transform for RemoveOutliers {
    fn name(&self) -> &str {
        "remove_outliers"
    }

    fn description(&self) -> &str {
        "Remove rows outside the interquartile-range bounds"
    }

    fn apply(
        &self,
        ctx: &TransformContext<'_>,
        mut dataset: DataTable,
        column: &str,
    ) -> Result<Option<DataTable>> {
        let col = dataset.require_column(self.name(), column)?;
        let values = dataset.numeric_values(col).map_err(|offender| {
            KilnError::runtime(
                self.name(),
                format!("column '{}' has non-numeric value '{}'", column, offender),
            )
        })?;

        let Some(stats) = NumericStatistics::from_values(&values) else {
            return Ok(Some(dataset));
        };
        let (lower, upper) = stats.iqr_bounds(ctx.options().iqr_multiplier);

        let before = dataset.row_count();
        dataset.retain_rows(col, |cell| match cell {
            Cell::Number(v) => *v >= lower && *v <= upper,
            _ => true,
        });
        log::debug!(
            "remove_outliers on '{}': bounds [{}, {}], dropped {} rows",
            column,
            lower,
            upper,
            before - dataset.row_count()
        );
        Ok(Some(dataset))
    }
}

/// Drop rows with a missing value in the column.
pub struct RemoveNulls;

impl Transform for RemoveNulls {
    fn name(&self) -> &str {
        "remove_nulls"
    }

    fn description(&self) -> &str {
        "Remove rows with a missing value in the column"
    }

    fn requires_confirmation(&self) -> bool {
        true
    }

    fn apply(
        &self,
        _ctx: &TransformContext<'_>,
        mut dataset: DataTable,
        column: &str,
    ) -> Result<Option<DataTable>> {
        let col = dataset.require_column(self.name(), column)?;
        dataset.retain_rows(col, |cell| !cell.is_null());
        Ok(Some(dataset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransformOptions;

    fn run(t: &dyn Transform, table: DataTable, column: &str) -> Result<DataTable> {
        let options = TransformOptions::default();
        let ctx = TransformContext::new(&options);
        Ok(t.apply(&ctx, table, column)?.expect("builtin returns a table"))
    }

    fn table(column: &str, cells: Vec<Cell>) -> DataTable {
        DataTable::from_columns(vec![(column, cells)]).unwrap()
    }

    fn column(table: &DataTable, name: &str) -> Vec<Cell> {
        table.column_by_name(name).unwrap().into_iter().cloned().collect()
    }

    #[test]
    fn test_convert_to_numeric() {
        let t = table("x", vec![Cell::from("1.5"), Cell::from("abc"), Cell::Number(2.0)]);
        let out = run(&ConvertToNumeric, t, "x").unwrap();
        assert_eq!(
            column(&out, "x"),
            vec![Cell::Number(1.5), Cell::Null, Cell::Number(2.0)]
        );
    }

    #[test]
    fn test_fill_mode() {
        let t = table(
            "x",
            vec![Cell::Number(1.0), Cell::Number(1.0), Cell::Number(2.0), Cell::Null],
        );
        let out = run(&FillMissingValues::new(FillMethod::Mode), t, "x").unwrap();
        assert_eq!(column(&out, "x")[3], Cell::Number(1.0));
    }

    #[test]
    fn test_fill_mean_and_median() {
        let cells = vec![Cell::Number(1.0), Cell::Number(2.0), Cell::Number(6.0), Cell::Null];
        let out = run(&FillMissingValues::new(FillMethod::Mean), table("x", cells.clone()), "x")
            .unwrap();
        assert_eq!(column(&out, "x")[3], Cell::Number(3.0));

        let out = run(&FillMissingValues::new(FillMethod::Median), table("x", cells), "x").unwrap();
        assert_eq!(column(&out, "x")[3], Cell::Number(2.0));
    }

    #[test]
    fn test_fill_mean_rejects_text() {
        let t = table("x", vec![Cell::from("a"), Cell::Null]);
        let err = run(&FillMissingValues::new(FillMethod::Mean), t, "x").unwrap_err();
        assert!(matches!(err, KilnError::RuntimeTransform { .. }));
    }

    #[test]
    fn test_fill_all_missing() {
        let t = table("x", vec![Cell::Null, Cell::Null]);
        let out = run(&FillMissingValues::new(FillMethod::Median), t.clone(), "x").unwrap();
        assert_eq!(out, t);
        assert!(run(&FillMissingValues::new(FillMethod::Mode), t, "x").is_err());
    }

    #[test]
    fn test_fill_method_parse() {
        assert_eq!("MEAN".parse::<FillMethod>().unwrap(), FillMethod::Mean);
        assert!("average".parse::<FillMethod>().is_err());
    }

    #[test]
    fn test_encode_categorical() {
        let t = table(
            "color",
            vec![Cell::from("red"), Cell::from("blue"), Cell::Null, Cell::from("red")],
        );
        let out = run(&EncodeCategorical, t, "color").unwrap();
        // blue < nan < red
        assert_eq!(
            column(&out, "color"),
            vec![
                Cell::Number(2.0),
                Cell::Number(0.0),
                Cell::Number(1.0),
                Cell::Number(2.0)
            ]
        );
    }

    #[test]
    fn test_convert_to_datetime() {
        let t = table("when", vec![Cell::from("2024-01-02"), Cell::from("garbage")]);
        let out = run(&ConvertToDatetime, t, "when").unwrap();
        let cells = column(&out, "when");
        assert!(matches!(cells[0], Cell::DateTime(_)));
        assert_eq!(cells[1], Cell::Null);
    }

    #[test]
    fn test_remove_outliers_keeps_missing() {
        let t = table(
            "age",
            vec![
                Cell::Number(16.0),
                Cell::Number(200.0),
                Cell::Number(-5.0),
                Cell::Number(30.0),
                Cell::Null,
            ],
        );
        let out = run(&RemoveOutliers, t, "age").unwrap();
        assert_eq!(
            column(&out, "age"),
            vec![Cell::Number(16.0), Cell::Number(-5.0), Cell::Number(30.0), Cell::Null]
        );
    }

    #[test]
    fn test_remove_outliers_rejects_text() {
        let t = table("age", vec![Cell::from("old")]);
        assert!(run(&RemoveOutliers, t, "age").is_err());
    }

    #[test]
    fn test_remove_nulls() {
        let t = table("x", vec![Cell::Null, Cell::Number(1.0)]);
        let out = run(&RemoveNulls, t, "x").unwrap();
        assert_eq!(out.row_count(), 1);
    }

    #[test]
    fn test_missing_column_is_runtime_error() {
        let t = table("x", vec![Cell::Null]);
        let err = run(&ConvertToNumeric, t, "y").unwrap_err();
        assert!(err.to_string().contains("column 'y' not found"));
    }
}
