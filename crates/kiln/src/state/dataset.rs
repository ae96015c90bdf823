//! The shared dataset and everything derived from it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::valid_values::ValidValuesMap;
use crate::config::DatasetConfig;
use crate::error::{KilnError, Result};
use crate::input::{DataTable, ParserConfig, SourceMetadata, load_training_dataset};
use crate::schema::{ColumnSummary, ColumnType};

/// One row of the column overview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnOverview {
    pub name: String,
    pub dtype: ColumnType,
    /// Numeric, or the label column.
    pub compatible: bool,
    pub selected: bool,
    /// Set for columns that would break training.
    pub warning: Option<String>,
}

/// Single owner of the current table, its valid values and the column
/// selection.
///
/// Every change to the table goes through [`DatasetState::replace`], which
/// refreshes the derived metadata.
#[derive(Debug, Clone)]
pub struct DatasetState {
    table: DataTable,
    valid_values: ValidValuesMap,
    source: Option<SourceMetadata>,
    selection: Vec<String>,
    config: DatasetConfig,
}

impl DatasetState {
    /// Wrap a table. The label column starts selected when present.
    pub fn new(table: DataTable, config: DatasetConfig) -> Self {
        let valid_values = ValidValuesMap::compute(&table, &config);
        let selection = if table.has_column(&config.label_column) {
            vec![config.label_column.clone()]
        } else {
            Vec::new()
        };
        Self {
            table,
            valid_values,
            source: None,
            selection,
            config,
        }
    }

    /// Load a training file. Fails if the label column is missing.
    pub fn open(
        path: impl AsRef<Path>,
        parser: &ParserConfig,
        config: DatasetConfig,
    ) -> Result<Self> {
        let (table, source) = load_training_dataset(path, parser, &config.label_column)?;
        let mut state = Self::new(table, config);
        state.source = Some(source);
        Ok(state)
    }

    pub fn table(&self) -> &DataTable {
        &self.table
    }

    pub fn valid_values(&self) -> &ValidValuesMap {
        &self.valid_values
    }

    pub fn source(&self) -> Option<&SourceMetadata> {
        self.source.as_ref()
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    /// Swap in a new table and refresh everything derived from it.
    pub fn replace(&mut self, table: DataTable) {
        self.table = table;
        self.refresh();
    }

    /// Recompute valid values and drop selected columns that no longer
    /// exist.
    pub fn refresh(&mut self) {
        self.valid_values = ValidValuesMap::compute(&self.table, &self.config);
        let table = &self.table;
        self.selection.retain(|c| table.has_column(c));
        if table.has_column(&self.config.label_column)
            && !self.selection.contains(&self.config.label_column)
        {
            self.selection.insert(0, self.config.label_column.clone());
        }
        log::debug!(
            "refreshed dataset state: {} rows, {} columns, {} selected",
            self.table.row_count(),
            self.table.column_count(),
            self.selection.len()
        );
    }

    /// Add a column to the selection.
    pub fn select(&mut self, column: &str) -> Result<()> {
        if !self.table.has_column(column) {
            return Err(KilnError::NotFound(format!("column '{}'", column)));
        }
        if !self.is_selected(column) {
            self.selection.push(column.to_string());
        }
        Ok(())
    }

    /// Remove a column from the selection. The label cannot be deselected.
    pub fn deselect(&mut self, column: &str) -> Result<()> {
        if column == self.config.label_column {
            return Err(KilnError::Validation(format!(
                "'{}' is the label column and is always selected",
                column
            )));
        }
        self.selection.retain(|c| c != column);
        Ok(())
    }

    pub fn is_selected(&self, column: &str) -> bool {
        self.selection.iter().any(|c| c == column)
    }

    /// Selected columns in selection order.
    pub fn selected_columns(&self) -> &[String] {
        &self.selection
    }

    /// Every column with its type, training compatibility and selection.
    pub fn column_overview(&self) -> Vec<ColumnOverview> {
        self.table
            .headers
            .iter()
            .enumerate()
            .map(|(col, name)| {
                let dtype = self.table.column_type(col);
                let compatible = dtype.is_numeric() || *name == self.config.label_column;
                let warning = (!compatible).then(|| {
                    format!(
                        "Column '{}' contains non-numeric data and may affect the model",
                        name
                    )
                });
                ColumnOverview {
                    name: name.clone(),
                    dtype,
                    compatible,
                    selected: self.is_selected(name),
                    warning,
                }
            })
            .collect()
    }

    /// The capped summary of one column.
    pub fn column_summary(&self, column: &str) -> Result<ColumnSummary> {
        let col = self
            .table
            .column_index(column)
            .ok_or_else(|| KilnError::NotFound(format!("column '{}'", column)))?;
        Ok(ColumnSummary::new(
            &self.table,
            col,
            self.config.summary_cap,
            self.config.summary_preview,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Cell;

    fn state() -> DatasetState {
        let table = DataTable::from_columns(vec![
            ("id", vec![Cell::from(1i64), Cell::from(2i64)]),
            ("city", vec![Cell::from("NYC"), Cell::Null]),
            ("result", vec![Cell::from(0i64), Cell::from(1i64)]),
        ])
        .unwrap();
        DatasetState::new(table, DatasetConfig::default())
    }

    #[test]
    fn test_label_always_selected() {
        let mut state = state();
        assert_eq!(state.selected_columns(), ["result"]);
        assert!(state.deselect("result").is_err());

        state.select("city").unwrap();
        state.select("city").unwrap();
        assert_eq!(state.selected_columns(), ["result", "city"]);
        assert!(state.select("missing").is_err());

        state.deselect("city").unwrap();
        assert_eq!(state.selected_columns(), ["result"]);
    }

    #[test]
    fn test_replace_prunes_selection_and_refreshes() {
        let mut state = state();
        state.select("city").unwrap();

        let mut table = state.table().clone();
        table.drop_column("city");
        state.replace(table);

        assert_eq!(state.selected_columns(), ["result"]);
        assert!(state.valid_values().get("city").is_none());
        assert_eq!(state.valid_values().len(), 2);
    }

    #[test]
    fn test_overview_warns_on_text() {
        let overview = state().column_overview();
        let city = overview.iter().find(|c| c.name == "city").unwrap();
        assert!(!city.compatible);
        assert!(city.warning.is_some());
        let result = overview.iter().find(|c| c.name == "result").unwrap();
        assert!(result.compatible && result.selected);
    }

    #[test]
    fn test_column_summary() {
        let summary = state().column_summary("city").unwrap();
        assert_eq!(summary.null_count, 1);
        assert_eq!(summary.shown_values, vec!["NYC"]);
        assert!(matches!(
            state().column_summary("nope"),
            Err(KilnError::NotFound(_))
        ));
    }
}
