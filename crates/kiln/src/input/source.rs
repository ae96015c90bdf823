//! Data source abstraction and metadata.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{KilnError, Result};
use crate::schema::ColumnType;

use super::cell::Cell;

/// Metadata about the source data file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// File name without path.
    pub file: String,
    /// Full path to the file.
    pub path: PathBuf,
    /// SHA-256 hash of the file contents.
    pub hash: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Detected format (csv, tsv, etc.).
    pub format: String,
    /// Number of data rows (excluding header).
    pub row_count: usize,
    /// Number of columns.
    pub column_count: usize,
    /// When the file was loaded.
    pub loaded_at: DateTime<Utc>,
}

impl SourceMetadata {
    /// Create metadata for a file that has been loaded.
    pub fn new(
        path: PathBuf,
        hash: String,
        size_bytes: u64,
        format: String,
        row_count: usize,
        column_count: usize,
    ) -> Self {
        let file = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            file,
            path,
            hash,
            size_bytes,
            format,
            row_count,
            column_count,
            loaded_at: Utc::now(),
        }
    }
}

/// Parsed tabular data.
///
/// Cloning a table is a deep copy, which is what undo snapshots rely on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    /// Column headers.
    pub headers: Vec<String>,
    /// Row data (row-major order).
    pub rows: Vec<Vec<Cell>>,
    /// The delimiter used when the table is written back out.
    pub delimiter: u8,
}

impl DataTable {
    /// Create a new data table.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>, delimiter: u8) -> Self {
        Self {
            headers,
            rows,
            delimiter,
        }
    }

    /// Build a table from named columns of equal length.
    pub fn from_columns(columns: Vec<(&str, Vec<Cell>)>) -> Result<Self> {
        let row_count = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        if let Some((name, _)) = columns.iter().find(|(_, c)| c.len() != row_count) {
            return Err(KilnError::Validation(format!(
                "Column '{}' does not have {} rows",
                name, row_count
            )));
        }

        let headers = columns.iter().map(|(name, _)| name.to_string()).collect();
        let mut rows = vec![Vec::with_capacity(columns.len()); row_count];
        for (_, cells) in columns {
            for (row, cell) in rows.iter_mut().zip(cells) {
                row.push(cell);
            }
        }
        Ok(Self::new(headers, rows, b','))
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Get the number of rows (excluding header).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Position of a column, or a runtime error naming the transform.
    pub fn require_column(&self, transform: &str, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| {
            KilnError::runtime(transform, format!("column '{}' not found in dataset", name))
        })
    }

    /// Check whether a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Get all values for a column by index.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Cell> {
        self.rows.iter().map(move |row| row.get(index).unwrap_or(&Cell::Null))
    }

    /// Get a column by name.
    pub fn column_by_name(&self, name: &str) -> Option<Vec<&Cell>> {
        let index = self.column_index(name)?;
        Some(self.column_values(index).collect())
    }

    /// Get a specific cell value.
    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Set a specific cell value. Out-of-range positions are ignored.
    pub fn set(&mut self, row: usize, col: usize, value: Cell) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value;
        }
    }

    /// Rewrite every cell of a column in place.
    pub fn map_column(&mut self, col: usize, mut f: impl FnMut(&Cell) -> Cell) {
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(col) {
                *cell = f(cell);
            }
        }
    }

    /// Set a whole column, adding it at the end if it does not exist.
    pub fn put_column(&mut self, name: &str, values: Vec<Cell>) -> Result<()> {
        if values.len() != self.row_count() {
            return Err(KilnError::Validation(format!(
                "Column '{}' has {} values but the table has {} rows",
                name,
                values.len(),
                self.row_count()
            )));
        }
        match self.column_index(name) {
            Some(col) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[col] = value;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Remove a column if present. Returns whether anything was removed.
    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some(col) = self.column_index(name) else {
            return false;
        };
        self.headers.remove(col);
        for row in &mut self.rows {
            if col < row.len() {
                row.remove(col);
            }
        }
        true
    }

    /// Rename a column. Fails if the new name is already taken.
    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<()> {
        if from != to && self.has_column(to) {
            return Err(KilnError::Validation(format!("Column '{}' already exists", to)));
        }
        let col = self
            .column_index(from)
            .ok_or_else(|| KilnError::NotFound(format!("column '{}'", from)))?;
        self.headers[col] = to.to_string();
        Ok(())
    }

    /// Keep only the rows whose cell in `col` satisfies the predicate.
    pub fn retain_rows(&mut self, col: usize, mut keep: impl FnMut(&Cell) -> bool) {
        self.rows
            .retain(|row| keep(row.get(col).unwrap_or(&Cell::Null)));
    }

    /// Count missing values in a column.
    pub fn null_count(&self, col: usize) -> usize {
        self.column_values(col).filter(|c| c.is_null()).count()
    }

    /// Inferred type of a column.
    pub fn column_type(&self, col: usize) -> ColumnType {
        ColumnType::infer(self.column_values(col))
    }

    /// Non-null numeric values of a column, or the first non-numeric cell
    /// found.
    pub fn numeric_values(&self, col: usize) -> std::result::Result<Vec<f64>, Cell> {
        let mut values = Vec::with_capacity(self.row_count());
        for cell in self.column_values(col) {
            match cell {
                Cell::Null => {}
                Cell::Number(n) => values.push(*n),
                other => return Err(other.clone()),
            }
        }
        Ok(values)
    }

    /// Write the table as delimited text.
    pub fn write_delimited(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| KilnError::io(path, e))?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(BufWriter::new(file));

        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|c| c.to_string()))?;
        }
        writer.flush().map_err(|e| KilnError::io(path, e))?;
        Ok(())
    }
}
