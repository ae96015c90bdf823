//! CSV/TSV parser with delimiter detection.

use std::cmp::Reverse;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::cell::{Cell, is_null_value, parse_number};
use super::source::{DataTable, SourceMetadata};
use crate::error::{KilnError, Result};

/// Delimiters to try when auto-detecting.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b'|'];

/// Parser configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Delimiter to use (None = auto-detect).
    pub delimiter: Option<char>,
    /// Whether the file has a header row.
    pub has_header: bool,
    /// Maximum rows to read (None = all).
    pub max_rows: Option<usize>,
    /// Quote character.
    pub quote: char,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            has_header: true,
            max_rows: None,
            quote: '"',
        }
    }
}

/// Parses tabular data files.
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Create a new parser with default configuration.
    pub fn new() -> Self {
        Self {
            config: ParserConfig::default(),
        }
    }

    /// Create a parser with custom configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parse a file and return the data table and metadata.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<(DataTable, SourceMetadata)> {
        let path = path.as_ref();

        let mut file = File::open(path).map_err(|e| KilnError::io(path, e))?;
        let size_bytes = file.metadata().map_err(|e| KilnError::io(path, e))?.len();

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)
            .map_err(|e| KilnError::io(path, e))?;

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        let hash = format!("sha256:{:x}", hasher.finalize());

        let delimiter = match self.config.delimiter {
            Some(d) if d.is_ascii() => d as u8,
            Some(d) => {
                return Err(KilnError::Config(format!(
                    "Delimiter '{}' is not a single-byte character",
                    d
                )));
            }
            None => detect_delimiter(&contents)?,
        };

        let data_table = self.parse_bytes(&contents, delimiter)?;

        let format = match delimiter {
            b'\t' => "tsv",
            b',' => "csv",
            b';' => "csv-semicolon",
            b'|' => "psv",
            _ => "delimited",
        }
        .to_string();

        let source_metadata = SourceMetadata::new(
            path.to_path_buf(),
            hash,
            size_bytes,
            format,
            data_table.row_count(),
            data_table.column_count(),
        );

        log::debug!(
            "parsed '{}': {} rows x {} columns",
            path.display(),
            data_table.row_count(),
            data_table.column_count()
        );

        Ok((data_table, source_metadata))
    }

    /// Parse bytes directly.
    pub fn parse_bytes(&self, bytes: &[u8], delimiter: u8) -> Result<DataTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(self.config.has_header)
            .quote(self.config.quote as u8)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = if self.config.has_header {
            reader.headers()?.iter().map(|s| s.trim().to_string()).collect()
        } else {
            let mut probe = csv::ReaderBuilder::new()
                .delimiter(delimiter)
                .has_headers(false)
                .quote(self.config.quote as u8)
                .flexible(true)
                .from_reader(bytes);
            match probe.records().next() {
                Some(Ok(record)) => (0..record.len())
                    .map(|i| format!("column_{}", i + 1))
                    .collect(),
                Some(Err(e)) => return Err(e.into()),
                None => return Err(KilnError::EmptyData("No data rows found".to_string())),
            }
        };

        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(KilnError::EmptyData("No columns found".to_string()));
        }

        let expected_cols = headers.len();
        let mut records: Vec<csv::StringRecord> = Vec::new();

        for (row_idx, result) in reader.records().enumerate() {
            if let Some(max) = self.config.max_rows {
                if row_idx >= max {
                    break;
                }
            }
            records.push(result?);
        }

        if records.is_empty() {
            return Err(KilnError::EmptyData("No data rows found".to_string()));
        }

        // A column is numeric only when every present value is a number;
        // otherwise all of its values stay text.
        let numeric: Vec<bool> = (0..expected_cols)
            .map(|col| {
                records.iter().all(|record| {
                    record
                        .get(col)
                        .is_none_or(|v| is_null_value(v) || parse_number(v).is_some())
                })
            })
            .collect();

        // Ragged rows are padded with nulls or truncated
        let rows = records
            .iter()
            .map(|record| {
                (0..expected_cols)
                    .map(|col| match record.get(col) {
                        None => Cell::Null,
                        Some(v) if numeric[col] => Cell::from_raw(v),
                        Some(v) if is_null_value(v) => Cell::Null,
                        Some(v) => Cell::Text(v.to_string()),
                    })
                    .collect()
            })
            .collect();

        Ok(DataTable::new(headers, rows, delimiter))
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-blank lines sampled when guessing the delimiter.
const SAMPLE_LINES: usize = 10;

/// Pick the candidate that splits every sampled line into the same number
/// of fields, most fields first. Ties go to the earlier entry of
/// [`DELIMITERS`].
fn detect_delimiter(bytes: &[u8]) -> Result<u8> {
    let sample: Vec<String> = BufReader::new(bytes)
        .lines()
        .map_while(|line| line.ok())
        .filter(|line| !line.trim().is_empty())
        .take(SAMPLE_LINES)
        .collect();
    let Some(header) = sample.first() else {
        return Err(KilnError::EmptyData("No lines to sample for the delimiter".to_string()));
    };

    let best = DELIMITERS
        .iter()
        .enumerate()
        .filter_map(|(rank, &delim)| {
            let fields = unquoted_count(header, delim);
            if fields == 0 {
                return None;
            }
            let agreeing = sample
                .iter()
                .filter(|line| unquoted_count(line, delim) == fields)
                .count();
            Some(((agreeing == sample.len(), agreeing, fields, Reverse(rank)), delim))
        })
        .max_by_key(|(key, _)| *key)
        .map(|(_, delim)| delim);

    Ok(best.unwrap_or(b','))
}

/// Occurrences of `delimiter` outside double quotes.
fn unquoted_count(line: &str, delimiter: u8) -> usize {
    let delimiter = char::from(delimiter);
    line.chars()
        .scan(false, |quoted, ch| {
            if ch == '"' {
                *quoted = !*quoted;
            }
            Some(!*quoted && ch == delimiter)
        })
        .filter(|&hit| hit)
        .count()
}
