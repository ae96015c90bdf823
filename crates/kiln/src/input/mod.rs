//! Input parsing and data source handling.

mod cell;
mod parser;
mod source;

use std::path::Path;

pub use cell::{Cell, format_number, is_null_value, parse_datetime, parse_number};
pub use parser::{Parser, ParserConfig};
pub use source::{DataTable, SourceMetadata};

use crate::error::{KilnError, Result};

/// Load a training table, requiring the label column to be present.
pub fn load_training_dataset(
    path: impl AsRef<Path>,
    config: &ParserConfig,
    label_column: &str,
) -> Result<(DataTable, SourceMetadata)> {
    let path = path.as_ref();
    let (table, source) = Parser::with_config(config.clone()).parse_file(path)?;

    if !table.has_column(label_column) {
        return Err(KilnError::Validation(format!(
            "'{}' is not a training file: the '{}' column is required",
            source.file, label_column
        )));
    }

    Ok((table, source))
}
