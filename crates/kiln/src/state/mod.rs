//! Dataset state: the current table, its valid values and the column
//! selection.

mod dataset;
mod valid_values;

pub use dataset::{ColumnOverview, DatasetState};
pub use valid_values::{ValidValues, ValidValuesMap};
