//! Column classification and per-column summaries.

mod column;
mod types;

pub use column::{ColumnSummary, NumericStatistics, UniqueValues, distinct_sorted};
pub(crate) use column::{mode, quantile};
pub use types::ColumnType;
