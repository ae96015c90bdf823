//! Kiln: column cleaning, custom transforms and KNN training for tabular
//! datasets.
//!
//! A dataset is loaded into a [`DatasetState`], cleaned one column at a
//! time through a [`ColumnSession`] with undo, and used to train a
//! k-nearest-neighbors classifier.
//!
//! # Core Principles
//!
//! - **One contract**: every transform maps `(dataset, column)` to a dataset
//! - **All or nothing**: a failed transform never changes the dataset
//! - **Text is the source of truth**: custom transforms are reloaded from
//!   their store after every change
//!
//! # Example
//!
//! ```no_run
//! use kiln::{ColumnSession, Kiln};
//!
//! let kiln = Kiln::with_defaults().unwrap();
//! let mut state = kiln.open_dataset("clients.csv").unwrap();
//!
//! let mut session = ColumnSession::open(&mut state, "income").unwrap();
//! let report = kiln.apply(&mut session, "fill_missing_values:median").unwrap();
//! println!("{} rows", report.rows_after);
//! ```

pub mod config;
pub mod error;
pub mod input;
pub mod model;
pub mod registry;
pub mod schema;
pub mod script;
pub mod state;
pub mod transform;

mod kiln;

pub use crate::kiln::Kiln;
pub use config::KilnConfig;
pub use error::{ErrorKind, KilnError, Result};
pub use input::{Cell, DataTable, SourceMetadata};
pub use model::{ModelBundle, Prediction, TrainedModel};
pub use registry::TransformRegistry;
pub use schema::{ColumnSummary, ColumnType};
pub use state::{DatasetState, ValidValues, ValidValuesMap};
pub use transform::{
    ApplyReport, ColumnSession, Confirm, Prompt, Transform, TransformContext, TransformInfo,
    TransformKind,
};
