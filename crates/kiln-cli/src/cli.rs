//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Kiln: column cleaning, custom transforms and KNN training
#[derive(Parser)]
#[command(name = "kiln")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: ./kiln.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show columns, summaries and valid values of a training file
    Inspect {
        /// Path to the data file (CSV/TSV)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Only summarize this column
        #[arg(short, long)]
        column: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply transforms to one column, in order
    Transform {
        /// Path to the data file (CSV/TSV)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Column to transform
        #[arg(short, long)]
        column: String,

        /// Transform to apply (repeatable, e.g. -t fill_missing_values:mean)
        #[arg(short = 't', long = "transform", required = true)]
        transforms: Vec<String>,

        /// Output path (default: <file>_transformed.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do not ask before removing rows
        #[arg(short, long)]
        yes: bool,
    },

    /// Clean a dataset interactively, one column at a time
    Session {
        /// Path to the data file (CSV/TSV)
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Manage custom transforms
    Functions {
        #[command(subcommand)]
        action: FunctionsAction,
    },

    /// Run the survey pipeline (birth date, age, education)
    Survey {
        /// Path to the survey export (CSV/TSV)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output path (default: <file>_processed.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Train a KNN classifier and save the model bundle
    Train {
        /// Path to the training file (CSV/TSV)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Feature column to select (repeatable)
        #[arg(short = 'c', long = "column", required = true)]
        columns: Vec<String>,

        /// Number of neighbors (1-50)
        #[arg(short = 'k', long = "neighbors")]
        neighbors: Option<usize>,

        /// Directory for the model bundle
        #[arg(long, default_value = "model")]
        out: PathBuf,
    },

    /// Predict with a saved model bundle
    Predict {
        /// Model bundle directory
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// File of records to predict
        #[arg(long, conflicts_with = "values", required_unless_present = "values")]
        input: Option<PathBuf>,

        /// One feature value of a single record (repeatable)
        #[arg(long = "value", value_name = "COLUMN=VALUE")]
        values: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum FunctionsAction {
    /// List every available transform
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the source of a custom transform
    Show {
        /// Function name
        name: String,
    },

    /// Add a custom transform
    Add {
        /// Function name
        name: String,

        /// Source file (default: read from stdin)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Replace the source of a custom transform
    Edit {
        /// Current function name
        name: String,

        /// New name for the function
        #[arg(long)]
        rename: Option<String>,

        /// Source file (default: read from stdin)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Delete a custom transform
    Delete {
        /// Function name
        name: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}
