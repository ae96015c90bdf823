//! Error types for the kiln library.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for kiln operations.
#[derive(Debug, Error)]
pub enum KilnError {
    /// Error reading or writing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Empty file or no data to work with.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed transform definition, or a dataset missing required columns.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A transform or model artifact that does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A transform finished without producing a table.
    #[error("Transform '{transform}' returned no table; it must return a dataset")]
    ContractViolation { transform: String },

    /// Any other failure raised inside a transform body.
    #[error("Transform '{transform}' failed: {message}")]
    RuntimeTransform { transform: String, message: String },

    /// A custom transform body that does not compile.
    #[error("Script error in '{function}' at line {line}: {message}")]
    Script {
        function: String,
        line: usize,
        message: String,
    },

    /// Error saving or loading persisted state.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// Coarse classification of a [`KilnError`], used at the boundary where a
/// user action is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    ContractViolation,
    NotFound,
    RuntimeTransform,
    Io,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::ContractViolation => "contract",
            ErrorKind::NotFound => "not found",
            ErrorKind::RuntimeTransform => "transform",
            ErrorKind::Io => "io",
            ErrorKind::Other => "other",
        };
        write!(f, "{}", label)
    }
}

impl KilnError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            KilnError::Validation(_) | KilnError::Script { .. } => ErrorKind::Validation,
            KilnError::ContractViolation { .. } => ErrorKind::ContractViolation,
            KilnError::NotFound(_) => ErrorKind::NotFound,
            KilnError::RuntimeTransform { .. } => ErrorKind::RuntimeTransform,
            KilnError::Io { .. } => ErrorKind::Io,
            _ => ErrorKind::Other,
        }
    }

    /// Shorthand for an error raised inside a transform body.
    pub fn runtime(transform: impl Into<String>, message: impl Into<String>) -> Self {
        KilnError::RuntimeTransform {
            transform: transform.into(),
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        KilnError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for kiln operations.
pub type Result<T> = std::result::Result<T, KilnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            KilnError::Validation("bad".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            KilnError::Script {
                function: "f".into(),
                line: 2,
                message: "x".into()
            }
            .kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            KilnError::ContractViolation {
                transform: "f".into()
            }
            .kind(),
            ErrorKind::ContractViolation
        );
        assert_eq!(KilnError::runtime("f", "boom").kind(), ErrorKind::RuntimeTransform);
        assert_eq!(KilnError::EmptyData("x".into()).kind(), ErrorKind::Other);
        assert_eq!(ErrorKind::NotFound.to_string(), "not found");
    }

    #[test]
    fn test_runtime_message_names_transform() {
        let err = KilnError::runtime("normalize_bdate", "column 'bdate' not found");
        assert_eq!(
            err.to_string(),
            "Transform 'normalize_bdate' failed: column 'bdate' not found"
        );
    }
}
