//! Configuration for kiln.
//!
//! Every field has a default, so a `kiln.toml` only needs the values it
//! changes:
//!
//! ```toml
//! store_path = "transforms/custom.kiln"
//!
//! [dataset]
//! age_column = "bdate_age"
//!
//! [transforms]
//! reference_year = 2025
//!
//! [model]
//! neighbors = 7
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{KilnError, Result};
use crate::input::ParserConfig;
use crate::transform::SurveyColumns;

/// Default name of the custom transform store.
pub const DEFAULT_STORE_FILE: &str = "custom_transforms.kiln";

/// Default name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "kiln.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KilnConfig {
    /// Path of the custom transform text store.
    pub store_path: PathBuf,
    /// Parser configuration.
    pub parser: ParserConfig,
    /// Dataset conventions.
    pub dataset: DatasetConfig,
    /// Constants used by the built-in and survey transforms.
    pub transforms: TransformOptions,
    /// Model training parameters.
    pub model: ModelConfig,
    /// Columns the survey pipeline runs on.
    pub survey: SurveyColumns,
}

impl Default for KilnConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_FILE),
            parser: ParserConfig::default(),
            dataset: DatasetConfig::default(),
            transforms: TransformOptions::default(),
            model: ModelConfig::default(),
            survey: SurveyColumns::default(),
        }
    }
}

impl KilnConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| KilnError::io(path, e))?;
        let config: KilnConfig = toml::from_str(&text).map_err(|e| {
            KilnError::Config(format!("Failed to parse '{}': {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file if it exists, defaults otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("no config at '{}', using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        let (low, high) = self.dataset.age_range;
        if low > high {
            return Err(KilnError::Config(format!(
                "age_range lower bound {} exceeds upper bound {}",
                low, high
            )));
        }
        if self.dataset.summary_preview > self.dataset.summary_cap {
            return Err(KilnError::Config(
                "summary_preview must not exceed summary_cap".to_string(),
            ));
        }
        if !(1..=50).contains(&self.model.neighbors) {
            return Err(KilnError::Config(format!(
                "neighbors must be between 1 and 50, got {}",
                self.model.neighbors
            )));
        }
        if !(self.model.test_fraction > 0.0 && self.model.test_fraction < 1.0) {
            return Err(KilnError::Config(format!(
                "test_fraction must be in (0, 1), got {}",
                self.model.test_fraction
            )));
        }
        Ok(())
    }
}

/// Dataset conventions: which columns carry special meaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Required binary label column.
    pub label_column: String,
    /// Optional identifier column, never used as a feature.
    pub id_column: String,
    /// Derived age column with a fixed valid range.
    pub age_column: String,
    /// Inclusive valid range of the age column.
    pub age_range: (i64, i64),
    /// Above this many distinct values a summary shows only a preview.
    pub summary_cap: usize,
    /// Number of values in a summary preview.
    pub summary_preview: usize,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            label_column: "result".to_string(),
            id_column: "id".to_string(),
            age_column: "bdate_age".to_string(),
            age_range: (16, 75),
            summary_cap: 10,
            summary_preview: 5,
        }
    }
}

/// Constants shared by transforms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    /// Year ages are computed against.
    pub reference_year: i64,
    /// Inclusive range of plausible birth years.
    pub year_range: (i64, i64),
    /// Inclusive day-of-month range.
    pub day_range: (i64, i64),
    /// Inclusive month range.
    pub month_range: (i64, i64),
    /// IQR multiplier for outlier removal.
    pub iqr_multiplier: f64,
    /// Maximum nesting of custom transforms calling each other.
    pub max_call_depth: usize,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            reference_year: 2025,
            year_range: (1900, 2025),
            day_range: (1, 31),
            month_range: (1, 12),
            iqr_multiplier: 1.5,
            max_call_depth: 16,
        }
    }
}

/// KNN training parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Number of neighbors.
    pub neighbors: usize,
    /// Share of rows held out for scoring.
    pub test_fraction: f64,
    /// Seed of the train/test shuffle.
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            neighbors: 5,
            test_fraction: 0.25,
            seed: 42,
        }
    }
}
