//! Saving, loading and applying a trained model.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::knn::KnnClassifier;
use super::scaler::StandardScaler;
use super::training::{TrainedModel, feature_rows};
use crate::config::DatasetConfig;
use crate::error::{KilnError, Result};
use crate::input::{Cell, DataTable, Parser, ParserConfig};
use crate::state::{DatasetState, ValidValuesMap};

/// File holding the classifier.
pub const MODEL_FILE: &str = "knn_model.json";
/// File holding the fitted scaler.
pub const SCALER_FILE: &str = "scaler.json";
/// File holding the ordered training columns.
pub const COLUMNS_FILE: &str = "training_columns.json";
/// File holding the dataset at training time.
pub const DATAFRAME_FILE: &str = "dataframe.json";
/// File holding the valid values at training time.
pub const VALID_VALUES_FILE: &str = "valid_values.json";

/// The files of a bundle, in load order.
pub const BUNDLE_FILES: [&str; 5] = [
    MODEL_FILE,
    SCALER_FILE,
    COLUMNS_FILE,
    DATAFRAME_FILE,
    VALID_VALUES_FILE,
];

/// Prediction for one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted class.
    pub label: i64,
    /// Probability of each class, in ascending class order.
    pub probabilities: Vec<(i64, f64)>,
}

impl Prediction {
    /// Probability of the positive class `1`.
    pub fn positive_probability(&self) -> f64 {
        self.probabilities
            .iter()
            .find(|(class, _)| *class == 1)
            .map(|(_, p)| *p)
            .unwrap_or(0.0)
    }
}

/// Outcome of a batch prediction.
#[derive(Debug, Clone)]
pub struct BatchPrediction {
    /// Where the annotated table was written.
    pub output: PathBuf,
    pub predictions: Vec<Prediction>,
}

/// Everything needed to predict with a trained model, persisted as five
/// JSON files in one directory.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    pub classifier: KnnClassifier,
    pub scaler: StandardScaler,
    pub training_columns: Vec<String>,
    pub dataframe: DataTable,
    pub valid_values: ValidValuesMap,
}

impl ModelBundle {
    /// Bundle a freshly trained model with the dataset it was trained on.
    pub fn new(model: TrainedModel, state: &DatasetState) -> Self {
        Self {
            classifier: model.classifier,
            scaler: model.scaler,
            training_columns: model.training_columns,
            dataframe: state.table().clone(),
            valid_values: state.valid_values().clone(),
        }
    }

    /// Write the five bundle files into `dir`, creating it if needed.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| {
                KilnError::Persistence(format!(
                    "Failed to create directory '{}': {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        write_json(&dir.join(MODEL_FILE), &self.classifier)?;
        write_json(&dir.join(SCALER_FILE), &self.scaler)?;
        write_json(&dir.join(COLUMNS_FILE), &self.training_columns)?;
        write_json(&dir.join(DATAFRAME_FILE), &self.dataframe)?;
        write_json(&dir.join(VALID_VALUES_FILE), &self.valid_values)?;
        log::info!("saved model bundle to '{}'", dir.display());
        Ok(())
    }

    /// Load a bundle. Fails naming the first missing file.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if let Some(missing) = BUNDLE_FILES.iter().find(|f| !dir.join(f).exists()) {
            return Err(KilnError::NotFound(format!(
                "Model file '{}' not found in '{}'",
                missing,
                dir.display()
            )));
        }

        let bundle = Self {
            classifier: read_json(&dir.join(MODEL_FILE))?,
            scaler: read_json(&dir.join(SCALER_FILE))?,
            training_columns: read_json(&dir.join(COLUMNS_FILE))?,
            dataframe: read_json(&dir.join(DATAFRAME_FILE))?,
            valid_values: read_json(&dir.join(VALID_VALUES_FILE))?,
        };
        if bundle.scaler.width() != bundle.training_columns.len() {
            return Err(KilnError::Persistence(format!(
                "Scaler in '{}' expects {} features but {} training columns are listed",
                dir.display(),
                bundle.scaler.width(),
                bundle.training_columns.len()
            )));
        }
        log::debug!("loaded model bundle from '{}'", dir.display());
        Ok(bundle)
    }

    /// Predict one record given a value for every training column.
    pub fn predict_record(&self, values: &IndexMap<String, f64>) -> Result<Prediction> {
        if let Some(extra) = values.keys().find(|k| !self.training_columns.contains(*k)) {
            return Err(KilnError::Validation(format!(
                "'{}' is not a training column",
                extra
            )));
        }
        let features = self
            .training_columns
            .iter()
            .map(|column| {
                values.get(column).copied().ok_or_else(|| {
                    KilnError::Validation(format!("Missing value for '{}'", column))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        self.predict(&features)
    }

    /// Predict every row of a delimited file and write the rows with
    /// `prediction` and `probability` columns next to it as
    /// `<stem>_predictions.<ext>`.
    ///
    /// The whole batch is rejected when a training column is missing,
    /// non-numeric or incomplete, or when the age column has a value
    /// outside its valid range.
    pub fn predict_batch(
        &self,
        path: impl AsRef<Path>,
        parser: &ParserConfig,
        dataset: &DatasetConfig,
    ) -> Result<BatchPrediction> {
        let path = path.as_ref();
        let (mut table, _) = Parser::with_config(parser.clone()).parse_file(path)?;

        let missing: Vec<&str> = self
            .training_columns
            .iter()
            .filter(|c| !table.has_column(c))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(KilnError::Validation(format!(
                "Missing columns in the test file: {}",
                missing.join(", ")
            )));
        }
        let rows = feature_rows(&table, &self.training_columns)?;
        self.check_age_range(&table, dataset)?;

        let predictions = rows
            .iter()
            .map(|row| self.predict(row))
            .collect::<Result<Vec<_>>>()?;
        table.put_column(
            "prediction",
            predictions.iter().map(|p| Cell::from(p.label)).collect(),
        )?;
        table.put_column(
            "probability",
            predictions
                .iter()
                .map(|p| Cell::Number(p.positive_probability()))
                .collect(),
        )?;

        let output = predictions_path(path);
        table.write_delimited(&output)?;
        log::info!(
            "wrote {} predictions to '{}'",
            predictions.len(),
            output.display()
        );
        Ok(BatchPrediction {
            output,
            predictions,
        })
    }

    fn check_age_range(&self, table: &DataTable, dataset: &DatasetConfig) -> Result<()> {
        if !self.training_columns.contains(&dataset.age_column) {
            return Ok(());
        }
        let Some(index) = table.column_index(&dataset.age_column) else {
            return Ok(());
        };
        let (low, high) = dataset.age_range;
        let out_of_range = table
            .column_values(index)
            .filter_map(Cell::as_number)
            .filter(|v| *v < low as f64 || *v > high as f64)
            .count();
        if out_of_range > 0 {
            return Err(KilnError::Validation(format!(
                "Column '{}' has {} values outside the range {} to {}",
                dataset.age_column, out_of_range, low, high
            )));
        }
        Ok(())
    }

    fn predict(&self, features: &[f64]) -> Result<Prediction> {
        let scaled = self.scaler.transform(features)?;
        let probabilities = self.classifier.predict_proba(&scaled);
        Ok(Prediction {
            label: self.classifier.predict(&scaled),
            probabilities: self
                .classifier
                .classes()
                .iter()
                .copied()
                .zip(probabilities)
                .collect(),
        })
    }
}

/// `<stem>_predictions.<ext>` next to `path`.
pub fn predictions_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_predictions.{}", stem, ext.to_string_lossy()),
        None => format!("{}_predictions", stem),
    };
    path.with_file_name(name)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).map_err(|e| {
        KilnError::Persistence(format!(
            "Failed to create file '{}': {}",
            path.display(),
            e
        ))
    })?;
    serde_json::to_writer_pretty(BufWriter::new(file), value).map_err(|e| {
        KilnError::Persistence(format!("Failed to write '{}': {}", path.display(), e))
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| KilnError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        KilnError::Persistence(format!("Failed to parse '{}': {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predictions_path() {
        assert_eq!(
            predictions_path(Path::new("/data/test.csv")),
            PathBuf::from("/data/test_predictions.csv")
        );
        assert_eq!(
            predictions_path(Path::new("clients")),
            PathBuf::from("clients_predictions")
        );
    }

    #[test]
    fn test_positive_probability() {
        let p = Prediction {
            label: 0,
            probabilities: vec![(0, 0.8), (1, 0.2)],
        };
        assert_eq!(p.positive_probability(), 0.2);
        let only_zero = Prediction {
            label: 0,
            probabilities: vec![(0, 1.0)],
        };
        assert_eq!(only_zero.positive_probability(), 0.0);
    }
}
