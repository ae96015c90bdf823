//! Training a classifier on the selected columns of a dataset.

use serde::Serialize;

use super::knn::KnnClassifier;
use super::scaler::StandardScaler;
use crate::config::ModelConfig;
use crate::error::{KilnError, Result};
use crate::input::{Cell, DataTable};
use crate::state::DatasetState;

/// Result of one training run.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub classifier: KnnClassifier,
    pub scaler: StandardScaler,
    /// Feature columns in the order the model expects them.
    pub training_columns: Vec<String>,
    pub metrics: TrainingMetrics,
}

/// Held-out accuracy and split sizes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrainingMetrics {
    pub accuracy: f64,
    pub train_size: usize,
    pub test_size: usize,
}

/// Feature columns for a selection: every selected column except the
/// label and the id column, in selection order, without repeats.
pub fn training_columns(state: &DatasetState) -> Vec<String> {
    let config = state.config();
    let mut columns: Vec<String> = Vec::new();
    for column in state.selected_columns() {
        if *column == config.label_column || *column == config.id_column {
            continue;
        }
        if !columns.contains(column) {
            columns.push(column.clone());
        }
    }
    columns
}

/// Train a KNN classifier on the selected columns of `state`.
pub fn train(state: &DatasetState, config: &ModelConfig) -> Result<TrainedModel> {
    let table = state.table();
    let label = &state.config().label_column;
    let label_index = match table.column_index(label) {
        Some(index) if state.is_selected(label) => index,
        _ => {
            return Err(KilnError::Validation(format!(
                "The '{}' column is required in the dataset and in the selection",
                label
            )));
        }
    };

    let columns = training_columns(state);
    if columns.is_empty() {
        return Err(KilnError::Validation(format!(
            "No columns selected besides '{}' and '{}'",
            state.config().id_column,
            label
        )));
    }
    let features = feature_rows(table, &columns)?;
    if features.is_empty() {
        return Err(KilnError::EmptyData(
            "The dataset has no rows left to train on".to_string(),
        ));
    }
    let labels = label_values(table, label_index, label)?;

    let (train_rows, test_rows) = split(features.len(), config.test_fraction, config.seed)?;
    let pick = |rows: &[usize]| -> (Vec<Vec<f64>>, Vec<i64>) {
        rows.iter()
            .map(|&i| (features[i].clone(), labels[i]))
            .unzip()
    };
    let (x_train, y_train) = pick(&train_rows);
    let (x_test, y_test) = pick(&test_rows);

    let scaler = StandardScaler::fit(&x_train)?;
    let x_train = x_train
        .iter()
        .map(|row| scaler.transform(row))
        .collect::<Result<Vec<_>>>()?;
    let x_test = x_test
        .iter()
        .map(|row| scaler.transform(row))
        .collect::<Result<Vec<_>>>()?;

    let classifier = KnnClassifier::fit(config.neighbors, x_train, y_train)?;
    let metrics = TrainingMetrics {
        accuracy: classifier.score(&x_test, &y_test),
        train_size: train_rows.len(),
        test_size: test_rows.len(),
    };
    log::info!(
        "trained k={} on {} rows, accuracy {:.3} on {} held-out rows",
        config.neighbors,
        metrics.train_size,
        metrics.accuracy,
        metrics.test_size
    );

    Ok(TrainedModel {
        classifier,
        scaler,
        training_columns: columns,
        metrics,
    })
}

/// Rows of the named columns, which must be numeric and complete.
pub(crate) fn feature_rows(table: &DataTable, columns: &[String]) -> Result<Vec<Vec<f64>>> {
    let mut indices = Vec::with_capacity(columns.len());
    for column in columns {
        let index = table
            .column_index(column)
            .ok_or_else(|| KilnError::Validation(format!("Column '{}' not found", column)))?;
        if table.numeric_values(index).is_err() {
            return Err(KilnError::Validation(format!(
                "Column '{}' contains non-numeric values",
                column
            )));
        }
        if table.null_count(index) > 0 {
            return Err(KilnError::Validation(format!(
                "Column '{}' contains missing values",
                column
            )));
        }
        indices.push(index);
    }

    Ok(table
        .rows
        .iter()
        .map(|row| {
            indices
                .iter()
                .map(|&i| row[i].as_number().unwrap_or_default())
                .collect()
        })
        .collect())
}

fn label_values(table: &DataTable, index: usize, label: &str) -> Result<Vec<i64>> {
    table
        .column_values(index)
        .map(|cell| match cell {
            Cell::Number(n) if *n == 0.0 || *n == 1.0 => Ok(*n as i64),
            other => Err(KilnError::Validation(format!(
                "The '{}' column must contain only 0 and 1, found '{}'",
                label, other
            ))),
        })
        .collect()
}

/// Seeded shuffle split into (train, test) row indices.
fn split(rows: usize, test_fraction: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    let test_size = (rows as f64 * test_fraction).ceil() as usize;
    if test_size == 0 || test_size >= rows {
        return Err(KilnError::Validation(format!(
            "{} rows are too few to split into training and test sets",
            rows
        )));
    }

    let mut indices: Vec<usize> = (0..rows).collect();
    fastrand::Rng::with_seed(seed).shuffle(&mut indices);
    let train = indices.split_off(test_size);
    Ok((train, indices))
}
