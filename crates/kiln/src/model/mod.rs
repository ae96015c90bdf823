//! KNN training and prediction on a prepared dataset.
//!
//! Training uses the selected columns, which must all be numeric and
//! complete, scales them with a [`StandardScaler`] fitted on the training
//! split and stores the scaled rows in a [`KnnClassifier`].

mod bundle;
mod knn;
mod scaler;
mod training;

pub use bundle::{
    BUNDLE_FILES, BatchPrediction, COLUMNS_FILE, DATAFRAME_FILE, MODEL_FILE, ModelBundle,
    Prediction, SCALER_FILE, VALID_VALUES_FILE, predictions_path,
};
pub use knn::KnnClassifier;
pub use scaler::StandardScaler;
pub use training::{TrainedModel, TrainingMetrics, train, training_columns};
