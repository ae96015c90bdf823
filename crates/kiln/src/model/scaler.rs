//! Standardization of feature vectors.

use serde::{Deserialize, Serialize};

use crate::error::{KilnError, Result};

/// Scales each feature to zero mean and unit variance.
///
/// Uses the population standard deviation; a constant feature gets a
/// scale of 1 so it maps to zero instead of dividing by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit on rows of equal width.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let width = rows
            .first()
            .map(Vec::len)
            .ok_or_else(|| KilnError::EmptyData("no rows to fit the scaler on".to_string()))?;
        if rows.iter().any(|r| r.len() != width) {
            return Err(KilnError::Validation(
                "all rows must have the same number of features".to_string(),
            ));
        }

        let n = rows.len() as f64;
        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut scale = vec![0.0; width];
        for row in rows {
            for ((s, v), m) in scale.iter_mut().zip(row).zip(&mean) {
                *s += (v - m).powi(2);
            }
        }
        for s in scale.iter_mut() {
            let std = (*s / n).sqrt();
            *s = if std == 0.0 { 1.0 } else { std };
        }

        Ok(Self { mean, scale })
    }

    /// Number of features the scaler was fitted on.
    pub fn width(&self) -> usize {
        self.mean.len()
    }

    /// Scale one feature vector.
    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.width() {
            return Err(KilnError::Validation(format!(
                "expected {} features, got {}",
                self.width(),
                features.len()
            )));
        }
        Ok(features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }
}
