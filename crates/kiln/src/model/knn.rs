//! Brute-force k-nearest-neighbors classification.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{KilnError, Result};

/// A fitted KNN classifier with uniform voting over Euclidean distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnClassifier {
    k: usize,
    points: Vec<Vec<f64>>,
    labels: Vec<i64>,
    classes: Vec<i64>,
}

impl KnnClassifier {
    /// Store the training points.
    pub fn fit(k: usize, points: Vec<Vec<f64>>, labels: Vec<i64>) -> Result<Self> {
        if k == 0 {
            return Err(KilnError::Validation("k must be at least 1".to_string()));
        }
        if points.len() != labels.len() {
            return Err(KilnError::Validation(format!(
                "{} points but {} labels",
                points.len(),
                labels.len()
            )));
        }
        if k > points.len() {
            return Err(KilnError::Validation(format!(
                "k = {} exceeds the {} training rows",
                k,
                points.len()
            )));
        }

        let mut classes = labels.clone();
        classes.sort_unstable();
        classes.dedup();

        Ok(Self {
            k,
            points,
            labels,
            classes,
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Class labels in ascending order; probabilities follow this order.
    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    /// Share of the k nearest neighbors in each class.
    pub fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        let mut distances: Vec<(f64, usize)> = self
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| (squared_distance(p, features), i))
            .collect();
        distances.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });

        let mut votes = vec![0usize; self.classes.len()];
        for &(_, i) in distances.iter().take(self.k) {
            if let Ok(c) = self.classes.binary_search(&self.labels[i]) {
                votes[c] += 1;
            }
        }
        votes.iter().map(|&v| v as f64 / self.k as f64).collect()
    }

    /// Most voted class; ties go to the smallest label.
    pub fn predict(&self, features: &[f64]) -> i64 {
        let probabilities = self.predict_proba(features);
        let mut best = 0;
        for (i, p) in probabilities.iter().enumerate() {
            if *p > probabilities[best] {
                best = i;
            }
        }
        self.classes.get(best).copied().unwrap_or_default()
    }

    /// Fraction of rows predicted correctly.
    pub fn score(&self, points: &[Vec<f64>], labels: &[i64]) -> f64 {
        if points.is_empty() {
            return 0.0;
        }
        let correct = points
            .iter()
            .zip(labels)
            .filter(|(p, l)| self.predict(p) == **l)
            .count();
        correct as f64 / points.len() as f64
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier(k: usize) -> KnnClassifier {
        KnnClassifier::fit(
            k,
            vec![vec![0.0], vec![1.0], vec![10.0], vec![11.0], vec![12.0]],
            vec![0, 0, 1, 1, 1],
        )
        .unwrap()
    }

    #[test]
    fn test_predict_nearest() {
        let knn = classifier(1);
        assert_eq!(knn.predict(&[0.4]), 0);
        assert_eq!(knn.predict(&[9.0]), 1);
        assert_eq!(knn.classes(), &[0, 1]);
    }

    #[test]
    fn test_probabilities() {
        let knn = classifier(3);
        let p = knn.predict_proba(&[2.0]);
        assert!((p[0] - 2.0 / 3.0).abs() < 1e-12);
        assert!((p[1] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(knn.predict(&[2.0]), 0);
    }

    #[test]
    fn test_tie_goes_to_smallest_label() {
        let knn = KnnClassifier::fit(2, vec![vec![0.0], vec![2.0]], vec![1, 0]).unwrap();
        assert_eq!(knn.predict(&[1.0]), 0);
    }

    #[test]
    fn test_fit_rejects_large_k() {
        assert!(KnnClassifier::fit(6, vec![vec![0.0]; 5], vec![0; 5]).is_err());
        assert!(KnnClassifier::fit(0, vec![vec![0.0]], vec![0]).is_err());
    }

    #[test]
    fn test_score() {
        let knn = classifier(1);
        let score = knn.score(&[vec![0.0], vec![11.5]], &[1, 1]);
        assert_eq!(score, 0.5);
    }
}
