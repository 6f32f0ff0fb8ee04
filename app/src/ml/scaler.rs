// ==============================================================================
// ml/scaler.rs - Standard scaler
// ==============================================================================
// Description: Per-column zero-mean / unit-variance standardization
// Created: 2026-09-27
// Modified: 2026-10-04
// Version: 2.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};

/// Column means and standard deviations learned from training data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit on row-major samples; constant columns get scale 1.0
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let n = rows.len().max(1) as f64;

        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut variance = vec![0.0; width];
        for row in rows {
            for ((v, x), m) in variance.iter_mut().zip(row).zip(&mean) {
                *v += (x - m).powi(2);
            }
        }

        let scale = variance
            .into_iter()
            .map(|v| {
                let std = (v / n).sqrt();
                if std > f64::EPSILON {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Self { mean, scale }
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_transform() {
        let rows = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let scaler = StandardScaler::fit(&rows);

        assert_eq!(scaler.mean, vec![2.0, 5.0]);
        assert_eq!(scaler.scale, vec![1.0, 1.0]);
        assert_eq!(scaler.transform(&[3.0, 5.0]), vec![1.0, 0.0]);
        assert_eq!(scaler.transform(&[1.0, 7.0]), vec![-1.0, 2.0]);
    }

    #[test]
    fn test_transformed_columns_are_standardized() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64 * 3.0 + 1.0]).collect();
        let scaler = StandardScaler::fit(&rows);

        let transformed: Vec<f64> = rows.iter().map(|r| scaler.transform(r)[0]).collect();
        let mean = transformed.iter().sum::<f64>() / 10.0;
        let var = transformed.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / 10.0;

        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);
    }
}
