//! Standard (z-score) feature scaling
//!
//! The walk-forward loop constructs a fresh scaler each day and refits it
//! over everything strictly before that day. The refit-from-scratch is
//! part of the numerical contract; there is no incremental variant.

use crate::data::dataset::CONT_DIM;
use crate::{PuckError, Result};
use serde::{Deserialize, Serialize};

/// Per-column mean/standard-deviation scaler over the continuous inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    std: Vec<f64>,
    fitted: bool,
}

impl StandardScaler {
    pub fn new() -> Self {
        StandardScaler {
            mean: vec![0.0; CONT_DIM],
            std: vec![1.0; CONT_DIM],
            fitted: false,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Fit per-column population mean and standard deviation.
    ///
    /// A zero-variance column gets a unit deviation so its values map to
    /// exactly 0. Fitting on an empty slice is a no-op and leaves the
    /// scaler unfitted.
    pub fn fit(&mut self, features: &[[f32; CONT_DIM]]) {
        if features.is_empty() {
            return;
        }
        let n = features.len() as f64;
        let mut mean = vec![0.0f64; CONT_DIM];
        let mut sum_sq = vec![0.0f64; CONT_DIM];
        for row in features {
            for (j, value) in row.iter().enumerate() {
                mean[j] += f64::from(*value);
                sum_sq[j] += f64::from(*value) * f64::from(*value);
            }
        }
        let mut std = vec![1.0f64; CONT_DIM];
        for j in 0..CONT_DIM {
            mean[j] /= n;
            let variance = (sum_sq[j] / n - mean[j] * mean[j]).max(0.0);
            if variance.sqrt() > 1e-12 {
                std[j] = variance.sqrt();
            }
        }
        self.mean = mean;
        self.std = std;
        self.fitted = true;
    }

    /// Transform one feature array with the fitted statistics
    pub fn transform(&self, features: &[f32; CONT_DIM]) -> Result<[f32; CONT_DIM]> {
        if !self.fitted {
            return Err(PuckError::ScalerNotFitted);
        }
        let mut out = [0.0f32; CONT_DIM];
        for j in 0..CONT_DIM {
            out[j] = ((f64::from(features[j]) - self.mean[j]) / self.std[j]) as f32;
        }
        Ok(out)
    }
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(value: f32) -> [f32; CONT_DIM] {
        [value; CONT_DIM]
    }

    #[test]
    fn test_transform_before_fit_is_an_error() {
        let scaler = StandardScaler::new();
        assert!(matches!(
            scaler.transform(&feature(1.0)),
            Err(PuckError::ScalerNotFitted)
        ));
    }

    #[test]
    fn test_fit_transform_zero_centers() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&[feature(1.0), feature(3.0)]);

        let out = scaler.transform(&feature(2.0)).unwrap();
        assert!(out.iter().all(|v| v.abs() < 1e-6));

        // mean 2, std 1
        let out = scaler.transform(&feature(3.0)).unwrap();
        assert!(out.iter().all(|v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_zero_variance_column_maps_to_zero() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&[feature(5.0), feature(5.0), feature(5.0)]);

        let out = scaler.transform(&feature(5.0)).unwrap();
        assert!(out.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_fit_on_empty_is_a_noop() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&[]);
        assert!(!scaler.is_fitted());
    }
}
