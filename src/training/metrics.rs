//! Regression fit metrics

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// In-sample regression metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
    pub n_samples: usize,
}

impl RegressionMetrics {
    /// Compute metrics; R² is 0 when the target has no variance
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let n_samples = y_true.len();
        if n_samples == 0 {
            return Self {
                mae: 0.0,
                rmse: 0.0,
                r2: 0.0,
                n_samples,
            };
        }

        let n = n_samples as f64;
        let errors: Vec<f64> = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| t - p)
            .collect();

        let mse = errors.iter().map(|e| e * e).sum::<f64>() / n;
        let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

        let y_mean = y_true.iter().sum::<f64>() / n;
        let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
        let ss_res: f64 = errors.iter().map(|e| e.powi(2)).sum();
        let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

        Self {
            mae,
            rmse: mse.sqrt(),
            r2,
            n_samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_perfect_fit() {
        let y = array![1.0, 2.0, 3.0];
        let m = RegressionMetrics::compute(&y, &y);
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.r2, 1.0);
        assert_eq!(m.n_samples, 3);
    }

    #[test]
    fn test_known_errors() {
        let m = RegressionMetrics::compute(&array![10.0, 20.0, 30.0], &array![12.0, 18.0, 30.0]);
        assert!((m.mae - 4.0 / 3.0).abs() < 1e-12);
        assert!((m.rmse - (8.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!((m.r2 - (1.0 - 8.0 / 200.0)).abs() < 1e-12);
    }

    #[test]
    fn test_constant_target() {
        let m = RegressionMetrics::compute(&array![5.0, 5.0], &array![4.0, 6.0]);
        assert_eq!(m.r2, 0.0);
    }
}
