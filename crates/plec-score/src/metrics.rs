//! Regression evaluation metrics.
//!
//! Mirrors the diagnostics reported after every slow-path training run:
//! coefficient of determination, Pearson correlation and root-mean-squared
//! error per evaluation set. Degenerate inputs yield NaN rather than
//! panicking.

use serde::Serialize;

/// Coefficient of determination (R²).
pub fn r2_score(target: &[f64], pred: &[f64]) -> f64 {
    if target.is_empty() || target.len() != pred.len() {
        return f64::NAN;
    }
    let mean = target.iter().sum::<f64>() / target.len() as f64;
    let ss_tot: f64 = target.iter().map(|&t| (t - mean).powi(2)).sum();
    let ss_res: f64 = target
        .iter()
        .zip(pred.iter())
        .map(|(&t, &p)| (t - p).powi(2))
        .sum();

    if ss_tot == 0.0 {
        return f64::NAN;
    }
    1.0 - ss_res / ss_tot
}

/// Pearson correlation coefficient.
pub fn pearson_r(target: &[f64], pred: &[f64]) -> f64 {
    if target.is_empty() || target.len() != pred.len() {
        return f64::NAN;
    }
    let n = target.len() as f64;
    let mean_t = target.iter().sum::<f64>() / n;
    let mean_p = pred.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_t = 0.0;
    let mut var_p = 0.0;
    for (&t, &p) in target.iter().zip(pred.iter()) {
        cov += (t - mean_t) * (p - mean_p);
        var_t += (t - mean_t).powi(2);
        var_p += (p - mean_p).powi(2);
    }

    let denom = (var_t * var_p).sqrt();
    if denom == 0.0 {
        return f64::NAN;
    }
    cov / denom
}

/// Root-mean-squared error.
pub fn rmse(target: &[f64], pred: &[f64]) -> f64 {
    if target.is_empty() || target.len() != pred.len() {
        return f64::NAN;
    }
    let mse: f64 = target
        .iter()
        .zip(pred.iter())
        .map(|(&t, &p)| (t - p).powi(2))
        .sum::<f64>()
        / target.len() as f64;
    mse.sqrt()
}

/// The three per-set metrics logged after training.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionReport {
    pub r2: f64,
    pub rp: f64,
    pub rmse: f64,
}

impl RegressionReport {
    /// Compute all three metrics for one evaluation set
    pub fn compute(target: &[f64], pred: &[f64]) -> Self {
        Self {
            r2: r2_score(target, pred),
            rp: pearson_r(target, pred),
            rmse: rmse(target, pred),
        }
    }

    /// Emit the diagnostic line for a named evaluation set
    pub fn log(&self, set_name: &str) {
        log::info!(
            "{} set:\tR2_score: {:.4}\tRp: {:.4}\tRMSE: {:.4}",
            set_name,
            self.r2,
            self.rp,
            self.rmse
        );
    }
}
