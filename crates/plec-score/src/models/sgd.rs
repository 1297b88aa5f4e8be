//! Online stochastic gradient regressor for the linear variant.
//!
//! Huber loss with an elastic-net penalty, fit over sparse descriptor rows.
//! The intercept is never fitted (the published linear weights carry none);
//! the field exists so restored parameter documents round-trip exactly.

use crate::models::LinearParameters;
use crate::{Result, ScoreError};
use plec_core::SparseVector;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Fixed hyperparameters for the linear variant.
const ALPHA: f64 = 1e-4;
const EPSILON: f64 = 1e-1;
const L1_RATIO: f64 = 0.15;
const N_ITER: usize = 100;
const ETA0: f64 = 0.01;
const POWER_T: f64 = 0.25;
const SEED: u64 = 0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SgdRegressor {
    alpha: f64,
    epsilon: f64,
    l1_ratio: f64,
    n_iter: usize,
    eta0: f64,
    power_t: f64,
    fit_intercept: bool,
    seed: u64,
    n_features: u32,
    coef: Vec<f64>,
    intercept: f64,
    fitted: bool,
}

impl SgdRegressor {
    /// New untrained regressor over `n_features` inputs
    pub fn new(n_features: u32) -> Self {
        Self {
            alpha: ALPHA,
            epsilon: EPSILON,
            l1_ratio: L1_RATIO,
            n_iter: N_ITER,
            eta0: ETA0,
            power_t: POWER_T,
            fit_intercept: false,
            seed: SEED,
            n_features,
            coef: Vec::new(),
            intercept: 0.0,
            fitted: false,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Fit with seeded-shuffle SGD over the sparse rows.
    pub fn fit(&mut self, descs: &[SparseVector], target: &[f64]) -> Result<()> {
        self.coef = vec![0.0; self.n_features as usize];
        self.intercept = 0.0;

        let mut rng = rand::rngs::StdRng::seed_from_u64(self.seed);
        let mut order: Vec<usize> = (0..descs.len()).collect();
        let mut t = 1.0f64;

        for _epoch in 0..self.n_iter {
            order.shuffle(&mut rng);

            for &i in &order {
                let eta = self.eta0 / t.powf(self.power_t);
                let pred = descs[i].dot(&self.coef) + self.intercept;
                let residual = pred - target[i];

                // huber: quadratic inside the epsilon band, linear outside
                let dloss = if residual.abs() <= self.epsilon {
                    residual
                } else {
                    self.epsilon * residual.signum()
                };

                // penalty applied to touched coordinates only (sparse update)
                let l2 = self.alpha * (1.0 - self.l1_ratio);
                let l1 = self.alpha * self.l1_ratio;
                for (idx, count) in descs[i].iter() {
                    let w = &mut self.coef[idx as usize];
                    let sign = if *w == 0.0 { 0.0 } else { w.signum() };
                    let grad = dloss * count + l2 * *w + l1 * sign;
                    *w -= eta * grad;
                }

                if self.fit_intercept {
                    self.intercept -= eta * dloss;
                }
                t += 1.0;
            }
        }

        self.fitted = true;
        Ok(())
    }

    /// Predict a single descriptor
    pub fn predict_one(&self, desc: &SparseVector) -> Result<f64> {
        if !self.fitted {
            return Err(ScoreError::NotTrained);
        }
        Ok(desc.dot(&self.coef) + self.intercept)
    }

    pub fn predict(&self, descs: &[SparseVector]) -> Result<Vec<f64>> {
        descs.iter().map(|d| self.predict_one(d)).collect()
    }

    /// Extract the documented attribute subset
    pub fn export_parameters(&self) -> Result<LinearParameters> {
        if !self.fitted {
            return Err(ScoreError::NotTrained);
        }
        Ok(LinearParameters {
            coef: self.coef.clone(),
            intercept: self.intercept,
        })
    }

    /// Restore exported parameters without touching any dataset
    pub fn restore_parameters(&mut self, params: LinearParameters) -> Result<()> {
        if params.coef.len() != self.n_features as usize {
            return Err(ScoreError::Artifact(format!(
                "coefficient vector length {} does not match fingerprint size {}",
                params.coef.len(),
                self.n_features
            )));
        }
        self.coef = params.coef;
        self.intercept = params.intercept;
        self.fitted = true;
        Ok(())
    }
}
