//! Feed-forward network regressor for the nn variant.
//!
//! Three ReLU hidden layers with an identity output, trained full-batch by
//! L-BFGS (two-loop recursion with a backtracking Armijo line search). The
//! configured batch size is recorded for export fidelity; the quasi-Newton
//! solver always consumes the full batch. The first layer multiplies the
//! sparse descriptor rows directly so the 2^16-wide input is never
//! densified.

use crate::models::NetworkParameters;
use crate::{Result, ScoreError};
use ndarray::{Array1, Array2};
use plec_core::SparseVector;
use rand::Rng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Fixed hyperparameters for the nn variant.
const HIDDEN_LAYER_SIZES: [usize; 3] = [200, 200, 200];
const BATCH_SIZE: usize = 10;
const ALPHA: f64 = 1e-4;
const MAX_ITER: usize = 200;
const TOL: f64 = 1e-4;
const LBFGS_MEMORY: usize = 10;
const GRAD_TOL: f64 = 1e-5;
const SEED: u64 = 0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpRegressor {
    hidden_layer_sizes: Vec<usize>,
    batch_size: usize,
    alpha: f64,
    max_iter: usize,
    tol: f64,
    seed: u64,
    n_features: u32,
    coefs: Vec<Array2<f64>>,
    intercepts: Vec<Array1<f64>>,
    loss: f64,
    n_iter: usize,
    fitted: bool,
}

impl MlpRegressor {
    /// New untrained network over `n_features` inputs
    pub fn new(n_features: u32) -> Self {
        Self::with_hidden(n_features, HIDDEN_LAYER_SIZES.to_vec())
    }

    fn with_hidden(n_features: u32, hidden_layer_sizes: Vec<usize>) -> Self {
        Self {
            hidden_layer_sizes,
            batch_size: BATCH_SIZE,
            alpha: ALPHA,
            max_iter: MAX_ITER,
            tol: TOL,
            seed: SEED,
            n_features,
            coefs: Vec::new(),
            intercepts: Vec::new(),
            loss: f64::NAN,
            n_iter: 0,
            fitted: false,
        }
    }

    /// Small-architecture constructor for fast tests
    #[cfg(test)]
    pub(crate) fn for_tests(n_features: u32, hidden: Vec<usize>) -> Self {
        Self::with_hidden(n_features, hidden)
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Full layer size chain: input, hidden..., output
    fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![self.n_features as usize];
        sizes.extend(&self.hidden_layer_sizes);
        sizes.push(1);
        sizes
    }

    /// Fit by minimizing the L2-penalized half squared error with L-BFGS.
    pub fn fit(&mut self, descs: &[SparseVector], target: &[f64]) -> Result<()> {
        let sizes = self.layer_sizes();
        let mut rng = rand::rngs::StdRng::seed_from_u64(self.seed);

        // Glorot-uniform initialization for weights and biases
        let mut coefs = Vec::new();
        let mut intercepts = Vec::new();
        for w in sizes.windows(2) {
            let (fan_in, fan_out) = (w[0], w[1]);
            let bound = (6.0 / (fan_in + fan_out) as f64).sqrt();
            coefs.push(Array2::from_shape_fn((fan_in, fan_out), |_| {
                rng.gen_range(-bound..bound)
            }));
            intercepts.push(Array1::from_shape_fn(fan_out, |_| {
                rng.gen_range(-bound..bound)
            }));
        }

        let x0 = pack(&coefs, &intercepts);
        let objective = |flat: &[f64]| {
            let (coefs, intercepts) = unpack(flat, &sizes);
            let (loss, grad_coefs, grad_intercepts) =
                loss_and_grads(&coefs, &intercepts, descs, target, self.alpha);
            (loss, pack(&grad_coefs, &grad_intercepts))
        };

        let outcome = lbfgs(objective, x0, LBFGS_MEMORY, self.max_iter, self.tol);

        let (coefs, intercepts) = unpack(&outcome.x, &sizes);
        self.coefs = coefs;
        self.intercepts = intercepts;
        self.loss = outcome.loss;
        self.n_iter = outcome.iterations;
        self.fitted = true;

        log::debug!(
            "MLP fit converged: loss={:.6} after {} iterations",
            self.loss,
            self.n_iter
        );
        Ok(())
    }

    /// Predict a single descriptor
    pub fn predict_one(&self, desc: &SparseVector) -> Result<f64> {
        if !self.fitted {
            return Err(ScoreError::NotTrained);
        }

        // first layer consumes the sparse row directly
        let mut activation = self.intercepts[0].clone();
        for (idx, count) in desc.iter() {
            activation.scaled_add(count, &self.coefs[0].row(idx as usize));
        }
        activation.mapv_inplace(relu);

        for layer in 1..self.coefs.len() {
            let mut z = activation.dot(&self.coefs[layer]) + &self.intercepts[layer];
            if layer + 1 < self.coefs.len() {
                z.mapv_inplace(relu);
            }
            activation = z;
        }

        Ok(activation[0])
    }

    pub fn predict(&self, descs: &[SparseVector]) -> Result<Vec<f64>> {
        descs.iter().map(|d| self.predict_one(d)).collect()
    }

    /// Extract the documented attribute subset
    pub fn export_parameters(&self) -> Result<NetworkParameters> {
        if !self.fitted {
            return Err(ScoreError::NotTrained);
        }
        Ok(NetworkParameters {
            loss: self.loss,
            coefs: self
                .coefs
                .iter()
                .map(|w| w.rows().into_iter().map(|r| r.to_vec()).collect())
                .collect(),
            intercepts: self.intercepts.iter().map(|b| b.to_vec()).collect(),
            n_iter: self.n_iter,
            n_layers: self.layer_sizes().len(),
            n_outputs: 1,
            out_activation: "identity".to_string(),
        })
    }

    /// Restore exported parameters, validating every layer shape
    pub fn restore_parameters(&mut self, params: NetworkParameters) -> Result<()> {
        let sizes = self.layer_sizes();
        if params.coefs.len() != sizes.len() - 1 || params.intercepts.len() != sizes.len() - 1 {
            return Err(ScoreError::Artifact(format!(
                "expected {} layers in parameter document, found {}",
                sizes.len() - 1,
                params.coefs.len()
            )));
        }

        let mut coefs = Vec::new();
        let mut intercepts = Vec::new();
        for (layer, w) in sizes.windows(2).enumerate() {
            let (fan_in, fan_out) = (w[0], w[1]);
            let matrix = &params.coefs[layer];
            if matrix.len() != fan_in || matrix.iter().any(|row| row.len() != fan_out) {
                return Err(ScoreError::Artifact(format!(
                    "layer {layer} weight matrix does not have shape {fan_in}x{fan_out}"
                )));
            }
            let flat: Vec<f64> = matrix.iter().flatten().copied().collect();
            let array = Array2::from_shape_vec((fan_in, fan_out), flat)
                .map_err(|e| ScoreError::Artifact(e.to_string()))?;
            coefs.push(array);

            if params.intercepts[layer].len() != fan_out {
                return Err(ScoreError::Artifact(format!(
                    "layer {layer} bias vector does not have length {fan_out}"
                )));
            }
            intercepts.push(Array1::from_vec(params.intercepts[layer].clone()));
        }

        self.coefs = coefs;
        self.intercepts = intercepts;
        self.loss = params.loss;
        self.n_iter = params.n_iter;
        self.fitted = true;
        Ok(())
    }
}

fn relu(x: f64) -> f64 {
    if x > 0.0 {
        x
    } else {
        0.0
    }
}

/// Full-batch loss and gradients via backprop.
///
/// Loss is `SSE/(2n) + alpha/(2n) * sum(W^2)`, matching the solver target
/// the exported `loss` field documents.
fn loss_and_grads(
    coefs: &[Array2<f64>],
    intercepts: &[Array1<f64>],
    descs: &[SparseVector],
    target: &[f64],
    alpha: f64,
) -> (f64, Vec<Array2<f64>>, Vec<Array1<f64>>) {
    let n = descs.len();
    let n_layers = coefs.len();

    // forward: activations[l] has shape (n, sizes[l + 1])
    let mut activations: Vec<Array2<f64>> = Vec::with_capacity(n_layers);
    let h1 = coefs[0].ncols();
    let mut a1 = Array2::zeros((n, h1));
    for (i, desc) in descs.iter().enumerate() {
        let mut row = intercepts[0].clone();
        for (idx, count) in desc.iter() {
            row.scaled_add(count, &coefs[0].row(idx as usize));
        }
        a1.row_mut(i).assign(&row);
    }
    a1.mapv_inplace(relu);
    activations.push(a1);

    for layer in 1..n_layers {
        let mut z = activations[layer - 1].dot(&coefs[layer]);
        z += &intercepts[layer];
        if layer + 1 < n_layers {
            z.mapv_inplace(relu);
        }
        activations.push(z);
    }

    // loss
    let pred = activations[n_layers - 1].column(0);
    let sse: f64 = pred
        .iter()
        .zip(target.iter())
        .map(|(&p, &t)| (p - t).powi(2))
        .sum();
    let penalty: f64 = coefs.iter().map(|w| w.iter().map(|v| v * v).sum::<f64>()).sum();
    let loss = sse / (2.0 * n as f64) + alpha * penalty / (2.0 * n as f64);

    // backward
    let mut grad_coefs: Vec<Array2<f64>> = coefs
        .iter()
        .map(|w| Array2::zeros(w.raw_dim()))
        .collect();
    let mut grad_intercepts: Vec<Array1<f64>> = intercepts
        .iter()
        .map(|b| Array1::zeros(b.raw_dim()))
        .collect();

    // delta at the output: (pred - y) / n, shape (n, 1)
    let mut delta = Array2::zeros((n, 1));
    for i in 0..n {
        delta[[i, 0]] = (activations[n_layers - 1][[i, 0]] - target[i]) / n as f64;
    }

    for layer in (0..n_layers).rev() {
        // weight gradient: input activation^T . delta (+ L2 term)
        if layer == 0 {
            for (i, desc) in descs.iter().enumerate() {
                let d = delta.row(i);
                for (idx, count) in desc.iter() {
                    grad_coefs[0]
                        .row_mut(idx as usize)
                        .scaled_add(count, &d);
                }
            }
        } else {
            grad_coefs[layer] = activations[layer - 1].t().dot(&delta);
        }
        grad_coefs[layer].scaled_add(alpha / n as f64, &coefs[layer]);
        grad_intercepts[layer] = delta.sum_axis(ndarray::Axis(0));

        if layer > 0 {
            // propagate through the ReLU of the previous layer
            let mut next = delta.dot(&coefs[layer].t());
            next.zip_mut_with(&activations[layer - 1], |d, &a| {
                if a <= 0.0 {
                    *d = 0.0;
                }
            });
            delta = next;
        }
    }

    (loss, grad_coefs, grad_intercepts)
}

fn pack(coefs: &[Array2<f64>], intercepts: &[Array1<f64>]) -> Vec<f64> {
    let mut flat = Vec::new();
    for (w, b) in coefs.iter().zip(intercepts.iter()) {
        flat.extend(w.iter().copied());
        flat.extend(b.iter().copied());
    }
    flat
}

fn unpack(flat: &[f64], sizes: &[usize]) -> (Vec<Array2<f64>>, Vec<Array1<f64>>) {
    let mut coefs = Vec::new();
    let mut intercepts = Vec::new();
    let mut offset = 0;

    for w in sizes.windows(2) {
        let (fan_in, fan_out) = (w[0], w[1]);
        let n_weights = fan_in * fan_out;
        let matrix =
            Array2::from_shape_vec((fan_in, fan_out), flat[offset..offset + n_weights].to_vec())
                .expect("packed parameter layout is consistent");
        offset += n_weights;
        let bias = Array1::from_vec(flat[offset..offset + fan_out].to_vec());
        offset += fan_out;
        coefs.push(matrix);
        intercepts.push(bias);
    }

    debug_assert_eq!(offset, flat.len());
    (coefs, intercepts)
}

struct LbfgsOutcome {
    x: Vec<f64>,
    loss: f64,
    iterations: usize,
}

/// Minimize `objective` with L-BFGS (two-loop recursion, Armijo backtracking).
fn lbfgs<F>(mut objective: F, x0: Vec<f64>, memory: usize, max_iter: usize, tol: f64) -> LbfgsOutcome
where
    F: FnMut(&[f64]) -> (f64, Vec<f64>),
{
    let mut x = x0;
    let (mut loss, mut grad) = objective(&x);
    let mut s_history: Vec<Vec<f64>> = Vec::new();
    let mut y_history: Vec<Vec<f64>> = Vec::new();
    let mut iterations = 0;

    for iter in 0..max_iter {
        if inf_norm(&grad) < GRAD_TOL {
            break;
        }

        // two-loop recursion for the search direction
        let mut q = grad.clone();
        let mut alphas = vec![0.0; s_history.len()];
        for k in (0..s_history.len()).rev() {
            let rho = 1.0 / dot(&y_history[k], &s_history[k]);
            alphas[k] = rho * dot(&s_history[k], &q);
            axpy(-alphas[k], &y_history[k], &mut q);
        }
        if let (Some(s), Some(y)) = (s_history.last(), y_history.last()) {
            let gamma = dot(s, y) / dot(y, y);
            q.iter_mut().for_each(|v| *v *= gamma);
        }
        for k in 0..s_history.len() {
            let rho = 1.0 / dot(&y_history[k], &s_history[k]);
            let beta = rho * dot(&y_history[k], &q);
            axpy(alphas[k] - beta, &s_history[k], &mut q);
        }
        let mut direction: Vec<f64> = q.iter().map(|v| -v).collect();

        // fall back to steepest descent if the direction is not a descent one
        let mut dg = dot(&grad, &direction);
        if dg >= 0.0 {
            direction = grad.iter().map(|v| -v).collect();
            dg = -dot(&grad, &grad);
        }

        // backtracking Armijo line search
        let mut step = if iter == 0 {
            (1.0 / inf_norm(&grad)).min(1.0)
        } else {
            1.0
        };
        let mut accepted = None;
        for _ in 0..30 {
            let x_new: Vec<f64> = x
                .iter()
                .zip(direction.iter())
                .map(|(xi, di)| xi + step * di)
                .collect();
            let (loss_new, grad_new) = objective(&x_new);
            if loss_new <= loss + 1e-4 * step * dg {
                accepted = Some((x_new, loss_new, grad_new));
                break;
            }
            step *= 0.5;
        }

        let Some((x_new, loss_new, grad_new)) = accepted else {
            break;
        };

        let s: Vec<f64> = x_new.iter().zip(x.iter()).map(|(a, b)| a - b).collect();
        let y: Vec<f64> = grad_new.iter().zip(grad.iter()).map(|(a, b)| a - b).collect();
        if dot(&s, &y) > 1e-10 {
            s_history.push(s);
            y_history.push(y);
            if s_history.len() > memory {
                s_history.remove(0);
                y_history.remove(0);
            }
        }

        let improvement = loss - loss_new;
        x = x_new;
        grad = grad_new;
        loss = loss_new;
        iterations = iter + 1;

        if improvement <= tol * loss.abs().max(1.0) {
            break;
        }
    }

    LbfgsOutcome {
        x,
        loss,
        iterations,
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    for (yi, xi) in y.iter_mut().zip(x.iter()) {
        *yi += alpha * xi;
    }
}

fn inf_norm(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |acc, x| acc.max(x.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_problem() -> (Vec<SparseVector>, Vec<f64>) {
        let descs: Vec<SparseVector> = (0..12)
            .map(|i| {
                SparseVector::from_pairs(
                    6,
                    vec![(i % 6, 1.0 + (i / 6) as f64), ((i + 2) % 6, 1.0)]
                        .into_iter()
                        .collect::<std::collections::BTreeMap<u32, f64>>()
                        .into_iter()
                        .collect(),
                )
            })
            .collect();
        let target: Vec<f64> = descs
            .iter()
            .map(|d| d.iter().map(|(idx, c)| (idx as f64 + 1.0) * 0.1 * c).sum())
            .collect();
        (descs, target)
    }

    #[test]
    fn fits_a_small_network() {
        let (descs, target) = toy_problem();
        let mut model = MlpRegressor::for_tests(6, vec![8, 8]);
        model.fit(&descs, &target).unwrap();

        assert!(model.is_fitted());
        assert!(model.loss.is_finite());
        assert!(model.n_iter > 0);

        let pred = model.predict(&descs).unwrap();
        let fitted = crate::metrics::rmse(&target, &pred);
        let baseline = crate::metrics::rmse(&target, &vec![0.0; target.len()]);
        assert!(
            fitted < 0.5 * baseline,
            "rmse {fitted} did not improve enough on baseline {baseline}"
        );
    }

    #[test]
    fn fit_is_deterministic() {
        let (descs, target) = toy_problem();
        let mut a = MlpRegressor::for_tests(6, vec![8, 8]);
        let mut b = MlpRegressor::for_tests(6, vec![8, 8]);
        a.fit(&descs, &target).unwrap();
        b.fit(&descs, &target).unwrap();
        assert_eq!(a.predict(&descs).unwrap(), b.predict(&descs).unwrap());
    }

    #[test]
    fn export_restore_round_trips_predictions() {
        let (descs, target) = toy_problem();
        let mut model = MlpRegressor::for_tests(6, vec![8, 8]);
        model.fit(&descs, &target).unwrap();

        let params = model.export_parameters().unwrap();
        assert_eq!(params.n_layers, 4); // input + 2 hidden + output
        assert_eq!(params.n_outputs, 1);
        assert_eq!(params.out_activation, "identity");

        let mut restored = MlpRegressor::for_tests(6, vec![8, 8]);
        restored.restore_parameters(params).unwrap();
        assert_eq!(
            model.predict(&descs).unwrap(),
            restored.predict(&descs).unwrap()
        );
    }

    #[test]
    fn restore_rejects_bad_shapes() {
        let mut model = MlpRegressor::for_tests(6, vec![4]);
        let params = NetworkParameters {
            loss: 0.0,
            coefs: vec![vec![vec![0.0; 4]; 6]],
            intercepts: vec![vec![0.0; 4]],
            n_iter: 1,
            n_layers: 3,
            n_outputs: 1,
            out_activation: "identity".to_string(),
        };
        // only one layer of weights for a two-weight-layer architecture
        assert!(model.restore_parameters(params).is_err());
    }
}
