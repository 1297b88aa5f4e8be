//! The closed regressor set behind the scorer.
//!
//! Each variant exposes the same capability surface — fit, predict, export
//! parameters, restore parameters — so call sites never branch on strings.
//! Parameter export is defined for the linear and network variants only;
//! the random-forest arm returns a typed error instead of failing deep in
//! attribute lookup.

mod forest;
mod mlp;
mod sgd;

pub use forest::ForestRegressor;
pub use mlp::MlpRegressor;
pub use sgd::SgdRegressor;

use crate::config::ModelVariant;
use crate::{Result, ScoreError};
use plec_core::SparseVector;
use serde::{Deserialize, Serialize};

/// A regressor of one of the three supported variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Model {
    Sgd(SgdRegressor),
    Mlp(MlpRegressor),
    Forest(ForestRegressor),
}

impl Model {
    /// Build the model for a variant with its fixed hyperparameters.
    ///
    /// `n_features` is the fingerprint bit length; `n_jobs` only affects the
    /// random forest (its training fans out across trees).
    pub fn for_variant(variant: ModelVariant, n_features: u32, n_jobs: i32) -> Self {
        match variant {
            ModelVariant::Linear => Model::Sgd(SgdRegressor::new(n_features)),
            ModelVariant::NeuralNet => Model::Mlp(MlpRegressor::new(n_features)),
            ModelVariant::RandomForest => Model::Forest(ForestRegressor::new(n_features, n_jobs)),
        }
    }

    /// The variant this model implements
    pub fn variant(&self) -> ModelVariant {
        match self {
            Model::Sgd(_) => ModelVariant::Linear,
            Model::Mlp(_) => ModelVariant::NeuralNet,
            Model::Forest(_) => ModelVariant::RandomForest,
        }
    }

    /// Whether the model holds fitted (or restored) parameters
    pub fn is_fitted(&self) -> bool {
        match self {
            Model::Sgd(m) => m.is_fitted(),
            Model::Mlp(m) => m.is_fitted(),
            Model::Forest(m) => m.is_fitted(),
        }
    }

    /// Fit on sparse descriptors. The forest densifies internally; the
    /// other variants consume the sparse rows directly.
    pub fn fit(&mut self, descs: &[SparseVector], target: &[f64]) -> Result<()> {
        if descs.len() != target.len() || descs.is_empty() {
            return Err(ScoreError::Dataset(format!(
                "descriptor/target length mismatch: {} vs {}",
                descs.len(),
                target.len()
            )));
        }
        match self {
            Model::Sgd(m) => m.fit(descs, target),
            Model::Mlp(m) => m.fit(descs, target),
            Model::Forest(m) => m.fit(descs, target),
        }
    }

    /// Predict affinities for a batch of descriptors
    pub fn predict(&self, descs: &[SparseVector]) -> Result<Vec<f64>> {
        match self {
            Model::Sgd(m) => m.predict(descs),
            Model::Mlp(m) => m.predict(descs),
            Model::Forest(m) => m.predict(descs),
        }
    }

    /// Out-of-bag predictions over the training set (random forest only)
    pub fn oob_prediction(&self) -> Option<&[f64]> {
        match self {
            Model::Forest(m) => m.oob_prediction(),
            _ => None,
        }
    }

    /// Extract the variant-appropriate parameter document
    pub fn export_parameters(&self) -> Result<ModelParameters> {
        match self {
            Model::Sgd(m) => Ok(ModelParameters::Linear(m.export_parameters()?)),
            Model::Mlp(m) => Ok(ModelParameters::Network(m.export_parameters()?)),
            Model::Forest(_) => Err(ScoreError::UnsupportedExport(ModelVariant::RandomForest)),
        }
    }

    /// Restore parameters previously produced by [`Model::export_parameters`]
    pub fn restore_parameters(&mut self, params: ModelParameters) -> Result<()> {
        match (self, params) {
            (Model::Sgd(m), ModelParameters::Linear(p)) => m.restore_parameters(p),
            (Model::Mlp(m), ModelParameters::Network(p)) => m.restore_parameters(p),
            (model, params) => Err(ScoreError::Artifact(format!(
                "parameter document for \"{}\" does not match the {} variant",
                params.variant(),
                model.variant()
            ))),
        }
    }
}

/// A portable parameter document: plain nested numbers, one shape per
/// variant. Serialized untagged so the JSON is a flat attribute mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelParameters {
    Network(NetworkParameters),
    Linear(LinearParameters),
}

impl ModelParameters {
    /// The variant this document belongs to
    pub fn variant(&self) -> ModelVariant {
        match self {
            ModelParameters::Linear(_) => ModelVariant::Linear,
            ModelParameters::Network(_) => ModelVariant::NeuralNet,
        }
    }
}

/// Linear variant parameters: weight vector and intercept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearParameters {
    pub coef: Vec<f64>,
    pub intercept: f64,
}

/// Network variant parameters: per-layer weight matrices and bias vectors
/// plus the fit diagnostics (final loss, iteration and layer counts).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkParameters {
    pub loss: f64,
    pub coefs: Vec<Vec<Vec<f64>>>,
    pub intercepts: Vec<Vec<f64>>,
    pub n_iter: usize,
    pub n_layers: usize,
    pub n_outputs: usize,
    pub out_activation: String,
}
