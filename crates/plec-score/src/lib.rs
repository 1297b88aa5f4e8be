//! PLEC binding-affinity scoring.
//!
//! Pairs the PLEC interaction fingerprint (`plec-core`) with one of three
//! regressor variants under a single training/persistence contract:
//!
//! - [`config`]: immutable scorer configuration and deterministic artifact
//!   naming
//! - [`models`]: the closed regressor set (linear SGD, feed-forward network,
//!   random forest) with a uniform fit/predict/export/restore surface
//! - [`metrics`]: regression evaluation (R², Pearson r, RMSE)
//! - [`dataset`]: PDBBind index access and the descriptor CSV table
//! - [`scorer`]: the generic scorer base (descriptor binding, prediction,
//!   artifact snapshots)
//! - [`plecscore`]: the PLECscore adapter with its train / export / load
//!   lifecycle
//!
//! Training is synchronous and file-based: descriptors are generated once
//! into a CSV, models fit from it, and fitted scorers round-trip through
//! bincode artifacts or (for the linear variant) portable JSON parameter
//! documents.

pub mod config;
pub mod dataset;
pub mod metrics;
pub mod models;
mod parallel;
pub mod plecscore;
pub mod scorer;

pub use config::{ModelVariant, PlecConfig};
pub use models::{LinearParameters, Model, ModelParameters, NetworkParameters};
pub use plecscore::{LoadOptions, PlecScore, TrainOptions};
pub use scorer::{PlecDescriptor, Scorer};

use thiserror::Error;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Errors produced by scoring, training and persistence operations.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("unknown model variant \"{0}\": expected one of linear, nn, rf")]
    InvalidVariant(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("descriptor table error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("artifact error: {0}")]
    Artifact(String),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("parameter export is not supported for the {0} variant")]
    UnsupportedExport(ModelVariant),

    #[error("model has not been fitted")]
    NotTrained,

    #[error("thread pool error: {0}")]
    Parallel(String),

    #[error(transparent)]
    Core(#[from] plec_core::CoreError),
}

/// Result type for plec-score operations.
pub type Result<T> = std::result::Result<T, ScoreError>;
