//! The PLECscore adapter: configuration, training lifecycle, parameter
//! export and artifact loading over the generic scorer base.
//!
//! Filenames are deterministic functions of (variant, depths, bit length,
//! benchmark version), and every operation takes its directory explicitly;
//! nothing is resolved relative to the installed module or the working
//! directory.

use crate::config::{ModelVariant, PlecConfig};
use crate::dataset::PdbBindSource;
use crate::metrics::RegressionReport;
use crate::models::{Model, ModelParameters};
use crate::scorer::{PlecDescriptor, Scorer};
use crate::{Result, ScoreError};
use plec_core::Molecule;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Options for one training run.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Directory holding the descriptor CSV and receiving artifacts
    pub home_dir: PathBuf,
    /// Explicit artifact destination; the deterministic name inside
    /// `home_dir` is used when absent
    pub artifact_path: Option<PathBuf>,
    /// Benchmark version the descriptors were generated from
    pub pdbbind_version: u32,
    /// Skip the pretrained-JSON fast path even when a document exists
    pub ignore_json: bool,
}

impl TrainOptions {
    pub fn new(home_dir: impl Into<PathBuf>) -> Self {
        Self {
            home_dir: home_dir.into(),
            artifact_path: None,
            pdbbind_version: 2016,
            ignore_json: false,
        }
    }
}

/// Options for the load factory. Every value is explicit: the artifact name
/// is a pure function of these fields and `home_dir` is the only directory
/// probed.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Explicit artifact path; wins over the deterministic name
    pub path: Option<PathBuf>,
    /// Directory probed for the deterministic artifact name
    pub home_dir: PathBuf,
    pub variant: ModelVariant,
    pub depth_protein: usize,
    pub depth_ligand: usize,
    pub size: u32,
    pub pdbbind_version: u32,
}

impl LoadOptions {
    pub fn new(home_dir: impl Into<PathBuf>, variant: ModelVariant) -> Self {
        let defaults = PlecConfig::default();
        Self {
            path: None,
            home_dir: home_dir.into(),
            variant,
            depth_protein: defaults.depth_protein,
            depth_ligand: defaults.depth_ligand,
            size: defaults.size,
            pdbbind_version: 2016,
        }
    }

    fn to_config(&self) -> PlecConfig {
        PlecConfig {
            variant: self.variant,
            depth_protein: self.depth_protein,
            depth_ligand: self.depth_ligand,
            size: self.size,
            ..Default::default()
        }
    }
}

/// A PLEC fingerprint bound to one of the three regressor variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlecScore {
    pub config: PlecConfig,
    scorer: Scorer,
}

impl PlecScore {
    /// Build the adapter: bind the fingerprint parameters and construct the
    /// variant's model with its fixed hyperparameters.
    pub fn new(config: PlecConfig) -> Result<Self> {
        let descriptor = PlecDescriptor::from_config(&config)?;
        let model = Model::for_variant(config.variant, config.size, config.n_jobs);
        let scorer = Scorer::new(config.score_title(), descriptor, model);
        Ok(Self { config, scorer })
    }

    /// The human-readable score title (`PLEC{variant}_p{P}_l{L}`)
    pub fn score_title(&self) -> &str {
        &self.scorer.score_title
    }

    /// Whether the underlying model holds fitted parameters
    pub fn is_fitted(&self) -> bool {
        self.scorer.model.is_fitted()
    }

    /// Access the wrapped scorer base
    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    /// Predict the affinity of a protein-ligand pair
    pub fn predict(&self, protein: &Molecule, ligand: &Molecule) -> Result<f64> {
        self.scorer.predict_pair(protein, ligand)
    }

    /// Predict a ligand against the bound protein reference
    pub fn predict_ligand(&self, ligand: &Molecule) -> Result<f64> {
        self.scorer.predict_ligand(ligand)
    }

    /// Generate the training descriptor CSV from a benchmark installation.
    /// Returns the CSV path; the file exists on success.
    pub fn gen_training_data(
        &self,
        pdbbind_dir: &Path,
        pdbbind_versions: &[u32],
        home_dir: &Path,
    ) -> Result<PathBuf> {
        let source = PdbBindSource::new(pdbbind_dir, pdbbind_versions);
        let csv_path = home_dir.join(self.config.descriptor_filename());
        self.scorer
            .gen_pdbbind_descriptors(&source, &csv_path, self.config.n_jobs)?;
        Ok(csv_path)
    }

    /// Train the model.
    ///
    /// Fast path: a linear variant with a matching parameter JSON restores
    /// the published weights without touching the dataset and persists
    /// nothing (returns `None`). Otherwise the slow path loads the
    /// descriptor CSV, fits, reports metrics and persists the whole adapter
    /// (returns the artifact path).
    pub fn train(&mut self, opts: &TrainOptions) -> Result<Option<PathBuf>> {
        let json_path = opts
            .home_dir
            .join(self.config.json_filename(opts.pdbbind_version));

        if self.config.variant == ModelVariant::Linear && json_path.is_file() && !opts.ignore_json
        {
            log::info!(
                "Loading pretrained PLECscore {} with depths P{} L{} on PDBBind v{}",
                self.config.variant,
                self.config.depth_protein,
                self.config.depth_ligand,
                opts.pdbbind_version
            );
            let document = fs::read_to_string(&json_path)?;
            let params: ModelParameters = serde_json::from_str(&document)?;
            self.scorer.model.restore_parameters(params)?;
            return Ok(None);
        }

        let desc_path = opts.home_dir.join(self.config.descriptor_filename());
        let split = self.scorer.load_pdbbind_descriptors(&desc_path)?;

        log::info!(
            "Training PLECscore {} with depths P{} L{} on PDBBind v{}",
            self.config.variant,
            self.config.depth_protein,
            self.config.depth_ligand,
            opts.pdbbind_version
        );

        self.scorer.model.fit(&split.train_descs, &split.train_target)?;

        let test_pred = self.scorer.model.predict(&split.test_descs)?;
        let train_pred = self.scorer.model.predict(&split.train_descs)?;
        RegressionReport::compute(&split.test_target, &test_pred).log("Test");
        RegressionReport::compute(&split.train_target, &train_pred).log("Train");
        if let Some(oob) = self.scorer.model.oob_prediction() {
            RegressionReport::compute(&split.train_target, oob).log("OOB");
        }

        let artifact_path = opts.artifact_path.clone().unwrap_or_else(|| {
            opts.home_dir
                .join(self.config.artifact_filename(opts.pdbbind_version))
        });
        self.save(&artifact_path)?;
        Ok(Some(artifact_path))
    }

    /// Export the variant-appropriate parameter document as indented JSON.
    /// Trains (slow or fast path) first when the model is untrained.
    pub fn gen_json(&mut self, home_dir: &Path, pdbbind_version: u32) -> Result<PathBuf> {
        if !self.is_fitted() {
            self.train(&TrainOptions {
                home_dir: home_dir.to_path_buf(),
                artifact_path: None,
                pdbbind_version,
                ignore_json: false,
            })?;
        }

        let params = self.scorer.model.export_parameters()?;
        let json_path = home_dir.join(self.config.json_filename(pdbbind_version));
        fs::create_dir_all(home_dir)?;
        fs::write(&json_path, serde_json::to_string_pretty(&params)?)?;
        log::info!("Wrote parameter document to {}", json_path.display());
        Ok(json_path)
    }

    /// Snapshot the whole adapter as an opaque artifact
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = bincode::serialize(self).map_err(|e| ScoreError::Artifact(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)?;
        log::info!("Saved {} artifact to {}", self.score_title(), path.display());
        Ok(())
    }

    /// Load factory. Probes the explicit path, then the deterministic
    /// artifact name inside `home_dir`; when neither exists, trains a fresh
    /// adapter through the full slow path and loads the artifact it wrote.
    pub fn load(opts: LoadOptions) -> Result<Self> {
        let candidate = match &opts.path {
            Some(path) => path.clone(),
            None => opts
                .home_dir
                .join(opts.to_config().artifact_filename(opts.pdbbind_version)),
        };

        if candidate.is_file() {
            return Self::load_artifact(&candidate);
        }

        log::info!("No artifact at {}, training a new scoring function", candidate.display());
        let mut fresh = Self::new(opts.to_config())?;
        let trained_path = fresh
            .train(&TrainOptions {
                home_dir: opts.home_dir.clone(),
                artifact_path: opts.path.clone(),
                pdbbind_version: opts.pdbbind_version,
                ignore_json: true,
            })?
            .ok_or_else(|| {
                ScoreError::Artifact("slow-path training produced no artifact".to_string())
            })?;
        Self::load_artifact(&trained_path)
    }

    fn load_artifact(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        let loaded: Self =
            bincode::deserialize(&data).map_err(|e| ScoreError::Artifact(e.to_string()))?;
        log::info!("Loaded {} from {}", loaded.score_title(), path.display());
        Ok(loaded)
    }
}
