//! Generic scorer base: a descriptor generator paired with a model under
//! one prediction/persistence contract.
//!
//! The adapter in [`crate::plecscore`] composes this base; nothing here
//! knows about variants or deterministic filenames.

use crate::config::PlecConfig;
use crate::dataset::{
    BenchmarkEntry, DescriptorRow, DescriptorTable, PdbBindSource, Partition, TrainTestSplit,
};
use crate::models::Model;
use crate::parallel::run_in_pool;
use crate::{Result, ScoreError};
use plec_core::{plec, Molecule, PlecParams, SparseVector};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// The fingerprint function partially bound to its hyperparameters, plus an
/// optional protein reference to score ligands against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlecDescriptor {
    pub params: PlecParams,
    pub protein: Option<Molecule>,
}

impl PlecDescriptor {
    /// Bind fingerprint parameters from a scorer configuration, loading the
    /// protein reference when one is configured.
    pub fn from_config(config: &PlecConfig) -> Result<Self> {
        let params = PlecParams {
            depth_ligand: config.depth_ligand,
            depth_protein: config.depth_protein,
            size: config.size,
            count_bits: true,
            ignore_hoh: true,
        };
        let protein = match &config.protein {
            Some(path) => Some(Molecule::from_pdb_file(path)?),
            None => None,
        };
        Ok(Self { params, protein })
    }

    /// Compute the descriptor for a protein-ligand pair. Falls back to the
    /// bound protein reference when no protein is passed.
    pub fn compute(&self, protein: Option<&Molecule>, ligand: &Molecule) -> Result<SparseVector> {
        let protein = protein.or(self.protein.as_ref()).ok_or_else(|| {
            ScoreError::Dataset(
                "no protein structure given and none bound in the descriptor".to_string(),
            )
        })?;
        Ok(plec(protein, ligand, &self.params))
    }
}

/// A feature extractor and a model under one training/persistence contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scorer {
    pub score_title: String,
    pub descriptor: PlecDescriptor,
    pub model: Model,
}

impl Scorer {
    pub fn new(score_title: String, descriptor: PlecDescriptor, model: Model) -> Self {
        Self {
            score_title,
            descriptor,
            model,
        }
    }

    /// Predict the binding affinity of one protein-ligand pair
    pub fn predict_pair(&self, protein: &Molecule, ligand: &Molecule) -> Result<f64> {
        let desc = self.descriptor.compute(Some(protein), ligand)?;
        Ok(self.model.predict(std::slice::from_ref(&desc))?[0])
    }

    /// Predict a ligand against the bound protein reference
    pub fn predict_ligand(&self, ligand: &Molecule) -> Result<f64> {
        let desc = self.descriptor.compute(None, ligand)?;
        Ok(self.model.predict(std::slice::from_ref(&desc))?[0])
    }

    /// Walk the benchmark and write the descriptor CSV.
    ///
    /// Entries are processed in parallel under the `n_jobs` hint; entries
    /// whose structures fail to parse are skipped with a warning.
    pub fn gen_pdbbind_descriptors(
        &self,
        source: &PdbBindSource,
        csv_path: &Path,
        n_jobs: i32,
    ) -> Result<()> {
        let entries = source.entries()?;
        log::info!(
            "Generating descriptors for {} benchmark entries into {}",
            entries.len(),
            csv_path.display()
        );

        let params = &self.descriptor.params;
        let computed: Vec<Option<DescriptorRow>> = run_in_pool(n_jobs, || {
            use rayon::prelude::*;
            entries
                .par_iter()
                .map(|entry| match descriptor_row(entry, params) {
                    Ok(row) => Some(row),
                    Err(e) => {
                        log::warn!("Skipping {}: {}", entry.pdb_id, e);
                        None
                    }
                })
                .collect()
        })?;

        let mut table = DescriptorTable::new(params.size);
        table.rows.extend(computed.into_iter().flatten());
        if table.rows.is_empty() {
            return Err(ScoreError::Dataset(
                "no benchmark entry produced a descriptor".to_string(),
            ));
        }

        if let Some(parent) = csv_path.parent() {
            fs::create_dir_all(parent)?;
        }
        table.write_csv(csv_path)?;
        log::info!("Wrote {} descriptor rows", table.rows.len());
        Ok(())
    }

    /// Load a descriptor CSV and split per the benchmark partition labels
    pub fn load_pdbbind_descriptors(&self, csv_path: &Path) -> Result<TrainTestSplit> {
        let table = DescriptorTable::read_csv(csv_path, self.descriptor.params.size)?;
        log::info!(
            "Loaded {} descriptor rows from {}",
            table.rows.len(),
            csv_path.display()
        );
        Ok(table.split(&[Partition::General, Partition::Refined]))
    }

    /// Snapshot the whole scorer as an opaque artifact
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = bincode::serialize(self).map_err(|e| ScoreError::Artifact(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)?;
        log::info!("Saved scorer artifact to {}", path.display());
        Ok(())
    }

    /// Restore a scorer snapshot written by [`Scorer::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        bincode::deserialize(&data).map_err(|e| ScoreError::Artifact(e.to_string()))
    }
}

fn descriptor_row(entry: &BenchmarkEntry, params: &PlecParams) -> Result<DescriptorRow> {
    let protein = Molecule::from_pdb_file(&entry.protein_path)?;
    let ligand = match entry
        .ligand_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
    {
        "mol2" => Molecule::from_mol2_file(&entry.ligand_path)?,
        "sdf" => Molecule::from_sdf_file(&entry.ligand_path)?,
        other => {
            return Err(ScoreError::Dataset(format!(
                "unsupported ligand format: {other}"
            )))
        }
    };

    Ok(DescriptorRow {
        pdb_id: entry.pdb_id.clone(),
        partition: entry.partition,
        target: entry.affinity,
        descriptor: plec(&protein, &ligand, params),
    })
}
