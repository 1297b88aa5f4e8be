//! Scorer configuration and deterministic artifact naming.

use crate::ScoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// The closed set of regressor variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelVariant {
    #[serde(rename = "linear")]
    Linear,
    #[serde(rename = "nn")]
    NeuralNet,
    #[serde(rename = "rf")]
    RandomForest,
}

impl ModelVariant {
    /// All supported variants
    pub const ALL: [ModelVariant; 3] = [
        ModelVariant::Linear,
        ModelVariant::NeuralNet,
        ModelVariant::RandomForest,
    ];

    /// Canonical string form used in filenames and titles
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelVariant::Linear => "linear",
            ModelVariant::NeuralNet => "nn",
            ModelVariant::RandomForest => "rf",
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelVariant {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(ModelVariant::Linear),
            "nn" => Ok(ModelVariant::NeuralNet),
            "rf" => Ok(ModelVariant::RandomForest),
            other => Err(ScoreError::InvalidVariant(other.to_string())),
        }
    }
}

/// Immutable scorer configuration. Set once at construction; every
/// operation that touches the filesystem takes its directory explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlecConfig {
    /// Optional protein reference structure to bind into the descriptor
    pub protein: Option<PathBuf>,
    /// Parallelism hint; <= 0 means all available cores
    pub n_jobs: i32,
    /// Regressor variant
    pub variant: ModelVariant,
    /// Protein environment depth
    pub depth_protein: usize,
    /// Ligand environment depth
    pub depth_ligand: usize,
    /// Fingerprint bit length
    pub size: u32,
}

impl Default for PlecConfig {
    fn default() -> Self {
        Self {
            protein: None,
            n_jobs: -1,
            variant: ModelVariant::Linear,
            depth_protein: 5,
            depth_ligand: 1,
            size: 65536,
        }
    }
}

impl PlecConfig {
    /// Human-readable score title encoding variant and depths
    pub fn score_title(&self) -> String {
        format!(
            "PLEC{}_p{}_l{}",
            self.variant.as_str(),
            self.depth_protein,
            self.depth_ligand
        )
    }

    /// Descriptor CSV filename for these depths and bit length
    pub fn descriptor_filename(&self) -> String {
        format!(
            "plecscore_descs_p{}_l{}_s{}.csv",
            self.depth_protein, self.depth_ligand, self.size
        )
    }

    /// Parameter document filename for a benchmark version
    pub fn json_filename(&self, pdbbind_version: u32) -> String {
        format!(
            "plecscore_{}_p{}_l{}_s{}_pdbbind{}.json",
            self.variant.as_str(),
            self.depth_protein,
            self.depth_ligand,
            self.size,
            pdbbind_version
        )
    }

    /// Opaque artifact filename for a benchmark version
    pub fn artifact_filename(&self, pdbbind_version: u32) -> String {
        format!(
            "PLEC{}_p{}_l{}_pdbbind{}_s{}.bin",
            self.variant.as_str(),
            self.depth_protein,
            self.depth_ligand,
            pdbbind_version,
            self.size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_round_trips_through_strings() {
        for variant in ModelVariant::ALL {
            assert_eq!(variant.as_str().parse::<ModelVariant>().unwrap(), variant);
        }
    }

    #[test]
    fn unknown_variant_names_the_offending_value() {
        let err = "xgboost".parse::<ModelVariant>().unwrap_err();
        assert!(matches!(&err, ScoreError::InvalidVariant(v) if v == "xgboost"));
        assert!(err.to_string().contains("xgboost"));
    }

    #[test]
    fn filenames_are_deterministic() {
        let config = PlecConfig {
            variant: ModelVariant::Linear,
            depth_protein: 5,
            depth_ligand: 1,
            size: 65536,
            ..Default::default()
        };

        assert_eq!(
            config.json_filename(2016),
            "plecscore_linear_p5_l1_s65536_pdbbind2016.json"
        );
        assert_eq!(
            config.descriptor_filename(),
            "plecscore_descs_p5_l1_s65536.csv"
        );
        assert_eq!(
            config.artifact_filename(2016),
            "PLEClinear_p5_l1_pdbbind2016_s65536.bin"
        );
    }

    #[test]
    fn title_embeds_variant_and_depths() {
        let config = PlecConfig {
            variant: ModelVariant::RandomForest,
            depth_protein: 3,
            depth_ligand: 2,
            ..Default::default()
        };
        assert_eq!(config.score_title(), "PLECrf_p3_l2");
    }
}
