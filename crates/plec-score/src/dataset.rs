//! PDBBind benchmark access and the descriptor CSV table.
//!
//! The benchmark owns its partition labels: `general` and `refined` entries
//! train, `core` entries are the held-out test set, and core membership
//! overrides the other partitions. Index files are probed at the layouts the
//! published releases use; entries with unreadable structures are skipped
//! with a warning rather than aborting a whole generation run.

use crate::{Result, ScoreError};
use plec_core::SparseVector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Benchmark partition labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Partition {
    #[serde(rename = "general")]
    General,
    #[serde(rename = "refined")]
    Refined,
    #[serde(rename = "core")]
    Core,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::General => "general",
            Partition::Refined => "refined",
            Partition::Core => "core",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Partition {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "general" => Ok(Partition::General),
            "refined" => Ok(Partition::Refined),
            "core" => Ok(Partition::Core),
            other => Err(ScoreError::Dataset(format!(
                "unknown benchmark partition: {other}"
            ))),
        }
    }
}

/// A PDBBind installation: root directory plus the versions to read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdbBindSource {
    pub root_dir: PathBuf,
    pub versions: Vec<u32>,
}

/// One benchmark complex with resolved structure paths.
#[derive(Debug, Clone)]
pub struct BenchmarkEntry {
    pub pdb_id: String,
    pub partition: Partition,
    /// pKd/pKi binding affinity from the index
    pub affinity: f64,
    pub protein_path: PathBuf,
    pub ligand_path: PathBuf,
}

impl PdbBindSource {
    pub fn new(root_dir: impl Into<PathBuf>, versions: &[u32]) -> Self {
        Self {
            root_dir: root_dir.into(),
            versions: versions.to_vec(),
        }
    }

    /// Read all index files and resolve structure paths.
    ///
    /// Later versions and the core partition win when a pdbid appears more
    /// than once.
    pub fn entries(&self) -> Result<Vec<BenchmarkEntry>> {
        let mut labeled: HashMap<String, (f64, Partition, u32)> = HashMap::new();

        for &version in &self.versions {
            for partition in [Partition::General, Partition::Refined, Partition::Core] {
                let Some(index_path) = self.find_index(version, partition) else {
                    log::debug!(
                        "No {} index for PDBBind v{} under {}",
                        partition,
                        version,
                        self.root_dir.display()
                    );
                    continue;
                };

                let content = fs::read_to_string(&index_path)?;
                let mut count = 0;
                for line in content.lines() {
                    if let Some((pdb_id, affinity)) = parse_index_line(line) {
                        let replace = match labeled.get(&pdb_id) {
                            // core labels override general/refined
                            Some((_, existing, _)) => {
                                partition == Partition::Core || *existing != Partition::Core
                            }
                            None => true,
                        };
                        if replace {
                            labeled.insert(pdb_id, (affinity, partition, version));
                        }
                        count += 1;
                    }
                }
                log::info!(
                    "Read {} {} entries from {}",
                    count,
                    partition,
                    index_path.display()
                );
            }
        }

        if labeled.is_empty() {
            return Err(ScoreError::Dataset(format!(
                "no benchmark index entries found under {}",
                self.root_dir.display()
            )));
        }

        let mut entries = Vec::new();
        let mut missing = 0usize;
        for (pdb_id, (affinity, partition, version)) in labeled {
            match self.resolve_structure_paths(&pdb_id, partition, version) {
                Some((protein_path, ligand_path)) => entries.push(BenchmarkEntry {
                    pdb_id,
                    partition,
                    affinity,
                    protein_path,
                    ligand_path,
                }),
                None => {
                    log::warn!("Structure files not found for {pdb_id}, skipping");
                    missing += 1;
                }
            }
        }
        if missing > 0 {
            log::warn!("{missing} benchmark entries skipped for missing files");
        }

        entries.sort_by(|a, b| a.pdb_id.cmp(&b.pdb_id));
        Ok(entries)
    }

    /// Probe the index file layouts used by published releases
    fn find_index(&self, version: u32, partition: Partition) -> Option<PathBuf> {
        let name = partition.as_str();
        let candidates = [
            self.root_dir
                .join(format!("v{version}"))
                .join("index")
                .join(format!("INDEX_{name}_data.{version}")),
            self.root_dir
                .join(format!("v{version}"))
                .join(format!("INDEX_{name}_data.{version}")),
            self.root_dir
                .join(format!("v{version}"))
                .join("index")
                .join(format!("INDEX_{name}_PL_data.{version}")),
            self.root_dir.join(format!("INDEX_{name}_data.{version}")),
        ];
        candidates.into_iter().find(|p| p.is_file())
    }

    /// Probe per-entry directory layouts for the protein and ligand files
    fn resolve_structure_paths(
        &self,
        pdb_id: &str,
        partition: Partition,
        version: u32,
    ) -> Option<(PathBuf, PathBuf)> {
        let dirs = [
            self.root_dir
                .join(format!("v{version}"))
                .join(format!("{}-set", partition.as_str()))
                .join(pdb_id),
            self.root_dir.join(format!("v{version}")).join(pdb_id),
            self.root_dir.join(pdb_id),
        ];

        for dir in &dirs {
            let protein = [
                dir.join(format!("{pdb_id}_pocket.pdb")),
                dir.join(format!("{pdb_id}_protein.pdb")),
            ]
            .into_iter()
            .find(|p| p.is_file());

            let ligand = [
                dir.join(format!("{pdb_id}_ligand.mol2")),
                dir.join(format!("{pdb_id}_ligand.sdf")),
            ]
            .into_iter()
            .find(|p| p.is_file());

            if let (Some(protein), Some(ligand)) = (protein, ligand) {
                return Some((protein, ligand));
            }
        }
        None
    }
}

/// Parse one index line: `pdbid resolution year -logKd/Ki ...`.
/// Comment lines and malformed rows yield None.
fn parse_index_line(line: &str) -> Option<(String, f64)> {
    if line.starts_with('#') {
        return None;
    }
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 4 {
        return None;
    }
    let pdb_id = parts[0].to_lowercase();
    if pdb_id.len() != 4 {
        return None;
    }
    let affinity: f64 = parts[3].parse().ok()?;
    Some((pdb_id, affinity))
}

/// One row of the descriptor table.
#[derive(Debug, Clone)]
pub struct DescriptorRow {
    pub pdb_id: String,
    pub partition: Partition,
    pub target: f64,
    pub descriptor: SparseVector,
}

/// The descriptor table backing slow-path training.
///
/// CSV layout: header `pdbid,set,act,fp` where `fp` is the sparse vector as
/// space-separated `index:count` pairs at the fixed logical width.
#[derive(Debug, Clone)]
pub struct DescriptorTable {
    pub size: u32,
    pub rows: Vec<DescriptorRow>,
}

impl DescriptorTable {
    pub fn new(size: u32) -> Self {
        Self {
            size,
            rows: Vec::new(),
        }
    }

    /// Write the table as CSV
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_writer(File::create(path)?);
        writer.write_record(["pdbid", "set", "act", "fp"])?;
        for row in &self.rows {
            let target = row.target.to_string();
            let fp = encode_fp(&row.descriptor);
            writer.write_record([
                row.pdb_id.as_str(),
                row.partition.as_str(),
                target.as_str(),
                fp.as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read a table written by [`DescriptorTable::write_csv`]. The logical
    /// width is supplied by the caller (it is encoded in the file name).
    pub fn read_csv(path: &Path, size: u32) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.len() < 4 {
                return Err(ScoreError::Dataset(format!(
                    "descriptor row has {} fields, expected 4",
                    record.len()
                )));
            }
            let pdb_id = record[0].to_string();
            let partition: Partition = record[1].parse()?;
            let target: f64 = record[2]
                .parse()
                .map_err(|_| ScoreError::Dataset(format!("bad target value: {}", &record[2])))?;
            let descriptor = decode_fp(&record[3], size)?;
            rows.push(DescriptorRow {
                pdb_id,
                partition,
                target,
                descriptor,
            });
        }

        Ok(Self { size, rows })
    }

    /// Split into (train, test) descriptor/target pairs. Train collects the
    /// given partitions; test is always the core partition.
    pub fn split(&self, train: &[Partition]) -> TrainTestSplit {
        let mut split = TrainTestSplit::default();
        for row in &self.rows {
            if row.partition == Partition::Core {
                split.test_descs.push(row.descriptor.clone());
                split.test_target.push(row.target);
            } else if train.contains(&row.partition) {
                split.train_descs.push(row.descriptor.clone());
                split.train_target.push(row.target);
            }
        }
        split
    }
}

/// Descriptor matrices and targets for one training run.
#[derive(Debug, Clone, Default)]
pub struct TrainTestSplit {
    pub train_descs: Vec<SparseVector>,
    pub train_target: Vec<f64>,
    pub test_descs: Vec<SparseVector>,
    pub test_target: Vec<f64>,
}

fn encode_fp(descriptor: &SparseVector) -> String {
    descriptor
        .iter()
        .map(|(idx, count)| format!("{idx}:{count}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_fp(field: &str, size: u32) -> Result<SparseVector> {
    let mut pairs = Vec::new();
    for token in field.split_whitespace() {
        let (idx, count) = token
            .split_once(':')
            .ok_or_else(|| ScoreError::Dataset(format!("bad fp token: {token}")))?;
        let idx: u32 = idx
            .parse()
            .map_err(|_| ScoreError::Dataset(format!("bad fp index: {token}")))?;
        let count: f64 = count
            .parse()
            .map_err(|_| ScoreError::Dataset(format!("bad fp count: {token}")))?;
        if idx >= size {
            return Err(ScoreError::Dataset(format!(
                "fp index {idx} out of range for size {size}"
            )));
        }
        pairs.push((idx, count));
    }
    Ok(SparseVector::from_pairs(size, pairs))
}
