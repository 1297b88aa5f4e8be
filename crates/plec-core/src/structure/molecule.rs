//! Shared molecule representation with a covalent bond graph, plus Mol2 and
//! SDF (V2000) parsing for ligand files.

use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::Atom;

/// A molecule: ordered atoms plus covalent bonds and the adjacency table
/// derived from them. Used for both proteins and ligands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Molecule {
    /// All atoms (ordered as parsed)
    pub atoms: Vec<Atom>,
    /// Covalent bonds as index pairs into `atoms`
    pub bonds: Vec<[usize; 2]>,
    /// Per-atom neighbor indices (symmetric)
    adjacency: Vec<Vec<usize>>,
}

impl Molecule {
    /// Build a molecule from atoms and bonds, validating bond indices.
    pub fn from_parts(atoms: Vec<Atom>, bonds: Vec<[usize; 2]>) -> Result<Self> {
        if atoms.is_empty() {
            return Err(CoreError::Parse("molecule has no atoms".to_string()));
        }

        let mut adjacency = vec![Vec::new(); atoms.len()];
        for bond in &bonds {
            let [a, b] = *bond;
            if a >= atoms.len() || b >= atoms.len() || a == b {
                return Err(CoreError::Parse(format!(
                    "bond references invalid atom indices {a}-{b} (atom count {})",
                    atoms.len()
                )));
            }
            adjacency[a].push(b);
            adjacency[b].push(a);
        }

        Ok(Self {
            atoms,
            bonds,
            adjacency,
        })
    }

    /// Number of atoms in the molecule
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Covalent neighbors of atom `i`
    pub fn neighbors(&self, i: usize) -> &[usize] {
        &self.adjacency[i]
    }

    /// Number of heavy (non-hydrogen) covalent neighbors of atom `i`
    pub fn heavy_degree(&self, i: usize) -> usize {
        self.adjacency[i]
            .iter()
            .filter(|&&j| self.atoms[j].is_heavy())
            .count()
    }

    /// Number of hydrogens bonded to atom `i`
    pub fn hydrogen_count(&self, i: usize) -> usize {
        self.adjacency[i]
            .iter()
            .filter(|&&j| !self.atoms[j].is_heavy())
            .count()
    }

    /// Iterate over heavy atoms with their indices
    pub fn heavy_atoms(&self) -> impl Iterator<Item = (usize, &Atom)> {
        self.atoms
            .iter()
            .enumerate()
            .filter(|(_, atom)| atom.is_heavy())
    }

    /// Parse a Mol2 file from disk
    pub fn from_mol2_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_mol2_str(&contents)
    }

    /// Parse TRIPOS Mol2 content (ATOM and BOND blocks)
    pub fn from_mol2_str(contents: &str) -> Result<Self> {
        #[derive(PartialEq)]
        enum Section {
            Other,
            Atoms,
            Bonds,
        }

        let mut section = Section::Other;
        let mut atoms = Vec::new();
        let mut bonds = Vec::new();

        for line in contents.lines() {
            if line.starts_with("@<TRIPOS>") {
                section = match line.trim() {
                    "@<TRIPOS>ATOM" => Section::Atoms,
                    "@<TRIPOS>BOND" => Section::Bonds,
                    _ => Section::Other,
                };
                continue;
            }

            match section {
                Section::Atoms => {
                    let parts: Vec<&str> = line.split_whitespace().collect();
                    if parts.len() < 6 {
                        continue;
                    }
                    let serial: u32 = parts[0]
                        .parse()
                        .map_err(|_| CoreError::Parse(format!("bad mol2 atom id: {line}")))?;
                    let name = parts[1].to_string();
                    let x: f64 = parse_coord(parts[2], line)?;
                    let y: f64 = parse_coord(parts[3], line)?;
                    let z: f64 = parse_coord(parts[4], line)?;
                    // SYBYL atom type, e.g. "C.3" or "N.ar"
                    let element = parts[5]
                        .split('.')
                        .next()
                        .unwrap_or(parts[5])
                        .to_string();
                    let residue_seq: i32 =
                        parts.get(6).and_then(|s| s.parse().ok()).unwrap_or(1);
                    let residue_name = parts
                        .get(7)
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "LIG".to_string());

                    atoms.push(Atom::new(
                        serial,
                        name,
                        residue_name,
                        residue_seq,
                        ' ',
                        element,
                        [x, y, z],
                        true,
                    ));
                }
                Section::Bonds => {
                    let parts: Vec<&str> = line.split_whitespace().collect();
                    if parts.len() < 3 {
                        continue;
                    }
                    let a: usize = parts[1]
                        .parse()
                        .map_err(|_| CoreError::Parse(format!("bad mol2 bond: {line}")))?;
                    let b: usize = parts[2]
                        .parse()
                        .map_err(|_| CoreError::Parse(format!("bad mol2 bond: {line}")))?;
                    if a == 0 || b == 0 {
                        return Err(CoreError::Parse(format!("mol2 bonds are 1-based: {line}")));
                    }
                    bonds.push([a - 1, b - 1]);
                }
                Section::Other => {}
            }
        }

        Self::from_parts(atoms, bonds)
    }

    /// Parse an SDF file from disk (first record only)
    pub fn from_sdf_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_sdf_str(&contents)
    }

    /// Parse V2000 SDF content: counts line, atom block, bond block
    pub fn from_sdf_str(contents: &str) -> Result<Self> {
        let lines: Vec<&str> = contents.lines().collect();
        if lines.len() < 4 {
            return Err(CoreError::Parse("SDF file too short".to_string()));
        }

        let counts = lines[3];
        let n_atoms = parse_fixed_usize(counts, 0..3)
            .ok_or_else(|| CoreError::Parse(format!("bad SDF counts line: {counts}")))?;
        let n_bonds = parse_fixed_usize(counts, 3..6)
            .ok_or_else(|| CoreError::Parse(format!("bad SDF counts line: {counts}")))?;

        if lines.len() < 4 + n_atoms + n_bonds {
            return Err(CoreError::Parse(format!(
                "SDF truncated: expected {} atoms and {} bonds",
                n_atoms, n_bonds
            )));
        }

        let mut atoms = Vec::with_capacity(n_atoms);
        for (i, line) in lines[4..4 + n_atoms].iter().enumerate() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 4 {
                return Err(CoreError::Parse(format!("bad SDF atom line: {line}")));
            }
            let x: f64 = parse_coord(parts[0], line)?;
            let y: f64 = parse_coord(parts[1], line)?;
            let z: f64 = parse_coord(parts[2], line)?;
            let element = parts[3].to_string();

            atoms.push(Atom::new(
                (i + 1) as u32,
                element.clone(),
                "LIG".to_string(),
                1,
                ' ',
                element,
                [x, y, z],
                true,
            ));
        }

        let mut bonds = Vec::with_capacity(n_bonds);
        for line in &lines[4 + n_atoms..4 + n_atoms + n_bonds] {
            let a = parse_fixed_usize(line, 0..3)
                .ok_or_else(|| CoreError::Parse(format!("bad SDF bond line: {line}")))?;
            let b = parse_fixed_usize(line, 3..6)
                .ok_or_else(|| CoreError::Parse(format!("bad SDF bond line: {line}")))?;
            if a == 0 || b == 0 || a > n_atoms || b > n_atoms {
                return Err(CoreError::Parse(format!(
                    "SDF bond references out-of-range atom: {line}"
                )));
            }
            bonds.push([a - 1, b - 1]);
        }

        Self::from_parts(atoms, bonds)
    }
}

fn parse_coord(field: &str, line: &str) -> Result<f64> {
    field
        .parse()
        .map_err(|_| CoreError::Parse(format!("bad coordinate in line: {line}")))
}

fn parse_fixed_usize(line: &str, range: std::ops::Range<usize>) -> Option<usize> {
    line.get(range)?.trim().parse::<usize>().ok()
}
