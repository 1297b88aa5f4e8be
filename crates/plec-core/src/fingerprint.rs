//! PLEC protein-ligand interaction fingerprint.
//!
//! Every (ligand, protein) heavy-atom pair within the contact cutoff
//! contributes one hashed feature per combination of ligand environment
//! depth and protein environment depth. Environments are ECFP-style iterated
//! neighborhood hashes over the covalent graph; all hashing is FNV-1a so the
//! fingerprint is identical across platforms and runs.

use serde::{Deserialize, Serialize};

use crate::sparse::SparseVector;
use crate::structure::{distance_squared, Molecule};

/// Heavy-atom contact cutoff between ligand and protein (Å).
pub const CONTACT_CUTOFF: f64 = 4.5;

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// Fingerprint hyperparameters, bound once by the scorer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlecParams {
    /// Ligand environment depth
    pub depth_ligand: usize,
    /// Protein environment depth
    pub depth_protein: usize,
    /// Fingerprint bit length (fold modulus)
    pub size: u32,
    /// Keep per-index multiplicities instead of clamping to 1
    pub count_bits: bool,
    /// Exclude water molecules from protein environments and contacts
    pub ignore_hoh: bool,
}

impl Default for PlecParams {
    fn default() -> Self {
        Self {
            depth_ligand: 1,
            depth_protein: 5,
            size: 65536,
            count_bits: true,
            ignore_hoh: true,
        }
    }
}

/// Compute the PLEC fingerprint for a protein-ligand pair.
pub fn plec(protein: &Molecule, ligand: &Molecule, params: &PlecParams) -> SparseVector {
    let ligand_envs = atom_environments(ligand, params.depth_ligand, false);
    let protein_envs = atom_environments(protein, params.depth_protein, params.ignore_hoh);

    let cutoff_sq = CONTACT_CUTOFF * CONTACT_CUTOFF;
    let mut raw = Vec::new();

    for (li, latom) in ligand.heavy_atoms() {
        for (pi, patom) in protein.heavy_atoms() {
            if params.ignore_hoh && patom.is_water() {
                continue;
            }
            if distance_squared(&latom.coord, &patom.coord) > cutoff_sq {
                continue;
            }

            for lig_env in &ligand_envs[li] {
                for prot_env in &protein_envs[pi] {
                    let pair = fnv_words(&[*lig_env, *prot_env]);
                    raw.push((pair % params.size as u64) as u32);
                }
            }
        }
    }

    SparseVector::from_indices(params.size, raw, params.count_bits)
}

/// Per-atom environment identifiers for depths `0..=max_depth`.
///
/// Depth 0 hashes the atom invariants (element, heavy degree, hydrogen
/// count); depth k folds the depth k-1 identifier with the sorted depth k-1
/// identifiers of heavy covalent neighbors. Water atoms get no environments
/// when `skip_water` is set, as do hydrogens always.
fn atom_environments(mol: &Molecule, max_depth: usize, skip_water: bool) -> Vec<Vec<u64>> {
    let n = mol.atom_count();
    let mut current = vec![0u64; n];
    let mut envs: Vec<Vec<u64>> = vec![Vec::new(); n];

    let included: Vec<bool> = mol
        .atoms
        .iter()
        .map(|a| a.is_heavy() && !(skip_water && a.is_water()))
        .collect();

    for (i, atom) in mol.atoms.iter().enumerate() {
        if !included[i] {
            continue;
        }
        let mut words = vec![atom.element.len() as u64];
        words.extend(atom.element.bytes().map(u64::from));
        words.push(mol.heavy_degree(i) as u64);
        words.push(mol.hydrogen_count(i) as u64);
        current[i] = fnv_words(&words);
        envs[i].push(current[i]);
    }

    for _depth in 1..=max_depth {
        let mut next = current.clone();
        for i in 0..n {
            if !included[i] {
                continue;
            }
            let mut neighbor_ids: Vec<u64> = mol
                .neighbors(i)
                .iter()
                .copied()
                .filter(|&j| included[j])
                .map(|j| current[j])
                .collect();
            neighbor_ids.sort_unstable();

            let mut words = vec![current[i]];
            words.extend(neighbor_ids);
            next[i] = fnv_words(&words);
            envs[i].push(next[i]);
        }
        current = next;
    }

    envs
}

/// FNV-1a over little-endian u64 words.
fn fnv_words(words: &[u64]) -> u64 {
    let mut hash = FNV_OFFSET;
    for word in words {
        for byte in word.to_le_bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::Atom;

    fn atom(serial: u32, element: &str, residue: &str, coord: [f64; 3]) -> Atom {
        Atom::new(
            serial,
            element.to_string(),
            residue.to_string(),
            serial as i32,
            'A',
            element.to_string(),
            coord,
            residue == "HOH",
        )
    }

    fn toy_pair() -> (Molecule, Molecule) {
        // Three-atom "protein" chain with a water nearby
        let protein = Molecule::from_parts(
            vec![
                atom(1, "N", "ALA", [0.0, 0.0, 0.0]),
                atom(2, "C", "ALA", [1.5, 0.0, 0.0]),
                atom(3, "O", "ALA", [2.2, 1.1, 0.0]),
                atom(4, "O", "HOH", [0.5, 2.0, 0.0]),
            ],
            vec![[0, 1], [1, 2]],
        )
        .unwrap();

        // Two-atom ligand sitting in contact range
        let ligand = Molecule::from_parts(
            vec![
                atom(1, "C", "LIG", [0.5, 1.5, 1.0]),
                atom(2, "O", "LIG", [1.8, 1.8, 1.2]),
            ],
            vec![[0, 1]],
        )
        .unwrap();

        (protein, ligand)
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let (protein, ligand) = toy_pair();
        let params = PlecParams {
            size: 4096,
            ..Default::default()
        };
        let a = plec(&protein, &ligand, &params);
        let b = plec(&protein, &ligand, &params);
        assert_eq!(a, b);
        assert!(a.nnz() > 0);
    }

    #[test]
    fn water_contacts_are_ignored_by_default() {
        let (protein, ligand) = toy_pair();
        let with_water = plec(
            &protein,
            &ligand,
            &PlecParams {
                size: 4096,
                ignore_hoh: false,
                ..Default::default()
            },
        );
        let without_water = plec(
            &protein,
            &ligand,
            &PlecParams {
                size: 4096,
                ignore_hoh: true,
                ..Default::default()
            },
        );
        // the water oxygen is within contact range, so dropping it must
        // remove features
        assert!(with_water.nnz() > without_water.nnz());
    }

    #[test]
    fn size_only_refolds_indices() {
        let (protein, ligand) = toy_pair();
        let wide = plec(
            &protein,
            &ligand,
            &PlecParams {
                size: 65536,
                ..Default::default()
            },
        );
        let narrow = plec(
            &protein,
            &ligand,
            &PlecParams {
                size: 64,
                ..Default::default()
            },
        );
        let total = |v: &SparseVector| v.iter().map(|(_, c)| c).sum::<f64>();
        // folding preserves the total feature count
        assert_eq!(total(&wide), total(&narrow));
        assert!(narrow.iter().all(|(idx, _)| idx < 64));
    }

    #[test]
    fn depth_increases_feature_count() {
        let (protein, ligand) = toy_pair();
        let shallow = plec(
            &protein,
            &ligand,
            &PlecParams {
                depth_ligand: 0,
                depth_protein: 0,
                size: 4096,
                ..Default::default()
            },
        );
        let deep = plec(
            &protein,
            &ligand,
            &PlecParams {
                depth_ligand: 1,
                depth_protein: 2,
                size: 4096,
                ..Default::default()
            },
        );
        let total = |v: &SparseVector| v.iter().map(|(_, c)| c).sum::<f64>();
        assert!(total(&deep) > total(&shallow));
    }
}
