//! Molecular structures and the PLEC protein-ligand interaction fingerprint.
//!
//! This crate provides the structural primitives consumed by the scoring
//! layer in `plec-score`:
//!
//! - [`structure`]: a shared [`Molecule`] representation for proteins and
//!   ligands, parsed from PDB, Mol2 or SDF files, with a distance-inferred
//!   covalent graph
//! - [`sparse`]: fixed-width sparse count vectors
//! - [`fingerprint`]: the PLEC fingerprint, hashing protein-ligand contact
//!   environments into a sparse vector of configurable bit length
//!
//! All hashing and parsing is deterministic across platforms; nothing here
//! touches global state.

pub mod fingerprint;
pub mod sparse;
pub mod structure;

pub use fingerprint::{plec, PlecParams, CONTACT_CUTOFF};
pub use sparse::SparseVector;
pub use structure::{Atom, Molecule, PdbParseOptions};

use thiserror::Error;

/// Errors produced while reading molecular structure files.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("structure parse error: {0}")]
    Parse(String),
}

/// Result type for plec-core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
