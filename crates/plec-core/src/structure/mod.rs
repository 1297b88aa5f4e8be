//! Protein and ligand structure representation.
//!
//! Both proteins and ligands share the [`Molecule`] type: an ordered atom
//! list plus a covalent bond graph. Proteins come from PDB files with bonds
//! inferred from covalent radii; ligands come from Mol2/SDF files that carry
//! explicit bond blocks.

mod atom;
mod molecule;
mod pdb;

pub use atom::Atom;
pub use molecule::Molecule;
pub use pdb::PdbParseOptions;

/// Euclidean distance between two coordinates.
pub fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    distance_squared(a, b).sqrt()
}

/// Squared distance (cheaper when only comparing against thresholds).
pub fn distance_squared(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}

/// Single-bond covalent radius in Angstroms (Cordero et al. values, rounded).
/// Unknown elements fall back to 0.77 (carbon-like).
pub fn covalent_radius(element: &str) -> f64 {
    match element {
        "H" => 0.31,
        "B" => 0.84,
        "C" => 0.76,
        "N" => 0.71,
        "O" => 0.66,
        "F" => 0.57,
        "NA" => 1.66,
        "MG" => 1.41,
        "P" => 1.07,
        "S" => 1.05,
        "CL" => 1.02,
        "K" => 2.03,
        "CA" => 1.76,
        "MN" => 1.39,
        "FE" => 1.32,
        "CO" => 1.26,
        "NI" => 1.24,
        "CU" => 1.32,
        "ZN" => 1.22,
        "SE" => 1.20,
        "BR" => 1.20,
        "I" => 1.39,
        _ => 0.77,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = [0.0, 0.0, 0.0];
        let b = [3.0, 4.0, 0.0];
        assert_eq!(distance(&a, &b), 5.0);
        assert_eq!(distance_squared(&a, &b), 25.0);
    }

    #[test]
    fn test_covalent_radius_lookup() {
        assert!(covalent_radius("C") > covalent_radius("O"));
        assert_eq!(covalent_radius("XX"), 0.77);
    }
}
