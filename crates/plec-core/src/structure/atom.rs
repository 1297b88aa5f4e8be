//! Atom representation shared by proteins and ligands.

use serde::{Deserialize, Serialize};

/// Residue names treated as water.
const WATER_RESIDUES: [&str; 4] = ["HOH", "WAT", "SOL", "DOD"];

/// A single atom with the fields the fingerprint layer needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Atom {
    /// Atom serial number (as parsed; 1-based in most formats)
    pub serial: u32,

    /// Atom name (e.g., "CA", "CB", "N1")
    pub name: String,

    /// Residue name (e.g., "ALA", "HOH", "LIG")
    pub residue_name: String,

    /// Residue sequence number
    pub residue_seq: i32,

    /// Chain identifier (' ' when the format carries none)
    pub chain_id: char,

    /// Element symbol, upper-cased (e.g., "C", "N", "CL")
    pub element: String,

    /// 3D coordinates [x, y, z] in Angstroms
    pub coord: [f64; 3],

    /// Whether this came from a HETATM record
    pub is_hetatm: bool,
}

impl Atom {
    /// Create a new atom, normalizing residue and element casing.
    pub fn new(
        serial: u32,
        name: String,
        residue_name: String,
        residue_seq: i32,
        chain_id: char,
        element: String,
        coord: [f64; 3],
        is_hetatm: bool,
    ) -> Self {
        Self {
            serial,
            name,
            residue_name: residue_name.to_ascii_uppercase(),
            residue_seq,
            chain_id,
            element: element.to_ascii_uppercase(),
            coord,
            is_hetatm,
        }
    }

    /// Check if this is a heavy atom (non-hydrogen)
    pub fn is_heavy(&self) -> bool {
        self.element != "H" && self.element != "D"
    }

    /// Check if this atom belongs to a water molecule
    pub fn is_water(&self) -> bool {
        WATER_RESIDUES.contains(&self.residue_name.as_str())
    }

    /// Distance to another atom
    pub fn distance_to(&self, other: &Atom) -> f64 {
        super::distance(&self.coord, &other.coord)
    }

    /// Distance squared (more efficient when comparing distances)
    pub fn distance_squared_to(&self, other: &Atom) -> f64 {
        super::distance_squared(&self.coord, &other.coord)
    }

    /// Covalent radius for bond inference
    pub fn covalent_radius(&self) -> f64 {
        super::covalent_radius(&self.element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_creation() {
        let atom = Atom::new(
            1,
            "CA".to_string(),
            "ala".to_string(),
            1,
            'A',
            "c".to_string(),
            [0.0, 0.0, 0.0],
            false,
        );

        assert_eq!(atom.residue_name, "ALA");
        assert_eq!(atom.element, "C");
        assert!(atom.is_heavy());
        assert!(!atom.is_water());
    }

    #[test]
    fn test_water_detection() {
        let atom = Atom::new(
            7,
            "O".to_string(),
            "HOH".to_string(),
            201,
            'A',
            "O".to_string(),
            [1.0, 1.0, 1.0],
            true,
        );
        assert!(atom.is_water());
    }

    #[test]
    fn test_hydrogen_is_not_heavy() {
        let atom = Atom::new(
            2,
            "H1".to_string(),
            "LIG".to_string(),
            1,
            ' ',
            "H".to_string(),
            [0.0, 0.0, 0.0],
            true,
        );
        assert!(!atom.is_heavy());
    }
}
