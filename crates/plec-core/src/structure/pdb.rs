//! PDB parsing with covalent bond inference.
//!
//! PDB files carry no bond records for the polymer, so bonds are inferred
//! from inter-atomic distances against summed covalent radii.

use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::{covalent_radius, distance_squared, Atom, Molecule};

/// Slack added to the sum of covalent radii when inferring bonds (Å).
const BOND_TOLERANCE: f64 = 0.45;

/// Minimum plausible bond length (Å); closer pairs are overlapping records.
const MIN_BOND_LENGTH: f64 = 0.4;

/// Options controlling how PDB files are parsed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdbParseOptions {
    /// Include HETATM records (waters, ions, cofactors)
    pub include_hetatm: bool,
    /// Keep alternate location records (B, C, ...). If false, only blank/A altLoc are used
    pub keep_alternate_locations: bool,
}

impl Default for PdbParseOptions {
    fn default() -> Self {
        Self {
            include_hetatm: true,
            keep_alternate_locations: false,
        }
    }
}

impl Molecule {
    /// Parse a PDB file from disk with default options
    pub fn from_pdb_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_pdb_str(&contents)
    }

    /// Parse a PDB structure from an in-memory string with default options
    pub fn from_pdb_str(contents: &str) -> Result<Self> {
        Self::from_pdb_str_with_options(contents, PdbParseOptions::default())
    }

    /// Parse a PDB structure with custom options. Only the first model is
    /// read; bonds are inferred afterwards.
    pub fn from_pdb_str_with_options(contents: &str, options: PdbParseOptions) -> Result<Self> {
        let mut atoms = Vec::new();

        for line in contents.lines() {
            if line.starts_with("ENDMDL") {
                break;
            }

            let record = line.get(0..6).unwrap_or("").trim();
            if record != "ATOM" && record != "HETATM" {
                continue;
            }

            let is_hetatm = record == "HETATM";
            if is_hetatm && !options.include_hetatm {
                continue;
            }

            let alt_loc = line.get(16..17).and_then(extract_char);
            if !options.keep_alternate_locations && !matches!(alt_loc, None | Some('A')) {
                continue;
            }

            atoms.push(parse_atom_line(line, is_hetatm)?);
        }

        if atoms.is_empty() {
            return Err(CoreError::Parse(
                "no ATOM/HETATM records found in PDB input".to_string(),
            ));
        }

        let bonds = infer_bonds(&atoms);
        log::debug!(
            "Parsed PDB structure: {} atoms, {} inferred bonds",
            atoms.len(),
            bonds.len()
        );

        Self::from_parts(atoms, bonds)
    }
}

/// Infer covalent bonds by distance: two atoms bond when their separation is
/// within the summed covalent radii plus tolerance. Waters never bond to
/// non-water atoms.
fn infer_bonds(atoms: &[Atom]) -> Vec<[usize; 2]> {
    let mut bonds = Vec::new();

    for i in 0..atoms.len() {
        for j in (i + 1)..atoms.len() {
            let a = &atoms[i];
            let b = &atoms[j];

            if a.is_water() != b.is_water() {
                continue;
            }

            let max_len = covalent_radius(&a.element) + covalent_radius(&b.element)
                + BOND_TOLERANCE;
            let d2 = distance_squared(&a.coord, &b.coord);
            if d2 <= max_len * max_len && d2 >= MIN_BOND_LENGTH * MIN_BOND_LENGTH {
                bonds.push([i, j]);
            }
        }
    }

    bonds
}

fn parse_atom_line(line: &str, is_hetatm: bool) -> Result<Atom> {
    let serial = parse_u32_field(line, 6..11)
        .ok_or_else(|| CoreError::Parse(format!("invalid atom serial in line: {line}")))?;

    let name = line
        .get(12..16)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CoreError::Parse(format!("missing atom name in line: {line}")))?
        .to_string();

    let residue_name = line
        .get(17..20)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CoreError::Parse(format!("missing residue name in line: {line}")))?
        .to_string();

    let chain_id = line.get(21..22).and_then(extract_char).unwrap_or('A');
    let residue_seq = parse_i32_field(line, 22..26).unwrap_or(0);

    let x = parse_f64_field(line, 30..38)
        .ok_or_else(|| CoreError::Parse(format!("missing X coordinate in line: {line}")))?;
    let y = parse_f64_field(line, 38..46)
        .ok_or_else(|| CoreError::Parse(format!("missing Y coordinate in line: {line}")))?;
    let z = parse_f64_field(line, 46..54)
        .ok_or_else(|| CoreError::Parse(format!("missing Z coordinate in line: {line}")))?;

    let element_field = line.get(76..78).map(str::trim).unwrap_or("");
    let element = resolve_element(element_field, &name);

    Ok(Atom::new(
        serial,
        name,
        residue_name,
        residue_seq,
        chain_id,
        element,
        [x, y, z],
        is_hetatm,
    ))
}

fn parse_f64_field(line: &str, range: std::ops::Range<usize>) -> Option<f64> {
    line.get(range)?.trim().parse::<f64>().ok()
}

fn parse_i32_field(line: &str, range: std::ops::Range<usize>) -> Option<i32> {
    line.get(range)?.trim().parse::<i32>().ok()
}

fn parse_u32_field(line: &str, range: std::ops::Range<usize>) -> Option<u32> {
    line.get(range)?.trim().parse::<u32>().ok()
}

fn extract_char(slice: &str) -> Option<char> {
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        None
    } else {
        trimmed.chars().next()
    }
}

/// Element from PDB columns 77-78, falling back to the leading letters of
/// the atom name.
fn resolve_element(element_field: &str, atom_name: &str) -> String {
    if !element_field.is_empty() {
        return element_field.to_ascii_uppercase();
    }

    let letters: String = atom_name
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(1)
        .collect();

    letters.to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdb_line(
        record: &str,
        serial: u32,
        name: &str,
        alt_loc: Option<char>,
        res_name: &str,
        chain_id: char,
        res_seq: i32,
        coords: (f64, f64, f64),
        element: &str,
    ) -> String {
        format!(
            "{:<6}{:>5} {:<4}{:1}{:<3} {:1}{:>4}{:1}   {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}",
            record,
            serial,
            name,
            alt_loc.unwrap_or(' '),
            res_name,
            chain_id,
            res_seq,
            "",
            coords.0,
            coords.1,
            coords.2,
            1.00,
            20.00,
            element
        )
    }

    fn test_pdb_string() -> String {
        let mut lines = Vec::new();
        lines.push("HEADER    TEST STRUCTURE".to_string());
        // A peptide-bond-length N-CA pair plus a detached water
        lines.push(pdb_line("ATOM", 1, "N", None, "ALA", 'A', 1, (0.0, 0.0, 0.0), "N"));
        lines.push(pdb_line("ATOM", 2, "CA", None, "ALA", 'A', 1, (1.46, 0.0, 0.0), "C"));
        lines.push(pdb_line("ATOM", 3, "C", None, "ALA", 'A', 1, (2.0, 1.4, 0.0), "C"));
        lines.push(pdb_line("ATOM", 4, "CB", Some('A'), "ALA", 'A', 1, (1.9, -1.3, 0.6), "C"));
        lines.push(pdb_line("ATOM", 5, "CB", Some('B'), "ALA", 'A', 1, (2.0, -1.3, 0.7), "C"));
        lines.push(pdb_line("HETATM", 6, "O", None, "HOH", 'A', 201, (1.5, 0.0, 1.2), "O"));
        lines.push("END".to_string());
        lines.join("\n")
    }

    #[test]
    fn parses_atoms_and_skips_alt_locations() {
        let mol = Molecule::from_pdb_str(&test_pdb_string()).expect("parse failed");
        assert_eq!(mol.atom_count(), 5); // altLoc B is skipped by default
        assert_eq!(mol.atoms[0].element, "N");
        assert!(mol.atoms[4].is_water());
    }

    #[test]
    fn infers_backbone_bonds_but_not_water_contacts() {
        let mol = Molecule::from_pdb_str(&test_pdb_string()).expect("parse failed");
        // N-CA at 1.46 Å must bond
        assert!(mol.neighbors(0).contains(&1));
        // the water oxygen sits 1.9 Å from CA but must stay unbonded
        let water_idx = 4;
        assert!(mol.neighbors(water_idx).is_empty());
    }

    #[test]
    fn can_exclude_hetatm_records() {
        let options = PdbParseOptions {
            include_hetatm: false,
            ..Default::default()
        };
        let mol = Molecule::from_pdb_str_with_options(&test_pdb_string(), options)
            .expect("parse failed");
        assert_eq!(mol.atom_count(), 4);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(Molecule::from_pdb_str("HEADER    EMPTY\nEND\n").is_err());
    }
}
