//! Plain mirrors of the ASE `Atoms` and pymatgen `Structure` containers.
//!
//! Lengths are in angstrom, matching both toolkits. Only properties with a direct counterpart
//! are carried over.

use super::cell;
use super::error::Error;
use crate::model::atoms::{ATYPE, Atoms, POS, Property};
use crate::model::system::System;
use crate::units;
use nalgebra::{Matrix3, Vector3};

const ASE: &str = "ase_Atoms";
const PYMATGEN: &str = "pymatgen_Structure";
const LENGTH_UNIT: &str = "angstrom";
/// ASE velocity unit: angstrom per ASE time unit.
const ASE_VELOCITY_UNIT: &str = "(eV/amu)^0.5";
const VELOCITY: &str = "velocity";

/// ASE `Atoms` counterpart.
#[derive(Debug, Clone, PartialEq)]
pub struct AseAtoms {
    pub symbols: Vec<String>,
    pub positions: Vec<Vector3<f64>>,
    /// Rows are the cell vectors.
    pub cell: Matrix3<f64>,
    pub pbc: [bool; 3],
    pub velocities: Option<Vec<Vector3<f64>>>,
}

/// pymatgen `Structure` counterpart.
#[derive(Debug, Clone, PartialEq)]
pub struct PymatgenStructure {
    /// Rows are the lattice vectors.
    pub lattice: Matrix3<f64>,
    pub species: Vec<String>,
    pub frac_coords: Vec<Vector3<f64>>,
    /// Extra per-site properties in column order.
    pub site_properties: Vec<(String, Property)>,
}

fn site_symbols(system: &System, format: &'static str) -> Result<Vec<String>, Error> {
    if system.natypes() == 0 && system.natoms() == 0 {
        return Ok(Vec::new());
    }
    let symbols = system.complete_symbols().ok_or_else(|| Error::MissingSymbols {
        format,
        atype: (1..=system.natypes() as i64)
            .find(|&t| system.symbol_of(t).is_none())
            .unwrap_or(1) as usize,
    })?;
    system
        .atoms()
        .atype()
        .iter()
        .enumerate()
        .map(|(index, &t)| {
            usize::try_from(t - 1)
                .ok()
                .and_then(|i| symbols.get(i))
                .map(|symbol| symbol.to_string())
                .ok_or_else(|| {
                    Error::inconsistent_data(
                        format,
                        None,
                        format!("atom {index} has type {t}, outside 1..={}", symbols.len()),
                    )
                })
        })
        .collect()
}

pub fn to_ase(system: &System) -> Result<AseAtoms, Error> {
    let symbols = site_symbols(system, ASE)?;
    let length = units::scale_of(LENGTH_UNIT)?;
    let origin = system.sim_box().origin();

    let velocities = match system.atoms().property(VELOCITY) {
        Some(Property::Vector(values)) => {
            let scale = units::scale_of(ASE_VELOCITY_UNIT)?;
            Some(values.iter().map(|v| v / scale).collect())
        }
        _ => None,
    };

    Ok(AseAtoms {
        symbols,
        positions: system
            .atoms()
            .pos()
            .iter()
            .map(|p| (p - origin) / length)
            .collect(),
        cell: cell::cell_rows(system.sim_box(), length),
        pbc: system.pbc,
        velocities,
    })
}

pub fn from_ase(ase: &AseAtoms) -> Result<System, Error> {
    let natoms = ase.symbols.len();
    if ase.positions.len() != natoms {
        return Err(Error::inconsistent_data(
            ASE,
            None,
            format!("{natoms} symbols but {} positions", ase.positions.len()),
        ));
    }

    let length = units::scale_of(LENGTH_UNIT)?;
    let frac = cell::fractional(&ase.cell, &ase.positions)?;
    let mut system = build_system(&ase.cell, length, &ase.symbols, &frac, ase.pbc)?;

    if let Some(velocities) = &ase.velocities {
        let scale = units::scale_of(ASE_VELOCITY_UNIT)?;
        let values: Vec<Vector3<f64>> = velocities.iter().map(|v| v * scale).collect();
        system.atoms_mut().add_property(VELOCITY, values)?;
    }
    Ok(system)
}

pub fn to_pymatgen(system: &System) -> Result<PymatgenStructure, Error> {
    let species = site_symbols(system, PYMATGEN)?;
    let length = units::scale_of(LENGTH_UNIT)?;

    let site_properties = system
        .atoms()
        .columns()
        .filter(|(name, _)| *name != ATYPE && *name != POS)
        .map(|(name, prop)| (name.to_string(), prop.clone()))
        .collect();

    Ok(PymatgenStructure {
        lattice: cell::cell_rows(system.sim_box(), length),
        species,
        frac_coords: system.atoms_scaled_positions(),
        site_properties,
    })
}

pub fn from_pymatgen(structure: &PymatgenStructure) -> Result<System, Error> {
    let natoms = structure.species.len();
    if structure.frac_coords.len() != natoms {
        return Err(Error::inconsistent_data(
            PYMATGEN,
            None,
            format!(
                "{natoms} species but {} coordinates",
                structure.frac_coords.len()
            ),
        ));
    }

    let length = units::scale_of(LENGTH_UNIT)?;
    let mut system = build_system(
        &structure.lattice,
        length,
        &structure.species,
        &structure.frac_coords,
        [true; 3],
    )?;
    for (name, prop) in &structure.site_properties {
        system.atoms_mut().add_property(name, prop.clone())?;
    }
    Ok(system)
}

/// Assigns atom types by first appearance of each symbol.
fn build_system(
    rows: &Matrix3<f64>,
    length: f64,
    symbols: &[String],
    frac: &[Vector3<f64>],
    pbc: [bool; 3],
) -> Result<System, Error> {
    let sim_box = cell::box_from_rows(&(rows * length))?;

    let mut unique: Vec<&str> = Vec::new();
    let atypes: Vec<i64> = symbols
        .iter()
        .map(|symbol| {
            let index = match unique.iter().position(|s| *s == symbol.as_str()) {
                Some(index) => index,
                None => {
                    unique.push(symbol);
                    unique.len() - 1
                }
            };
            index as i64 + 1
        })
        .collect();

    let positions = frac.iter().map(|f| sim_box.position_absolute(f)).collect();
    let atoms = Atoms::from_types_and_positions(atypes, positions)?;
    let mut system = System::new(sim_box, atoms, pbc);
    system.set_symbols(unique.into_iter().map(Some));
    Ok(system)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sim_box::SimBox;

    fn system() -> System {
        let atoms = Atoms::from_types_and_positions(
            vec![2, 1, 2],
            vec![
                Vector3::new(1.0, 1.0, 1.0),
                Vector3::new(2.0, 2.0, 2.0),
                Vector3::new(3.0, 0.0, 2.0),
            ],
        )
        .unwrap();
        System::new(SimBox::cubic(4.0).unwrap(), atoms, [true, true, false]).with_symbols(&["Cu", "Ni"])
    }

    #[test]
    fn ase_mirror_carries_symbols_per_site() {
        let ase = to_ase(&system()).unwrap();
        assert_eq!(ase.symbols, ["Ni", "Cu", "Ni"]);
        assert_eq!(ase.pbc, [true, true, false]);
        assert!((ase.cell[(0, 0)] - 4.0).abs() < 1e-12);
        assert!(ase.velocities.is_none());
    }

    #[test]
    fn ase_round_trip_renumbers_types_by_appearance() {
        let mut original = system();
        original
            .atoms_mut()
            .add_property(VELOCITY, vec![Vector3::new(0.1, 0.0, 0.0); 3])
            .unwrap();

        let loaded = from_ase(&to_ase(&original).unwrap()).unwrap();
        assert_eq!(loaded.atoms().atype(), &[1, 2, 1]);
        assert_eq!(loaded.symbol_of(1), Some("Ni"));
        assert_eq!(loaded.pbc, [true, true, false]);
        for (a, b) in loaded.atoms().pos().iter().zip(original.atoms().pos()) {
            assert!((a - b).norm() < 1e-9);
        }
        let velocity = loaded.atoms().vector(VELOCITY).unwrap();
        assert!((velocity[0] - Vector3::new(0.1, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn conversion_requires_symbols() {
        let mut system = system();
        system.set_symbols([Some("Cu"), None]);
        let err = to_ase(&system).unwrap_err();
        assert!(matches!(err, Error::MissingSymbols { atype: 2, .. }));
        assert!(matches!(
            to_pymatgen(&system).unwrap_err(),
            Error::MissingSymbols { .. }
        ));
    }

    #[test]
    fn retyped_atom_needs_a_symbol_for_its_type() {
        let mut system = system();
        assert!(system.atoms_mut().set_atype(0, 0).is_err());

        system.atoms_mut().set_atype(0, 3).unwrap();
        assert!(matches!(
            to_ase(&system).unwrap_err(),
            Error::MissingSymbols { atype: 3, .. }
        ));

        system.set_symbols([Some("Cu"), Some("Ni"), Some("Al")]);
        assert_eq!(to_ase(&system).unwrap().symbols, ["Al", "Cu", "Ni"]);
    }

    #[test]
    fn pymatgen_round_trip_keeps_site_properties() {
        let mut original = system();
        original
            .atoms_mut()
            .add_property("charge", vec![1.0, -0.5, -0.5])
            .unwrap();

        let structure = to_pymatgen(&original).unwrap();
        assert_eq!(structure.species, ["Ni", "Cu", "Ni"]);
        assert!((structure.frac_coords[1] - Vector3::new(0.5, 0.5, 0.5)).norm() < 1e-12);
        assert_eq!(structure.site_properties.len(), 1);

        let loaded = from_pymatgen(&structure).unwrap();
        assert_eq!(loaded.atoms().scalar("charge").unwrap(), &[1.0, -0.5, -0.5]);
        assert!((loaded.atoms().pos()[2] - Vector3::new(3.0, 0.0, 2.0)).norm() < 1e-9);
    }

    #[test]
    fn from_ase_rejects_length_mismatch() {
        let mut ase = to_ase(&system()).unwrap();
        ase.positions.pop();
        assert!(matches!(
            from_ase(&ase).unwrap_err(),
            Error::InconsistentData { .. }
        ));
    }
}
