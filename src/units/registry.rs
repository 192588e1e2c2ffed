//! Scale table translating named physical units into the working unit system.
//!
//! Every quantity stored by `atom-forge` lives in a single working unit system chosen by four
//! base units (length, mass, energy, charge). Time is derived from those so that
//! `energy = mass * length^2 / time^2` holds without extra factors, and temperature is always
//! kelvin. A [`UnitRegistry`] resolves any registered unit, or any compound expression built
//! from registered units, to the factor that maps a value in that unit into working units.

use super::error::Error;
use super::expr;
use smol_str::SmolStr;
use std::collections::HashMap;

/// Exponents of (metre, kilogram, second, coulomb, kelvin).
type Dims = [i8; 5];

const LENGTH: Dims = [1, 0, 0, 0, 0];
const MASS: Dims = [0, 1, 0, 0, 0];
const TIME: Dims = [0, 0, 1, 0, 0];
const CHARGE: Dims = [0, 0, 0, 1, 0];
const TEMPERATURE: Dims = [0, 0, 0, 0, 1];
const COUNT: Dims = [0, 0, 0, 0, 0];
const VOLUME: Dims = [3, 0, 0, 0, 0];
const ENERGY: Dims = [2, 1, -2, 0, 0];
const FORCE: Dims = [1, 1, -2, 0, 0];
const PRESSURE: Dims = [-1, 1, -2, 0, 0];
const VISCOSITY: Dims = [-1, 1, -1, 0, 0];
const POTENTIAL: Dims = [2, 1, -2, -1, 0];
const DIPOLE: Dims = [1, 0, 0, 1, 0];

pub(crate) const ANGSTROM_SI: f64 = 1e-10;
pub(crate) const AMU_SI: f64 = 1.660_539_066_60e-27;
pub(crate) const ELEMENTARY_CHARGE_SI: f64 = 1.602_176_634e-19;
pub(crate) const EV_SI: f64 = ELEMENTARY_CHARGE_SI;
const AVOGADRO: f64 = 6.022_140_76e23;
const BOHR_SI: f64 = 5.291_772_109_03e-11;
const HARTREE_SI: f64 = 4.359_744_722_207_1e-18;
const ATOMIC_TIME_SI: f64 = 2.418_884_326_585_7e-17;
const STATCOULOMB_SI: f64 = 3.335_640_951_981_52e-10;
const STATVOLT_SI: f64 = 299.792_458;
const DEBYE_SI: f64 = 3.335_640_951_981_52e-30;

struct UnitDef {
    names: &'static [&'static str],
    si: f64,
    dims: Dims,
}

const UNIT_TABLE: &[UnitDef] = &[
    UnitDef { names: &["m", "meter", "metre"], si: 1.0, dims: LENGTH },
    UnitDef { names: &["cm", "centimeter"], si: 1e-2, dims: LENGTH },
    UnitDef { names: &["mm", "millimeter"], si: 1e-3, dims: LENGTH },
    UnitDef { names: &["micrometer", "um", "micron"], si: 1e-6, dims: LENGTH },
    UnitDef { names: &["nm", "nanometer"], si: 1e-9, dims: LENGTH },
    UnitDef { names: &["angstrom", "Angstrom", "Ang", "A", "Å"], si: ANGSTROM_SI, dims: LENGTH },
    UnitDef { names: &["pm", "picometer"], si: 1e-12, dims: LENGTH },
    UnitDef { names: &["Bohr", "bohr", "a0"], si: BOHR_SI, dims: LENGTH },
    UnitDef { names: &["kg", "kilogram"], si: 1.0, dims: MASS },
    UnitDef { names: &["g", "gram"], si: 1e-3, dims: MASS },
    UnitDef { names: &["mg"], si: 1e-6, dims: MASS },
    UnitDef { names: &["pg", "picogram"], si: 1e-15, dims: MASS },
    UnitDef { names: &["ag", "attogram"], si: 1e-21, dims: MASS },
    UnitDef { names: &["amu", "u", "Da", "dalton"], si: AMU_SI, dims: MASS },
    UnitDef { names: &["mol"], si: AVOGADRO, dims: COUNT },
    UnitDef { names: &["s", "second"], si: 1.0, dims: TIME },
    UnitDef { names: &["ms"], si: 1e-3, dims: TIME },
    UnitDef { names: &["microsecond", "us"], si: 1e-6, dims: TIME },
    UnitDef { names: &["ns", "nanosecond"], si: 1e-9, dims: TIME },
    UnitDef { names: &["ps", "picosecond"], si: 1e-12, dims: TIME },
    UnitDef { names: &["fs", "femtosecond"], si: 1e-15, dims: TIME },
    UnitDef { names: &["atomic_time", "atu"], si: ATOMIC_TIME_SI, dims: TIME },
    UnitDef { names: &["C", "coulomb"], si: 1.0, dims: CHARGE },
    UnitDef { names: &["pC"], si: 1e-12, dims: CHARGE },
    UnitDef { names: &["e"], si: ELEMENTARY_CHARGE_SI, dims: CHARGE },
    UnitDef { names: &["statcoulomb", "statC", "esu"], si: STATCOULOMB_SI, dims: CHARGE },
    UnitDef { names: &["K", "kelvin"], si: 1.0, dims: TEMPERATURE },
    UnitDef { names: &["J", "joule"], si: 1.0, dims: ENERGY },
    UnitDef { names: &["kJ"], si: 1e3, dims: ENERGY },
    UnitDef { names: &["eV"], si: EV_SI, dims: ENERGY },
    UnitDef { names: &["meV"], si: 1e-3 * EV_SI, dims: ENERGY },
    UnitDef { names: &["erg"], si: 1e-7, dims: ENERGY },
    UnitDef { names: &["cal"], si: 4.184, dims: ENERGY },
    UnitDef { names: &["kcal"], si: 4184.0, dims: ENERGY },
    UnitDef { names: &["Hartree", "hartree", "Ha"], si: HARTREE_SI, dims: ENERGY },
    UnitDef { names: &["Ry", "Rydberg"], si: HARTREE_SI / 2.0, dims: ENERGY },
    UnitDef { names: &["N", "newton"], si: 1.0, dims: FORCE },
    UnitDef { names: &["nN"], si: 1e-9, dims: FORCE },
    UnitDef { names: &["dyne"], si: 1e-5, dims: FORCE },
    UnitDef { names: &["Pa", "pascal"], si: 1.0, dims: PRESSURE },
    UnitDef { names: &["kPa"], si: 1e3, dims: PRESSURE },
    UnitDef { names: &["MPa"], si: 1e6, dims: PRESSURE },
    UnitDef { names: &["GPa"], si: 1e9, dims: PRESSURE },
    UnitDef { names: &["bar"], si: 1e5, dims: PRESSURE },
    UnitDef { names: &["kbar"], si: 1e8, dims: PRESSURE },
    UnitDef { names: &["atm"], si: 101_325.0, dims: PRESSURE },
    UnitDef { names: &["P", "poise"], si: 0.1, dims: VISCOSITY },
    UnitDef { names: &["V", "volt"], si: 1.0, dims: POTENTIAL },
    UnitDef { names: &["statvolt", "statV"], si: STATVOLT_SI, dims: POTENTIAL },
    UnitDef { names: &["Debye", "debye", "D"], si: DEBYE_SI, dims: DIPOLE },
    UnitDef { names: &["L", "liter", "litre"], si: 1e-3, dims: VOLUME },
];

/// Base units selecting the working unit system.
///
/// Each field names a unit known to the registry (compound expressions are allowed as long as
/// they carry the right dimension, e.g. `kcal/mol` for energy).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUnits {
    pub length: String,
    pub mass: String,
    pub energy: String,
    pub charge: String,
}

impl Default for BaseUnits {
    /// Ångström, atomic mass unit, electronvolt, elementary charge.
    fn default() -> Self {
        Self {
            length: "angstrom".to_string(),
            mass: "amu".to_string(),
            energy: "eV".to_string(),
            charge: "e".to_string(),
        }
    }
}

/// Resolved scale table for one working unit system.
#[derive(Debug, Clone)]
pub struct UnitRegistry {
    base: BaseUnits,
    scales: HashMap<SmolStr, f64>,
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::from_si(
            BaseUnits::default(),
            ANGSTROM_SI,
            AMU_SI,
            EV_SI,
            ELEMENTARY_CHARGE_SI,
        )
    }
}

impl UnitRegistry {
    /// Builds a registry whose working units are the supplied base units.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownUnit`] when a base unit cannot be parsed and
    /// [`Error::InvalidBaseUnits`] when it has the wrong dimension or a non-positive magnitude.
    pub fn new(base: BaseUnits) -> Result<Self, Error> {
        let length = resolve_base(&base.length, LENGTH, "length")?;
        let mass = resolve_base(&base.mass, MASS, "mass")?;
        let energy = resolve_base(&base.energy, ENERGY, "energy")?;
        let charge = resolve_base(&base.charge, CHARGE, "charge")?;
        Ok(Self::from_si(base, length, mass, energy, charge))
    }

    fn from_si(base: BaseUnits, length: f64, mass: f64, energy: f64, charge: f64) -> Self {
        // Value of one SI base unit expressed in working units.
        let metre = 1.0 / length;
        let kilogram = 1.0 / mass;
        let second = (energy / (mass * length * length)).sqrt();
        let coulomb = 1.0 / charge;
        let kelvin = 1.0;
        let bases = [metre, kilogram, second, coulomb, kelvin];

        let mut scales = HashMap::new();
        for def in UNIT_TABLE {
            let factor = def
                .dims
                .iter()
                .zip(bases.iter())
                .fold(def.si, |acc, (&power, &unit)| acc * unit.powi(power as i32));
            for name in def.names {
                scales.insert(SmolStr::new(name), factor);
            }
        }

        Self { base, scales }
    }

    /// The base units this registry was built from.
    pub fn base(&self) -> &BaseUnits {
        &self.base
    }

    /// Factor mapping one `unit` into working units.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownUnit`] for unregistered names or malformed expressions.
    pub fn scale_of(&self, unit: &str) -> Result<f64, Error> {
        if let Some(&factor) = self.scales.get(unit) {
            return Ok(factor);
        }
        expr::evaluate(unit, |name| self.scales.get(name).copied())
    }

    /// Converts a working-unit value into `unit`.
    pub fn get_in_units(&self, value: f64, unit: &str) -> Result<f64, Error> {
        Ok(value / self.scale_of(unit)?)
    }

    /// Converts a value expressed in `unit` into working units.
    pub fn set_in_units(&self, value: f64, unit: &str) -> Result<f64, Error> {
        Ok(value * self.scale_of(unit)?)
    }
}

fn resolve_base(expression: &str, expected: Dims, label: &str) -> Result<f64, Error> {
    let si = expr::evaluate(expression, si_value)?;
    if dimension_of(expression)? != expected {
        return Err(Error::invalid_base_units(format!(
            "'{expression}' is not a {label} unit"
        )));
    }
    if !si.is_finite() || si <= 0.0 {
        return Err(Error::invalid_base_units(format!(
            "'{expression}' must have a finite positive magnitude"
        )));
    }
    Ok(si)
}

fn lookup_def(name: &str) -> Option<&'static UnitDef> {
    UNIT_TABLE.iter().find(|def| def.names.contains(&name))
}

fn si_value(name: &str) -> Option<f64> {
    lookup_def(name).map(|def| def.si)
}

/// Dimension of an expression.
///
/// Each axis is probed by scaling every named unit by `e^power` along that axis; numeric
/// literals cancel in the ratio against the plain SI evaluation.
fn dimension_of(expression: &str) -> Result<Dims, Error> {
    let plain = expr::evaluate(expression, si_value)?;
    let mut dims = [0i8; 5];
    for (axis, slot) in dims.iter_mut().enumerate() {
        let probed = expr::evaluate(expression, |name| {
            lookup_def(name).map(|def| def.si * f64::from(def.dims[axis]).exp())
        })?;
        let power = (probed / plain).ln();
        let rounded = power.round();
        if (power - rounded).abs() > 1e-6 {
            return Err(Error::invalid_base_units(format!(
                "'{expression}' has a fractional dimension"
            )));
        }
        *slot = rounded as i8;
    }
    Ok(dims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-12 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn default_registry_uses_metal_like_working_units() {
        let registry = UnitRegistry::default();

        assert!(close(registry.scale_of("angstrom").unwrap(), 1.0));
        assert!(close(registry.scale_of("amu").unwrap(), 1.0));
        assert!(close(registry.scale_of("eV").unwrap(), 1.0));
        assert!(close(registry.scale_of("e").unwrap(), 1.0));
        assert!(close(registry.scale_of("nm").unwrap(), 10.0));
    }

    #[test]
    fn grams_per_mole_matches_atomic_mass_unit() {
        let registry = UnitRegistry::default();
        let gmol = registry.scale_of("g/mol").unwrap();
        assert!((gmol - 1.0).abs() < 1e-6);
    }

    #[test]
    fn derived_time_unit_is_consistent_with_energy() {
        let registry = UnitRegistry::default();
        let kinetic = registry.scale_of("amu*angstrom^2/ps^2").unwrap();

        let expected = AMU_SI * ANGSTROM_SI * ANGSTROM_SI / 1e-24 / EV_SI;
        assert!((kinetic - expected).abs() / expected < 1e-9);
    }

    #[test]
    fn get_and_set_are_inverse() {
        let registry = UnitRegistry::default();
        for unit in ["nm", "kcal/mol", "g/cm^3", "angstrom/fs", "bar", "Debye", "V/nm"] {
            let value = 3.75;
            let out = registry.get_in_units(value, unit).unwrap();
            let back = registry.set_in_units(out, unit).unwrap();
            assert!(close(back, value), "round trip failed for {unit}");
        }
    }

    #[test]
    fn converts_common_quantities() {
        let registry = UnitRegistry::default();

        let nm = registry.get_in_units(25.0, "nm").unwrap();
        assert!(close(nm, 2.5));

        let kcal = registry.get_in_units(1.0, "kcal/mol").unwrap();
        assert!((kcal - 23.0605).abs() < 1e-3);

        let bohr = registry.set_in_units(1.0, "Bohr").unwrap();
        assert!((bohr - 0.529_177_210_9).abs() < 1e-9);
    }

    #[test]
    fn custom_base_units_change_working_system() {
        let base = BaseUnits {
            length: "nm".to_string(),
            mass: "g/mol".to_string(),
            energy: "kJ/mol".to_string(),
            charge: "e".to_string(),
        };
        let registry = UnitRegistry::new(base.clone()).unwrap();

        assert_eq!(registry.base(), &base);
        assert!(close(registry.scale_of("nm").unwrap(), 1.0));
        assert!(close(registry.scale_of("angstrom").unwrap(), 0.1));
        assert!((registry.scale_of("kJ/mol").unwrap() - 1.0).abs() < 1e-12);
        // GROMACS-style units imply a picosecond time unit.
        assert!((registry.scale_of("ps").unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_base_units_with_wrong_dimension() {
        let base = BaseUnits {
            length: "eV".to_string(),
            ..BaseUnits::default()
        };
        let err = UnitRegistry::new(base).unwrap_err();
        assert!(matches!(err, Error::InvalidBaseUnits { .. }));
    }

    #[test]
    fn rejects_unknown_base_unit() {
        let base = BaseUnits {
            mass: "stone".to_string(),
            ..BaseUnits::default()
        };
        let err = UnitRegistry::new(base).unwrap_err();
        assert!(matches!(err, Error::UnknownUnit { .. }));
    }

    #[test]
    fn unknown_unit_is_reported() {
        let registry = UnitRegistry::default();
        let err = registry.get_in_units(1.0, "parsec").unwrap_err();
        assert!(matches!(err, Error::UnknownUnit { ref unit, .. } if unit == "parsec"));
    }
}
