//! Column layouts of the LAMMPS `Atoms` and `Velocities` sections for each atom style.

use crate::io::error::Error;
use crate::io::table::{A_ID, TableColumn};
use crate::model::atoms::{ATYPE, POS};
use crate::units::{Quantity, UnitStyle};
use std::fmt;
use std::str::FromStr;

/// Property holding per-atom velocities; its presence adds a `Velocities` section.
pub const VELOCITY: &str = "velocity";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldUnit {
    None,
    Of(Quantity),
    Volume,
    AngularVelocity,
    AngularMomentum,
}

#[derive(Debug, Clone, Copy)]
struct Field {
    prop: &'static str,
    names: &'static [&'static str],
    unit: FieldUnit,
    integer: bool,
}

const fn field(prop: &'static str, names: &'static [&'static str], unit: FieldUnit) -> Field {
    Field {
        prop,
        names,
        unit,
        integer: false,
    }
}

const fn integer(prop: &'static str, names: &'static [&'static str]) -> Field {
    Field {
        prop,
        names,
        unit: FieldUnit::None,
        integer: true,
    }
}

const ID: Field = integer(A_ID, &["id"]);
const TYPE: Field = integer(ATYPE, &["type"]);
const POSITION: Field = field(POS, &["x", "y", "z"], FieldUnit::Of(Quantity::Length));
const CHARGE: Field = field("charge", &["q"], FieldUnit::Of(Quantity::Charge));
const MOLECULE: Field = integer("molecule", &["molecule"]);
const DIPOLE: Field = field("mu", &["mux", "muy", "muz"], FieldUnit::Of(Quantity::Dipole));
const DIAMETER: Field = field("diameter", &["diameter"], FieldUnit::Of(Quantity::Length));
const DENSITY: Field = field("density", &["density"], FieldUnit::Of(Quantity::Density));
const THETA: Field = field("theta", &["theta"], FieldUnit::Of(Quantity::Temperature));
const ESPIN: Field = field("espin", &["espin"], FieldUnit::None);
const ERADIUS: Field = field("eradius", &["eradius"], FieldUnit::Of(Quantity::Length));
const ELLIPSOIDFLAG: Field = integer("ellipsoidflag", &["ellipsoidflag"]);
const VOLUME: Field = field("volume", &["volume"], FieldUnit::Volume);

const VELOCITY_FIELD: Field = field(VELOCITY, &["vx", "vy", "vz"], FieldUnit::Of(Quantity::Velocity));
const ERVEL: Field = field("ervel", &["ervel"], FieldUnit::Of(Quantity::Velocity));
const ANGMOM: Field = field(
    "angmom",
    &["angmomx", "angmomy", "angmomz"],
    FieldUnit::AngularMomentum,
);
const ANGVEL: Field = field("angvel", &["wx", "wy", "wz"], FieldUnit::AngularVelocity);

impl Field {
    fn column(&self, units: UnitStyle) -> TableColumn {
        let unit = match self.unit {
            FieldUnit::None => None,
            FieldUnit::Of(quantity) => units.unit(quantity).map(str::to_string),
            FieldUnit::Volume => units
                .unit(Quantity::Length)
                .map(|length| format!("{length}^3")),
            FieldUnit::AngularVelocity => units.unit(Quantity::Time).map(|time| format!("{time}^-1")),
            FieldUnit::AngularMomentum => match (
                units.unit(Quantity::Mass),
                units.unit(Quantity::Length),
                units.unit(Quantity::Time),
            ) {
                (Some(mass), Some(length), Some(time)) => {
                    Some(format!("{mass}*{length}^2/{time}"))
                }
                _ => None,
            },
        };

        let column = TableColumn::new(self.prop, self.names).with_optional_unit(unit);
        if self.integer { column.integer() } else { column }
    }
}

/// LAMMPS `atom_style` supported by the data file codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AtomStyle {
    #[default]
    Atomic,
    Charge,
    Bond,
    Angle,
    Molecular,
    Full,
    Dipole,
    Sphere,
    Dpd,
    Electron,
    Ellipsoid,
    Peri,
}

impl AtomStyle {
    pub const ALL: [AtomStyle; 12] = [
        AtomStyle::Atomic,
        AtomStyle::Charge,
        AtomStyle::Bond,
        AtomStyle::Angle,
        AtomStyle::Molecular,
        AtomStyle::Full,
        AtomStyle::Dipole,
        AtomStyle::Sphere,
        AtomStyle::Dpd,
        AtomStyle::Electron,
        AtomStyle::Ellipsoid,
        AtomStyle::Peri,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AtomStyle::Atomic => "atomic",
            AtomStyle::Charge => "charge",
            AtomStyle::Bond => "bond",
            AtomStyle::Angle => "angle",
            AtomStyle::Molecular => "molecular",
            AtomStyle::Full => "full",
            AtomStyle::Dipole => "dipole",
            AtomStyle::Sphere => "sphere",
            AtomStyle::Dpd => "dpd",
            AtomStyle::Electron => "electron",
            AtomStyle::Ellipsoid => "ellipsoid",
            AtomStyle::Peri => "peri",
        }
    }

    fn atom_fields(&self) -> &'static [Field] {
        match self {
            AtomStyle::Atomic => &[ID, TYPE, POSITION],
            AtomStyle::Charge => &[ID, TYPE, CHARGE, POSITION],
            AtomStyle::Bond | AtomStyle::Angle | AtomStyle::Molecular => {
                &[ID, MOLECULE, TYPE, POSITION]
            }
            AtomStyle::Full => &[ID, MOLECULE, TYPE, CHARGE, POSITION],
            AtomStyle::Dipole => &[ID, TYPE, CHARGE, POSITION, DIPOLE],
            AtomStyle::Sphere => &[ID, TYPE, DIAMETER, DENSITY, POSITION],
            AtomStyle::Dpd => &[ID, TYPE, THETA, POSITION],
            AtomStyle::Electron => &[ID, TYPE, CHARGE, ESPIN, ERADIUS, POSITION],
            AtomStyle::Ellipsoid => &[ID, TYPE, ELLIPSOIDFLAG, DENSITY, POSITION],
            AtomStyle::Peri => &[ID, TYPE, VOLUME, DENSITY, POSITION],
        }
    }

    fn velocity_fields(&self) -> &'static [Field] {
        match self {
            AtomStyle::Electron => &[ID, VELOCITY_FIELD, ERVEL],
            AtomStyle::Ellipsoid => &[ID, VELOCITY_FIELD, ANGMOM],
            AtomStyle::Sphere => &[ID, VELOCITY_FIELD, ANGVEL],
            _ => &[ID, VELOCITY_FIELD],
        }
    }

    /// Columns of the `Atoms` section.
    pub fn atom_columns(&self, units: UnitStyle) -> Vec<TableColumn> {
        self.atom_fields().iter().map(|f| f.column(units)).collect()
    }

    /// Columns of the `Velocities` section.
    pub fn velocity_columns(&self, units: UnitStyle) -> Vec<TableColumn> {
        self.velocity_fields()
            .iter()
            .map(|f| f.column(units))
            .collect()
    }

    /// Per-atom properties the `Atoms` section reads beyond `atype` and `pos`.
    pub fn extra_properties(&self) -> impl Iterator<Item = &'static str> {
        self.atom_fields()
            .iter()
            .map(|f| f.prop)
            .filter(|&p| p != A_ID && p != ATYPE && p != POS)
    }

    /// Per-atom properties the `Velocities` section reads, `velocity` included.
    pub fn velocity_properties(&self) -> impl Iterator<Item = &'static str> {
        self.velocity_fields()
            .iter()
            .map(|f| f.prop)
            .filter(|&p| p != A_ID)
    }
}

impl FromStr for AtomStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AtomStyle::ALL
            .into_iter()
            .find(|style| style.name() == s)
            .ok_or_else(|| Error::unsupported_atom_style(s))
    }
}

impl fmt::Display for AtomStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
