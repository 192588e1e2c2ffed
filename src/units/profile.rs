//! LAMMPS unit styles mapping each physical quantity to a concrete unit string.

use super::error::Error;
use std::fmt;
use std::str::FromStr;

/// Physical quantity categories that appear in per-atom columns and box records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    Mass,
    Length,
    Time,
    Energy,
    Velocity,
    Force,
    Torque,
    Temperature,
    Pressure,
    Viscosity,
    Charge,
    Dipole,
    ElectricField,
    Density,
}

/// Named LAMMPS `units` style.
///
/// `Lj` is reduced units: none of its quantities map to a physical unit, so values are written
/// exactly as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnitStyle {
    Lj,
    Real,
    #[default]
    Metal,
    Si,
    Cgs,
    Electron,
    Micro,
    Nano,
}

impl UnitStyle {
    pub const ALL: [UnitStyle; 8] = [
        UnitStyle::Lj,
        UnitStyle::Real,
        UnitStyle::Metal,
        UnitStyle::Si,
        UnitStyle::Cgs,
        UnitStyle::Electron,
        UnitStyle::Micro,
        UnitStyle::Nano,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            UnitStyle::Lj => "lj",
            UnitStyle::Real => "real",
            UnitStyle::Metal => "metal",
            UnitStyle::Si => "si",
            UnitStyle::Cgs => "cgs",
            UnitStyle::Electron => "electron",
            UnitStyle::Micro => "micro",
            UnitStyle::Nano => "nano",
        }
    }

    /// Unit string for `quantity`, or `None` when values pass through unconverted.
    pub fn unit(&self, quantity: Quantity) -> Option<&'static str> {
        use Quantity::*;

        let unit = match self {
            UnitStyle::Lj => return None,
            UnitStyle::Real => match quantity {
                Mass => "g/mol",
                Length => "angstrom",
                Time => "fs",
                Energy => "kcal/mol",
                Velocity => "angstrom/fs",
                Force => "kcal/mol/angstrom",
                Torque => "kcal/mol",
                Temperature => "K",
                Pressure => "atm",
                Viscosity => "P",
                Charge => "e",
                Dipole => "e*angstrom",
                ElectricField => "V/angstrom",
                Density => "g/cm^3",
            },
            UnitStyle::Metal => match quantity {
                Mass => "g/mol",
                Length => "angstrom",
                Time => "ps",
                Energy => "eV",
                Velocity => "angstrom/ps",
                Force => "eV/angstrom",
                Torque => "eV",
                Temperature => "K",
                Pressure => "bar",
                Viscosity => "P",
                Charge => "e",
                Dipole => "e*angstrom",
                ElectricField => "V/angstrom",
                Density => "g/cm^3",
            },
            UnitStyle::Si => match quantity {
                Mass => "kg",
                Length => "m",
                Time => "s",
                Energy => "J",
                Velocity => "m/s",
                Force => "N",
                Torque => "N*m",
                Temperature => "K",
                Pressure => "Pa",
                Viscosity => "Pa*s",
                Charge => "C",
                Dipole => "C*m",
                ElectricField => "V/m",
                Density => "kg/m^3",
            },
            UnitStyle::Cgs => match quantity {
                Mass => "g",
                Length => "cm",
                Time => "s",
                Energy => "erg",
                Velocity => "cm/s",
                Force => "dyne",
                Torque => "dyne*cm",
                Temperature => "K",
                Pressure => "dyne/cm^2",
                Viscosity => "P",
                Charge => "statcoulomb",
                Dipole => "statcoulomb*cm",
                ElectricField => "statvolt/cm",
                Density => "g/cm^3",
            },
            UnitStyle::Electron => match quantity {
                Mass => "amu",
                Length => "Bohr",
                Time => "fs",
                Energy => "Hartree",
                Velocity => "Bohr/atomic_time",
                Force => "Hartree/Bohr",
                Torque => "Hartree",
                Temperature => "K",
                Pressure => "Pa",
                Viscosity => "Pa*s",
                Charge => "e",
                Dipole => "Debye",
                ElectricField => "V/cm",
                Density => "amu/Bohr^3",
            },
            UnitStyle::Micro => match quantity {
                Mass => "pg",
                Length => "micrometer",
                Time => "microsecond",
                Energy => "pg*micrometer^2/microsecond^2",
                Velocity => "micrometer/microsecond",
                Force => "pg*micrometer/microsecond^2",
                Torque => "pg*micrometer^2/microsecond^2",
                Temperature => "K",
                Pressure => "pg/(micrometer*microsecond^2)",
                Viscosity => "pg/(micrometer*microsecond)",
                Charge => "pC",
                Dipole => "pC*micrometer",
                ElectricField => "V/micrometer",
                Density => "pg/micrometer^3",
            },
            UnitStyle::Nano => match quantity {
                Mass => "ag",
                Length => "nm",
                Time => "ns",
                Energy => "ag*nm^2/ns^2",
                Velocity => "nm/ns",
                Force => "ag*nm/ns^2",
                Torque => "ag*nm^2/ns^2",
                Temperature => "K",
                Pressure => "ag/(nm*ns^2)",
                Viscosity => "ag/(nm*ns)",
                Charge => "e",
                Dipole => "e*nm",
                ElectricField => "V/nm",
                Density => "ag/nm^3",
            },
        };
        Some(unit)
    }
}

impl FromStr for UnitStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UnitStyle::ALL
            .into_iter()
            .find(|style| style.name() == s)
            .ok_or_else(|| Error::unknown_unit(s, "not a recognized LAMMPS units style"))
    }
}

impl fmt::Display for UnitStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::UnitRegistry;

    const QUANTITIES: [Quantity; 14] = [
        Quantity::Mass,
        Quantity::Length,
        Quantity::Time,
        Quantity::Energy,
        Quantity::Velocity,
        Quantity::Force,
        Quantity::Torque,
        Quantity::Temperature,
        Quantity::Pressure,
        Quantity::Viscosity,
        Quantity::Charge,
        Quantity::Dipole,
        Quantity::ElectricField,
        Quantity::Density,
    ];

    #[test]
    fn parses_every_style_by_name() {
        for style in UnitStyle::ALL {
            assert_eq!(style.name().parse::<UnitStyle>().unwrap(), style);
            assert_eq!(style.to_string(), style.name());
        }
    }

    #[test]
    fn unknown_style_is_an_unknown_unit_error() {
        let err = "imperial".parse::<UnitStyle>().unwrap_err();
        assert!(matches!(err, Error::UnknownUnit { ref unit, .. } if unit == "imperial"));
    }

    #[test]
    fn lj_never_converts() {
        for quantity in QUANTITIES {
            assert_eq!(UnitStyle::Lj.unit(quantity), None);
        }
    }

    #[test]
    fn every_physical_unit_resolves_in_the_default_registry() {
        let registry = UnitRegistry::default();
        for style in UnitStyle::ALL {
            for quantity in QUANTITIES {
                if let Some(unit) = style.unit(quantity) {
                    let scale = registry.scale_of(unit).unwrap();
                    assert!(scale.is_finite() && scale > 0.0, "{style}: {unit}");
                }
            }
        }
    }

    #[test]
    fn metal_and_real_share_length_but_not_time() {
        assert_eq!(UnitStyle::Metal.unit(Quantity::Length), Some("angstrom"));
        assert_eq!(UnitStyle::Real.unit(Quantity::Length), Some("angstrom"));
        assert_eq!(UnitStyle::Metal.unit(Quantity::Time), Some("ps"));
        assert_eq!(UnitStyle::Real.unit(Quantity::Time), Some("fs"));
    }
}
