use anyhow::{Result, bail};
use clap::Args;

use atom_forge::System;
use atom_forge::io::atom_data::{AtomDataOptions, AtomStyle};
use atom_forge::io::atom_dump::AtomDumpOptions;
use atom_forge::io::poscar::PoscarOptions;
use atom_forge::io::system_model::SystemModelOptions;
use atom_forge::io::table::TableOptions;
use atom_forge::io::{DumpRequest, FloatFormat};
use atom_forge::units::UnitStyle;

use crate::commands::FileFormat;

/// Options shaping the written file.
#[derive(Debug, Default, Args)]
pub struct ConvertArgs {
    /// Element symbol of each atom type, in type order (e.g. `Cu,Ni`).
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub symbols: Vec<String>,
    /// LAMMPS atom_style for data output.
    #[arg(long = "atom-style")]
    pub atom_style: Option<AtomStyle>,
    /// LAMMPS units for data and dump output.
    #[arg(long)]
    pub units: Option<UnitStyle>,
    /// printf-style float format for numeric columns (e.g. `%.8f`).
    #[arg(long = "float-format")]
    pub float_format: Option<FloatFormat>,
    /// Write box-relative coordinates in dump output.
    #[arg(long)]
    pub scaled: bool,
    /// Write Cartesian rather than Direct coordinates in POSCAR output.
    #[arg(long)]
    pub cartesian: bool,
    /// Timestep recorded in dump output.
    #[arg(long, default_value_t = 0)]
    pub timestep: i64,
    /// Comment line for POSCAR output.
    #[arg(long)]
    pub comment: Option<String>,
    /// Omit the header row in table output.
    #[arg(long = "no-header")]
    pub no_header: bool,
}

/// Applies symbol assignments to the loaded system.
pub fn run(system: &mut System, args: &ConvertArgs) -> Result<()> {
    if args.symbols.is_empty() {
        return Ok(());
    }
    if args.symbols.len() < system.natypes() {
        bail!(
            "{} symbols given for {} atom types",
            args.symbols.len(),
            system.natypes()
        );
    }
    system.set_symbols(args.symbols.iter().map(|s| Some(s.trim())));
    Ok(())
}

/// Builds the dump request for `format` from the command-line options.
pub fn request(format: FileFormat, args: &ConvertArgs) -> DumpRequest {
    match format {
        FileFormat::AtomData => {
            let mut options = AtomDataOptions::default();
            if let Some(style) = args.atom_style {
                options.atom_style = style;
            }
            if let Some(units) = args.units {
                options.units = units;
            }
            if let Some(ff) = args.float_format {
                options.float_format = ff;
            }
            DumpRequest::AtomData(options)
        }
        FileFormat::AtomDump => {
            let mut options = AtomDumpOptions {
                scale: args.scaled,
                timestep: args.timestep,
                ..AtomDumpOptions::default()
            };
            if let Some(units) = args.units {
                options.units = units;
            }
            if let Some(ff) = args.float_format {
                options.float_format = ff;
            }
            DumpRequest::AtomDump(options)
        }
        FileFormat::Table => {
            let mut options = TableOptions {
                header: !args.no_header,
                ..TableOptions::default()
            };
            if let Some(ff) = args.float_format {
                options.float_format = ff;
            }
            DumpRequest::Table(options)
        }
        FileFormat::Poscar => {
            let mut options = PoscarOptions {
                cartesian: args.cartesian,
                comment: args.comment.clone().unwrap_or_default(),
                ..PoscarOptions::default()
            };
            if let Some(ff) = args.float_format {
                options.float_format = ff;
            }
            DumpRequest::Poscar(options)
        }
        FileFormat::SystemModel => DumpRequest::SystemModel(SystemModelOptions::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atom_forge::{Atoms, SimBox};
    use nalgebra::Vector3;

    fn system() -> System {
        let atoms = Atoms::from_types_and_positions(
            vec![1, 2],
            vec![Vector3::new(1.0, 1.0, 1.0), Vector3::new(2.0, 2.0, 2.0)],
        )
        .unwrap();
        System::new(SimBox::cubic(5.0).unwrap(), atoms, [true; 3])
    }

    #[test]
    fn symbols_are_assigned_in_type_order() {
        let mut system = system();
        let args = ConvertArgs {
            symbols: vec!["Cu".into(), " Ni".into()],
            ..ConvertArgs::default()
        };
        run(&mut system, &args).unwrap();
        assert_eq!(system.symbol_of(2), Some("Ni"));
    }

    #[test]
    fn too_few_symbols_is_an_error() {
        let mut system = system();
        let args = ConvertArgs {
            symbols: vec!["Cu".into()],
            ..ConvertArgs::default()
        };
        assert!(run(&mut system, &args).is_err());
    }

    #[test]
    fn request_carries_data_options() {
        let args = ConvertArgs {
            atom_style: Some(AtomStyle::Charge),
            units: Some(UnitStyle::Real),
            ..ConvertArgs::default()
        };
        match request(FileFormat::AtomData, &args) {
            DumpRequest::AtomData(options) => {
                assert_eq!(options.atom_style, AtomStyle::Charge);
                assert_eq!(options.units, UnitStyle::Real);
            }
            other => panic!("unexpected request {other:?}"),
        }
    }
}
