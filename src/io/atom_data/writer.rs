use super::styles::{AtomStyle, VELOCITY};
use super::FORMAT;
use crate::io::error::Error;
use crate::io::float_format::FloatFormat;
use crate::io::table;
use crate::model::system::System;
use crate::units::{self, Quantity, UnitStyle};
use std::io::Write;
use std::path::Path;

/// Options for writing a LAMMPS atom data file.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomDataOptions {
    pub atom_style: AtomStyle,
    pub units: UnitStyle,
    pub float_format: FloatFormat,
    /// Also return the LAMMPS input lines that read the file back.
    pub return_info: bool,
}

impl Default for AtomDataOptions {
    fn default() -> Self {
        Self {
            atom_style: AtomStyle::Atomic,
            units: UnitStyle::Metal,
            float_format: FloatFormat::fixed(13),
            return_info: true,
        }
    }
}

/// Fails with `MissingProperty` when the atom style reads a property the system lacks.
pub(crate) fn check_properties(system: &System, options: &AtomDataOptions) -> Result<(), Error> {
    let atoms = system.atoms();
    for prop in options.atom_style.extra_properties() {
        atoms.get_property(prop)?;
    }
    if atoms.contains(VELOCITY) {
        for prop in options.atom_style.velocity_properties() {
            atoms.get_property(prop)?;
        }
    }
    Ok(())
}

/// Writes the data file body. The system is expected to be wrapped already.
pub fn write<W: Write>(
    mut writer: W,
    system: &System,
    options: &AtomDataOptions,
) -> Result<(), Error> {
    let io_err = |e: std::io::Error| Error::from_io(e, None);
    let ff = &options.float_format;
    let length = units::optional_scale(options.units.unit(Quantity::Length))?;
    let sim_box = system.sim_box();

    let atom_rows = table::render_rows(
        FORMAT,
        system,
        &options.atom_style.atom_columns(options.units),
        ff,
    )?;
    let velocity_rows = if system.atoms().contains(VELOCITY) {
        let columns = options.atom_style.velocity_columns(options.units);
        Some(table::render_rows(FORMAT, system, &columns, ff)?)
    } else {
        None
    };

    write!(
        writer,
        "\n{} atoms\n{} atom types\n",
        system.natoms(),
        system.natypes()
    )
    .map_err(io_err)?;

    let (lo, hi) = (sim_box.lo(), sim_box.hi());
    for (axis, label) in ["x", "y", "z"].iter().enumerate() {
        writeln!(
            writer,
            "{} {} {label}lo {label}hi",
            ff.format(lo[axis] / length),
            ff.format(hi[axis] / length)
        )
        .map_err(io_err)?;
    }

    // Tilt factors are written exactly as stored.
    if !sim_box.is_orthogonal() {
        writeln!(
            writer,
            "{} {} {} xy xz yz",
            ff.format(sim_box.xy()),
            ff.format(sim_box.xz()),
            ff.format(sim_box.yz())
        )
        .map_err(io_err)?;
    }

    write!(writer, "\nAtoms\n\n{atom_rows}").map_err(io_err)?;
    if let Some(rows) = velocity_rows {
        write!(writer, "\nVelocities\n\n{rows}").map_err(io_err)?;
    }

    tracing::debug!(
        natoms = system.natoms(),
        atom_style = %options.atom_style,
        units = %options.units,
        "wrote atom data"
    );
    Ok(())
}

/// LAMMPS input lines that read the data file back in.
pub fn read_info(system: &System, options: &AtomDataOptions, data_path: Option<&Path>) -> String {
    let boundary: String = system
        .pbc
        .iter()
        .map(|&periodic| if periodic { "p " } else { "m " })
        .collect();
    let read_data = data_path
        .map(|path| format!("read_data {}", path.display()))
        .unwrap_or_default();

    [
        "# Script and atom data file prepared by atom-forge".to_string(),
        String::new(),
        format!("units {}", options.units),
        format!("atom_style {}", options.atom_style),
        format!("boundary {boundary}"),
        read_data,
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::atoms::Atoms;
    use crate::model::sim_box::SimBox;
    use nalgebra::Vector3;

    fn two_atom_system() -> System {
        let atoms = Atoms::from_types_and_positions(
            vec![1, 2],
            vec![Vector3::new(1.0, 1.0, 1.0), Vector3::new(9.0, 9.0, 9.0)],
        )
        .unwrap();
        System::new(SimBox::cubic(10.0).unwrap(), atoms, [true; 3])
    }

    fn render(system: &System, options: &AtomDataOptions) -> String {
        let mut buffer = Vec::new();
        write(&mut buffer, system, options).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn writes_orthogonal_atomic_file() {
        let text = render(&two_atom_system(), &AtomDataOptions::default());
        let expected = "\n2 atoms\n2 atom types\n\
            0.0000000000000 10.0000000000000 xlo xhi\n\
            0.0000000000000 10.0000000000000 ylo yhi\n\
            0.0000000000000 10.0000000000000 zlo zhi\n\
            \nAtoms\n\n\
            1 1 1.0000000000000 1.0000000000000 1.0000000000000\n\
            2 2 9.0000000000000 9.0000000000000 9.0000000000000\n";
        assert_eq!(text, expected);
        assert!(!text.contains("xy xz yz"));
    }

    #[test]
    fn writes_unconverted_tilt_line() {
        let mut system = two_atom_system();
        system
            .sim_box_mut()
            .set_bounds([0.0; 3], [10.0; 3], [1.0, 0.0, -2.0])
            .unwrap();
        let options = AtomDataOptions {
            units: UnitStyle::Nano,
            float_format: "%.2f".parse().unwrap(),
            ..AtomDataOptions::default()
        };

        let text = render(&system, &options);
        assert!(text.contains("0.00 1.00 xlo xhi\n"), "{text}");
        assert!(text.contains("1.00 0.00 -2.00 xy xz yz\n"), "{text}");
        assert!(text.contains("1 1 0.10 0.10 0.10\n"), "{text}");
    }

    #[test]
    fn writes_velocities_section() {
        let mut system = two_atom_system();
        system
            .atoms_mut()
            .add_property(VELOCITY, vec![Vector3::new(1.0, 0.0, 0.0); 2])
            .unwrap();
        let options = AtomDataOptions {
            units: UnitStyle::Lj,
            float_format: "%.1f".parse().unwrap(),
            ..AtomDataOptions::default()
        };

        let text = render(&system, &options);
        assert!(
            text.ends_with("\nVelocities\n\n1 1.0 0.0 0.0\n2 1.0 0.0 0.0\n"),
            "{text}"
        );
    }

    #[test]
    fn charge_style_requires_charge_property() {
        let system = two_atom_system();
        let options = AtomDataOptions {
            atom_style: AtomStyle::Charge,
            ..AtomDataOptions::default()
        };
        let err = check_properties(&system, &options).unwrap_err();
        assert!(matches!(err, Error::Model(_)));
        assert!(err.to_string().contains("charge"));
    }

    #[test]
    fn bad_velocity_column_writes_nothing() {
        let mut system = two_atom_system();
        system
            .atoms_mut()
            .add_property(VELOCITY, vec![0.5, 0.5])
            .unwrap();
        let mut buffer = Vec::new();
        let err = write(&mut buffer, &system, &AtomDataOptions::default()).unwrap_err();
        assert!(err.to_string().contains("velocity"), "{err}");
        assert!(buffer.is_empty());
    }

    #[test]
    fn read_info_lists_lammps_commands() {
        let mut system = two_atom_system();
        system.pbc = [true, true, false];

        let info = read_info(&system, &AtomDataOptions::default(), None);
        assert_eq!(
            info,
            "# Script and atom data file prepared by atom-forge\n\n\
             units metal\natom_style atomic\nboundary p p m \n"
        );

        let info = read_info(&system, &AtomDataOptions::default(), Some(Path::new("in.data")));
        assert!(info.ends_with("boundary p p m \nread_data in.data"));
    }
}
