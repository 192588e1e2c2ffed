//! VASP POSCAR structure files.

use super::cell;
use super::error::Error;
use super::float_format::FloatFormat;
use super::sink::numbered_lines;
use crate::model::atoms::Atoms;
use crate::model::system::System;
use crate::units;
use nalgebra::{Matrix3, Vector3};
use std::io::{BufRead, Write};

const FORMAT: &str = "poscar";
const LENGTH_UNIT: &str = "angstrom";

/// Options for writing a POSCAR file.
#[derive(Debug, Clone, PartialEq)]
pub struct PoscarOptions {
    /// First line of the file.
    pub comment: String,
    pub float_format: FloatFormat,
    /// Write Cartesian coordinates instead of `Direct` (fractional) ones.
    pub cartesian: bool,
}

impl Default for PoscarOptions {
    fn default() -> Self {
        Self {
            comment: String::new(),
            float_format: FloatFormat::fixed(13),
            cartesian: false,
        }
    }
}

/// Writes `system`. The box origin has no POSCAR counterpart and is dropped.
pub fn write<W: Write>(mut writer: W, system: &System, options: &PoscarOptions) -> Result<(), Error> {
    let io_err = |e: std::io::Error| Error::from_io(e, None);
    let ff = &options.float_format;
    let length = units::scale_of(LENGTH_UNIT)?;
    let rows = cell::cell_rows(system.sim_box(), length);

    writeln!(writer, "{}", options.comment.lines().next().unwrap_or_default()).map_err(io_err)?;
    writeln!(writer, "1.0").map_err(io_err)?;
    for row in rows.row_iter() {
        writeln!(
            writer,
            "{} {} {}",
            ff.format(row[0]),
            ff.format(row[1]),
            ff.format(row[2])
        )
        .map_err(io_err)?;
    }

    if let Some(symbols) = system.complete_symbols() {
        writeln!(writer, "{}", symbols.join(" ")).map_err(io_err)?;
    }

    let natypes = system.natypes();
    let atypes = system.atoms().atype();
    let counts: Vec<usize> = (1..=natypes as i64)
        .map(|t| atypes.iter().filter(|&&a| a == t).count())
        .collect();
    if counts.iter().sum::<usize>() != system.natoms() {
        return Err(Error::inconsistent_data(
            FORMAT,
            None,
            format!("atom types fall outside 1..={natypes}"),
        ));
    }
    let counts: Vec<String> = counts.iter().map(usize::to_string).collect();
    writeln!(writer, "{}", counts.join(" ")).map_err(io_err)?;

    writeln!(writer, "{}", if options.cartesian { "Cartesian" } else { "Direct" })
        .map_err(io_err)?;

    let origin = system.sim_box().origin();
    let scaled = system.atoms_scaled_positions();
    for t in 1..=natypes as i64 {
        for (index, _) in atypes.iter().enumerate().filter(|&(_, &a)| a == t) {
            let coords = if options.cartesian {
                (system.atoms().pos()[index] - origin) / length
            } else {
                scaled[index]
            };
            writeln!(
                writer,
                "{} {} {}",
                ff.format(coords.x),
                ff.format(coords.y),
                ff.format(coords.z)
            )
            .map_err(io_err)?;
        }
    }

    tracing::debug!(natoms = system.natoms(), natypes, "wrote POSCAR");
    Ok(())
}

pub fn read<R: BufRead>(mut reader: R) -> Result<System, Error> {
    let lines = numbered_lines(&mut reader)?;
    let mut lines = lines.iter().map(|(n, l)| (*n, l.trim()));
    let mut next = |what: &str| {
        lines
            .next()
            .ok_or_else(|| Error::inconsistent_data(FORMAT, None, format!("missing {what}")))
    };

    next("comment line")?;

    let (n, scale_line) = next("scale factor")?;
    let scale: f64 = parse_field(first_field(scale_line), n)?;

    let mut cell = Matrix3::zeros();
    for row in 0..3 {
        let (n, line) = next("lattice vector")?;
        let values = parse_floats(line, 3, n)?;
        cell.set_row(row, &Vector3::new(values[0], values[1], values[2]).transpose());
    }

    let scale = if scale < 0.0 {
        (scale.abs() / cell.determinant().abs()).cbrt()
    } else {
        scale
    };
    cell *= scale;

    let (n, line) = next("atom counts")?;
    let (symbols, (n, counts_line)) = if line
        .split_whitespace()
        .all(|f| f.parse::<usize>().is_ok())
    {
        (None, (n, line))
    } else {
        let symbols: Vec<&str> = line.split_whitespace().collect();
        (Some(symbols), next("atom counts")?)
    };
    let counts: Vec<usize> = counts_line
        .split_whitespace()
        .map(|f| parse_field(f, n))
        .collect::<Result<_, _>>()?;
    if let Some(symbols) = &symbols {
        if symbols.len() != counts.len() {
            return Err(Error::parse(
                FORMAT,
                None,
                n,
                format!("{} symbols but {} counts", symbols.len(), counts.len()),
            ));
        }
    }

    let (mut n, mut mode) = next("coordinate mode")?;
    if mode.starts_with(['S', 's']) {
        (n, mode) = next("coordinate mode")?;
    }
    let cartesian = mode.starts_with(['C', 'c', 'K', 'k']);
    tracing::trace!(line = n, cartesian, "coordinate block");

    let natoms: usize = counts.iter().sum();
    let mut coords = Vec::with_capacity(natoms);
    for _ in 0..natoms {
        let (n, line) = next("atom coordinates")?;
        let values = parse_floats(line, 3, n)?;
        coords.push(Vector3::new(values[0], values[1], values[2]));
    }

    let frac = if cartesian {
        let positions: Vec<Vector3<f64>> = coords.iter().map(|c| c * scale).collect();
        cell::fractional(&cell, &positions)?
    } else {
        coords
    };

    let length = units::scale_of(LENGTH_UNIT)?;
    let sim_box = cell::box_from_rows(&(cell * length))?;

    let atypes: Vec<i64> = counts
        .iter()
        .enumerate()
        .flat_map(|(t, &count)| std::iter::repeat_n(t as i64 + 1, count))
        .collect();
    let positions = frac.iter().map(|f| sim_box.position_absolute(f)).collect();
    let atoms = Atoms::from_types_and_positions(atypes, positions)?;

    let mut system = System::new(sim_box, atoms, [true; 3]);
    system.set_natypes(counts.len());
    if let Some(symbols) = symbols {
        system.set_symbols(symbols.into_iter().map(Some));
    }

    tracing::debug!(natoms, natypes = counts.len(), "loaded POSCAR");
    Ok(system)
}

fn first_field(line: &str) -> &str {
    line.split_whitespace().next().unwrap_or_default()
}

fn parse_field<T: std::str::FromStr>(field: &str, line_number: usize) -> Result<T, Error> {
    field
        .parse()
        .map_err(|_| Error::parse(FORMAT, None, line_number, format!("invalid value '{field}'")))
}

fn parse_floats(line: &str, count: usize, line_number: usize) -> Result<Vec<f64>, Error> {
    let values: Vec<f64> = line
        .split_whitespace()
        .take(count)
        .map(|f| parse_field(f, line_number))
        .collect::<Result<_, _>>()?;
    if values.len() < count {
        return Err(Error::parse(
            FORMAT,
            None,
            line_number,
            format!("expected {count} values, found {}", values.len()),
        ));
    }
    Ok(values)
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
        System::new(SimBox::cubic(4.0).unwrap(), atoms, [true; 3]).with_symbols(&["Cu", "Ni"])
    }

    fn render(system: &System, options: &PoscarOptions) -> String {
        let mut buffer = Vec::new();
        write(&mut buffer, system, options).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn writes_atoms_grouped_by_type() {
        let options = PoscarOptions {
            comment: "CuNi test".into(),
            float_format: "%.3f".parse().unwrap(),
            cartesian: false,
        };
        let text = render(&system(), &options);
        assert_eq!(
            text,
            "CuNi test\n1.0\n\
             4.000 0.000 0.000\n0.000 4.000 0.000\n0.000 0.000 4.000\n\
             Cu Ni\n1 2\nDirect\n\
             0.500 0.500 0.500\n0.250 0.250 0.250\n0.750 0.000 0.500\n"
        );
    }

    #[test]
    fn omits_symbols_line_when_types_are_unnamed() {
        let mut system = system();
        system.set_symbols([Some("Cu"), None]);
        let text = render(&system, &PoscarOptions::default());
        assert!(text.contains("\n1 2\nDirect\n"));
        assert!(!text.contains("Cu"));
    }

    #[test]
    fn retyped_atom_keeps_its_row() {
        let mut system = system();
        system.atoms_mut().set_atype(1, 3).unwrap();
        let options = PoscarOptions {
            float_format: "%.2f".parse().unwrap(),
            ..PoscarOptions::default()
        };
        let text = render(&system, &options);
        assert!(text.ends_with("\n0 2 1\nDirect\n0.25 0.25 0.25\n0.75 0.00 0.50\n0.50 0.50 0.50\n"), "{text}");
    }

    #[test]
    fn round_trips_through_text() {
        let original = system();
        let text = render(
            &original,
            &PoscarOptions {
                cartesian: true,
                ..PoscarOptions::default()
            },
        );
        let loaded = read(text.as_bytes()).unwrap();

        assert_eq!(loaded.natoms(), 3);
        assert_eq!(loaded.atoms().atype(), &[1, 2, 2]);
        assert_eq!(loaded.symbol_of(1), Some("Cu"));
        assert_eq!(loaded.symbol_of(2), Some("Ni"));
        assert!((loaded.atoms().pos()[0] - Vector3::new(2.0, 2.0, 2.0)).norm() < 1e-9);
        assert!((loaded.sim_box().volume() - 64.0).abs() < 1e-9);
    }

    #[test]
    fn reads_general_cell_with_selective_dynamics() {
        let text = "fcc Al primitive\n\
                    1.0\n\
                    0.0 2.0 2.0\n2.0 0.0 2.0\n2.0 2.0 0.0\n\
                    Al\n1\n\
                    Selective dynamics\n\
                    Direct\n\
                    0.0 0.0 0.0 T T T\n";
        let system = read(text.as_bytes()).unwrap();
        assert_eq!(system.natoms(), 1);
        assert!((system.sim_box().volume() - 16.0).abs() < 1e-9);
        assert!((system.sim_box().alpha() - 60.0).abs() < 1e-8);
    }

    #[test]
    fn negative_scale_sets_volume() {
        let text = "cube\n-125.0\n1 0 0\n0 1 0\n0 0 1\n1\nDirect\n0.5 0.5 0.5\n";
        let system = read(text.as_bytes()).unwrap();
        assert!((system.sim_box().volume() - 125.0).abs() < 1e-9);
        assert!((system.atoms().pos()[0] - Vector3::new(2.5, 2.5, 2.5)).norm() < 1e-9);
        assert!(system.symbols().is_empty());
    }

    #[test]
    fn rejects_truncated_file() {
        let text = "x\n1.0\n1 0 0\n0 1 0\n0 0 1\n2\nDirect\n0 0 0\n";
        let err = read(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("atom coordinates"));
    }
}
