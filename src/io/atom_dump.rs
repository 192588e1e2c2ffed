//! LAMMPS `dump custom` snapshots.
//!
//! Only the first snapshot of a multi-frame file is read. Coordinates are written as stored,
//! without wrapping, since dumps commonly carry unwrapped trajectories.

use super::error::Error;
use super::float_format::FloatFormat;
use super::sink::numbered_lines;
use super::table::{self, A_ID, TableColumn};
use crate::model::atoms::{ATYPE, POS};
use crate::model::sim_box::SimBox;
use crate::model::system::System;
use crate::units::{self, Quantity, UnitStyle};
use std::io::{BufRead, Write};

const FORMAT: &str = "atom_dump";

/// Options for writing a dump snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomDumpOptions {
    /// Columns after the defaults are resolved; `None` writes id, type, positions and, when
    /// present, velocities and charges.
    pub columns: Option<Vec<TableColumn>>,
    /// Write box-relative `xs ys zs` instead of `x y z` in the default columns.
    pub scale: bool,
    pub units: UnitStyle,
    pub float_format: FloatFormat,
    pub timestep: i64,
}

impl Default for AtomDumpOptions {
    fn default() -> Self {
        Self {
            columns: None,
            scale: false,
            units: UnitStyle::Metal,
            float_format: FloatFormat::scientific(13),
            timestep: 0,
        }
    }
}

/// Options for reading a dump snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtomDumpLoadOptions {
    pub units: UnitStyle,
}

fn unit(units: UnitStyle, quantity: Quantity) -> Option<String> {
    units.unit(quantity).map(str::to_string)
}

/// Default dump columns for `system`.
pub fn default_columns(system: &System, options: &AtomDumpOptions) -> Vec<TableColumn> {
    let mut columns = vec![
        TableColumn::new(A_ID, &["id"]),
        TableColumn::new(ATYPE, &["type"]),
    ];
    columns.push(if options.scale {
        TableColumn::new(POS, &["xs", "ys", "zs"]).scaled()
    } else {
        TableColumn::new(POS, &["x", "y", "z"])
            .with_optional_unit(unit(options.units, Quantity::Length))
    });
    if system.atoms().contains("velocity") {
        columns.push(
            TableColumn::new("velocity", &["vx", "vy", "vz"])
                .with_optional_unit(unit(options.units, Quantity::Velocity)),
        );
    }
    if system.atoms().contains("charge") {
        columns.push(
            TableColumn::new("charge", &["q"])
                .with_optional_unit(unit(options.units, Quantity::Charge)),
        );
    }
    columns
}

pub fn write<W: Write>(mut writer: W, system: &System, options: &AtomDumpOptions) -> Result<(), Error> {
    let io_err = |e: std::io::Error| Error::from_io(e, None);
    let ff = &options.float_format;
    let length = units::optional_scale(options.units.unit(Quantity::Length))?;
    let sim_box = system.sim_box();

    let columns = match &options.columns {
        Some(columns) => columns.clone(),
        None => default_columns(system, options),
    };
    let rows = table::render_rows(FORMAT, system, &columns, ff)?;

    write!(
        writer,
        "ITEM: TIMESTEP\n{}\nITEM: NUMBER OF ATOMS\n{}\n",
        options.timestep,
        system.natoms()
    )
    .map_err(io_err)?;

    let boundary = system
        .pbc
        .iter()
        .map(|&periodic| if periodic { "pp" } else { "mm" })
        .collect::<Vec<_>>()
        .join(" ");

    if sim_box.is_orthogonal() {
        writeln!(writer, "ITEM: BOX BOUNDS {boundary}").map_err(io_err)?;
        for axis in 0..3 {
            writeln!(
                writer,
                "{} {}",
                ff.format(sim_box.lo()[axis] / length),
                ff.format(sim_box.hi()[axis] / length)
            )
            .map_err(io_err)?;
        }
    } else {
        writeln!(writer, "ITEM: BOX BOUNDS xy xz yz {boundary}").map_err(io_err)?;
        let (lo, hi) = sim_box.bounding_box();
        let tilt = sim_box.tilt();
        for axis in 0..3 {
            writeln!(
                writer,
                "{} {} {}",
                ff.format(lo[axis] / length),
                ff.format(hi[axis] / length),
                ff.format(tilt[axis] / length)
            )
            .map_err(io_err)?;
        }
    }

    let names: Vec<&str> = columns
        .iter()
        .flat_map(|c| c.table_names.iter().map(String::as_str))
        .collect();
    write!(writer, "ITEM: ATOMS {}\n{rows}", names.join(" ")).map_err(io_err)?;

    tracing::debug!(
        natoms = system.natoms(),
        timestep = options.timestep,
        "wrote dump snapshot"
    );
    Ok(())
}

/// Maps `ITEM: ATOMS` names onto property columns.
fn columns_for(names: &[&str], units: UnitStyle) -> Vec<TableColumn> {
    let length = unit(units, Quantity::Length);
    let mut columns = Vec::new();
    let mut i = 0;
    while i < names.len() {
        let triplet = names.get(i..i + 3);
        let vector = match triplet {
            Some(["x", "y", "z"]) | Some(["xu", "yu", "zu"]) => {
                Some(TableColumn::new(POS, &names[i..i + 3]).with_optional_unit(length.clone()))
            }
            Some(["xs", "ys", "zs"]) | Some(["xsu", "ysu", "zsu"]) => {
                Some(TableColumn::new(POS, &names[i..i + 3]).scaled())
            }
            Some(["vx", "vy", "vz"]) => Some(
                TableColumn::new("velocity", &names[i..i + 3])
                    .with_optional_unit(unit(units, Quantity::Velocity)),
            ),
            Some(["fx", "fy", "fz"]) => Some(
                TableColumn::new("force", &names[i..i + 3])
                    .with_optional_unit(unit(units, Quantity::Force)),
            ),
            Some(["mux", "muy", "muz"]) => Some(
                TableColumn::new("mu", &names[i..i + 3])
                    .with_optional_unit(unit(units, Quantity::Dipole)),
            ),
            _ => None,
        };
        if let Some(column) = vector {
            columns.push(column);
            i += 3;
            continue;
        }

        let column = match names[i] {
            "id" => TableColumn::new(A_ID, &["id"]),
            "type" => TableColumn::new(ATYPE, &["type"]),
            "q" => TableColumn::new("charge", &["q"])
                .with_optional_unit(unit(units, Quantity::Charge)),
            "mol" => TableColumn::new("molecule", &["mol"]).integer(),
            "ix" | "iy" | "iz" => TableColumn::new(names[i], &[names[i]]).integer(),
            other => TableColumn::new(other, &[other]),
        };
        columns.push(column);
        i += 1;
    }
    columns
}

pub fn read<R: BufRead>(mut reader: R, options: &AtomDumpLoadOptions) -> Result<System, Error> {
    let lines = numbered_lines(&mut reader)?;
    let length = units::optional_scale(options.units.unit(Quantity::Length))?;

    let mut timestep: Option<i64> = None;
    let mut natoms: Option<usize> = None;
    let mut sim_box: Option<SimBox> = None;
    let mut pbc = [true; 3];

    let mut cursor = 0;
    while cursor < lines.len() {
        let (line_number, line) = &lines[cursor];
        cursor += 1;
        let Some(item) = line.trim().strip_prefix("ITEM:").map(str::trim) else {
            continue;
        };

        if item == "TIMESTEP" {
            let (n, value) = value_line(&lines, cursor, *line_number)?;
            timestep = Some(parse_number(value.trim(), n)?);
            cursor += 1;
        } else if item == "NUMBER OF ATOMS" {
            let (n, value) = value_line(&lines, cursor, *line_number)?;
            natoms = Some(parse_number(value.trim(), n)?);
            cursor += 1;
        } else if let Some(rest) = item.strip_prefix("BOX BOUNDS") {
            let tokens: Vec<&str> = rest.split_whitespace().collect();
            let triclinic = tokens.starts_with(&["xy", "xz", "yz"]);
            let codes = if triclinic { &tokens[3..] } else { &tokens[..] };
            for (axis, code) in codes.iter().take(3).enumerate() {
                pbc[axis] = code.contains('p');
            }

            let mut lo = [0.0; 3];
            let mut hi = [0.0; 3];
            let mut tilt = [0.0; 3];
            for axis in 0..3 {
                let (n, value) = value_line(&lines, cursor + axis, *line_number)?;
                let fields: Vec<&str> = value.split_whitespace().collect();
                let expected = if triclinic { 3 } else { 2 };
                if fields.len() < expected {
                    return Err(Error::parse(
                        FORMAT,
                        None,
                        n,
                        format!("expected {expected} box values"),
                    ));
                }
                lo[axis] = parse_number::<f64>(fields[0], n)? * length;
                hi[axis] = parse_number::<f64>(fields[1], n)? * length;
                if triclinic {
                    tilt[axis] = parse_number::<f64>(fields[2], n)? * length;
                }
            }
            cursor += 3;

            sim_box = Some(if triclinic {
                SimBox::from_bounding_box(lo, hi, tilt)?
            } else {
                SimBox::orthogonal(lo, hi)?
            });
        } else if let Some(rest) = item.strip_prefix("ATOMS") {
            let natoms = natoms.ok_or_else(|| {
                Error::parse(FORMAT, None, *line_number, "ATOMS before NUMBER OF ATOMS")
            })?;
            let sim_box = sim_box.ok_or_else(|| {
                Error::parse(FORMAT, None, *line_number, "ATOMS before BOX BOUNDS")
            })?;
            if cursor + natoms > lines.len() {
                return Err(Error::inconsistent_data(
                    FORMAT,
                    None,
                    format!(
                        "expected {natoms} atom rows, found {}",
                        lines.len() - cursor
                    ),
                ));
            }

            let names: Vec<&str> = rest.split_whitespace().collect();
            let columns = columns_for(&names, options.units);
            let rows: Vec<(usize, &str)> = lines[cursor..cursor + natoms]
                .iter()
                .map(|(n, line)| (*n, line.as_str()))
                .collect();

            let atoms = table::read_rows(FORMAT, &rows, &columns, &sim_box, false)?;
            let atoms = table::order_by_id(FORMAT, atoms)?;

            tracing::debug!(natoms, timestep, "loaded dump snapshot");
            return Ok(System::new(sim_box, atoms, pbc));
        }
    }

    Err(Error::inconsistent_data(
        FORMAT,
        None,
        "no 'ITEM: ATOMS' section found",
    ))
}

fn value_line(
    lines: &[(usize, String)],
    index: usize,
    item_line: usize,
) -> Result<(usize, &str), Error> {
    lines
        .get(index)
        .map(|(n, line)| (*n, line.as_str()))
        .ok_or_else(|| Error::parse(FORMAT, None, item_line, "item is missing its values"))
}

fn parse_number<T: std::str::FromStr>(field: &str, line_number: usize) -> Result<T, Error> {
    field
        .parse()
        .map_err(|_| Error::parse(FORMAT, None, line_number, format!("invalid number '{field}'")))
}
