use super::FORMAT;
use super::styles::{AtomStyle, VELOCITY};
use crate::io::error::Error;
use crate::io::sink::numbered_lines;
use crate::io::table::{self, A_ID};
use crate::model::atoms::Atoms;
use crate::model::sim_box::SimBox;
use crate::model::system::System;
use crate::units::{self, Quantity, UnitStyle};
use std::io::BufRead;
use std::str::FromStr;

/// Options for reading a LAMMPS atom data file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtomDataLoadOptions {
    /// Layout of the `Atoms` section; `None` uses the section's `# style` comment, then `atomic`.
    pub atom_style: Option<AtomStyle>,
    pub units: UnitStyle,
}

#[derive(Debug, Default)]
struct Header {
    natoms: Option<usize>,
    natypes: usize,
    lo: [f64; 3],
    hi: [f64; 3],
    tilt: [f64; 3],
    bounds_seen: [bool; 3],
}

pub fn read<R: BufRead>(mut reader: R, options: &AtomDataLoadOptions) -> Result<System, Error> {
    let lines = numbered_lines(&mut reader)?;

    // The first line is a free-form title.
    let mut header = Header::default();
    let mut cursor = 1;
    while cursor < lines.len() {
        let (line_number, raw) = &lines[cursor];
        let content = strip_comment(raw);
        if content.is_empty() {
            cursor += 1;
            continue;
        }
        if starts_section(content) {
            break;
        }
        parse_header_line(&mut header, *line_number, content)?;
        cursor += 1;
    }

    let natoms = header
        .natoms
        .ok_or_else(|| Error::inconsistent_data(FORMAT, None, "missing 'atoms' count"))?;
    if let Some(axis) = header.bounds_seen.iter().position(|seen| !seen) {
        let label = ["x", "y", "z"][axis];
        return Err(Error::inconsistent_data(
            FORMAT,
            None,
            format!("missing '{label}lo {label}hi' bounds"),
        ));
    }

    let mut section = "";
    let mut style_comment: Option<&str> = None;
    let mut atom_rows: Vec<(usize, &str)> = Vec::new();
    let mut velocity_rows: Vec<(usize, &str)> = Vec::new();
    for (line_number, raw) in &lines[cursor..] {
        let content = strip_comment(raw);
        if content.is_empty() {
            continue;
        }
        if starts_section(content) {
            section = content;
            if section == "Atoms" {
                style_comment = raw
                    .split_once('#')
                    .map(|(_, comment)| comment.trim())
                    .filter(|comment| !comment.is_empty());
            }
            tracing::trace!(section, line = line_number, "entering section");
            continue;
        }
        match section {
            "Atoms" => atom_rows.push((*line_number, raw.as_str())),
            "Velocities" => velocity_rows.push((*line_number, raw.as_str())),
            _ => {}
        }
    }

    let atom_style = match (options.atom_style, style_comment) {
        (Some(style), _) => style,
        (None, Some(comment)) => AtomStyle::from_str(comment)?,
        (None, None) => AtomStyle::Atomic,
    };

    if atom_rows.len() != natoms {
        return Err(Error::inconsistent_data(
            FORMAT,
            None,
            format!(
                "header declares {natoms} atoms but the Atoms section has {} rows",
                atom_rows.len()
            ),
        ));
    }

    let length = units::optional_scale(options.units.unit(Quantity::Length))?;
    let scale = |v: [f64; 3]| v.map(|x| x * length);
    let sim_box = SimBox::from_bounds(scale(header.lo), scale(header.hi), header.tilt)?;

    let columns = atom_style.atom_columns(options.units);
    let atoms = table::read_rows(FORMAT, &atom_rows, &columns, &sim_box, true)?;
    let atom_ids = sorted_ids(&atoms)?;
    let mut atoms = table::order_by_id(FORMAT, atoms)?;

    if !velocity_rows.is_empty() {
        let columns = atom_style.velocity_columns(options.units);
        let velocities = table::read_rows(FORMAT, &velocity_rows, &columns, &sim_box, false)?;
        if sorted_ids(&velocities)? != atom_ids {
            return Err(Error::inconsistent_data(
                FORMAT,
                None,
                "Velocities ids do not match the Atoms ids",
            ));
        }
        let velocities = table::order_by_id(FORMAT, velocities)?;
        for prop in atom_style.velocity_properties() {
            atoms.add_property(prop, velocities.get_property(prop)?.clone())?;
        }
    }

    let mut system = System::new(sim_box, atoms, [true; 3]);
    system.set_natypes(header.natypes);

    tracing::debug!(
        natoms,
        natypes = system.natypes(),
        atom_style = %atom_style,
        velocities = system.atoms().contains(VELOCITY),
        "loaded atom data"
    );
    Ok(system)
}

fn strip_comment(line: &str) -> &str {
    line.split('#').next().unwrap_or_default().trim()
}

/// Section headers are the only lines that begin with a letter.
fn starts_section(content: &str) -> bool {
    content.starts_with(|c: char| c.is_ascii_alphabetic())
}

fn parse_header_line(header: &mut Header, line_number: usize, content: &str) -> Result<(), Error> {
    let fields: Vec<&str> = content.split_whitespace().collect();
    let number = |field: &str| -> Result<f64, Error> {
        field.parse().map_err(|_| {
            Error::parse(FORMAT, None, line_number, format!("invalid number '{field}'"))
        })
    };
    let count = |field: &str| -> Result<usize, Error> {
        field.parse().map_err(|_| {
            Error::parse(FORMAT, None, line_number, format!("invalid count '{field}'"))
        })
    };

    match fields.as_slice() {
        [n, "atoms"] => header.natoms = Some(count(*n)?),
        [n, "atom", "types"] => header.natypes = count(*n)?,
        [lo, hi, lo_label, hi_label] if lo_label.ends_with("lo") && hi_label.ends_with("hi") => {
            let axis = match *lo_label {
                "xlo" => 0,
                "ylo" => 1,
                "zlo" => 2,
                _ => return Ok(()),
            };
            header.lo[axis] = number(*lo)?;
            header.hi[axis] = number(*hi)?;
            header.bounds_seen[axis] = true;
        }
        [xy, xz, yz, "xy", "xz", "yz"] => {
            header.tilt = [number(*xy)?, number(*xz)?, number(*yz)?];
        }
        _ => tracing::trace!(line = line_number, content, "skipping header line"),
    }
    Ok(())
}

fn sorted_ids(atoms: &Atoms) -> Result<Vec<i64>, Error> {
    let mut ids = atoms.integer(A_ID)?.to_vec();
    ids.sort_unstable();
    Ok(ids)
}
