//! Whitespace-separated per-atom tables.
//!
//! A table is a sequence of rows, one per atom, whose columns are described by
//! [`TableColumn`]s. Each column maps one per-atom property onto one (scalar) or three
//! (vector) table fields and optionally converts the values to a named unit or to
//! box-relative coordinates. The LAMMPS codecs build their `Atoms`, `Velocities` and
//! `ITEM: ATOMS` sections from the same machinery.

use super::error::Error;
use super::float_format::FloatFormat;
use super::sink::numbered_lines;
use crate::model::atoms::{ATYPE, Atoms, Property};
use crate::model::sim_box::SimBox;
use crate::model::system::System;
use crate::units;
use nalgebra::Vector3;
use std::collections::HashSet;
use std::io::{BufRead, Write};

const FORMAT: &str = "table";

/// Pseudo-property holding the 1-based atom id.
pub const A_ID: &str = "a_id";

/// Unit treatment of a table column.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ColumnUnit {
    /// Values are written exactly as stored.
    #[default]
    None,
    /// Values are converted to this unit expression.
    Named(String),
    /// Vector values are written as box-relative coordinates.
    Scaled,
}

/// Mapping between one per-atom property and its table fields.
#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    pub prop_name: String,
    /// One name for scalar properties, three for vectors.
    pub table_names: Vec<String>,
    pub unit: ColumnUnit,
    /// Parse the field as an integer on load.
    pub integer: bool,
}

impl TableColumn {
    pub fn new(prop_name: impl Into<String>, table_names: &[&str]) -> Self {
        let prop_name = prop_name.into();
        let integer = prop_name == ATYPE || prop_name == A_ID;
        Self {
            prop_name,
            table_names: table_names.iter().map(|s| s.to_string()).collect(),
            unit: ColumnUnit::None,
            integer,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = ColumnUnit::Named(unit.into());
        self
    }

    pub(crate) fn with_optional_unit(self, unit: Option<String>) -> Self {
        match unit {
            Some(unit) => self.with_unit(unit),
            None => self,
        }
    }

    pub fn scaled(mut self) -> Self {
        self.unit = ColumnUnit::Scaled;
        self
    }

    pub fn integer(mut self) -> Self {
        self.integer = true;
        self
    }

    pub fn width(&self) -> usize {
        self.table_names.len()
    }
}

/// Options for writing a table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableOptions {
    /// Columns to write; `None` writes every property in insertion order.
    pub columns: Option<Vec<TableColumn>>,
    /// Emit a first line listing the table names.
    pub header: bool,
    pub float_format: FloatFormat,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            columns: None,
            header: true,
            float_format: FloatFormat::fixed(13),
        }
    }
}

/// Options for reading a table back into a system.
#[derive(Debug, Clone, PartialEq)]
pub struct TableLoadOptions {
    /// Column layout; `None` infers it from the header line.
    pub columns: Option<Vec<TableColumn>>,
    pub header: bool,
    /// Lines ignored before the header or first row.
    pub skip_rows: usize,
    /// Cell attached to the loaded system and used for [`ColumnUnit::Scaled`] columns.
    pub sim_box: SimBox,
    pub pbc: [bool; 3],
}

impl Default for TableLoadOptions {
    fn default() -> Self {
        Self {
            columns: None,
            header: true,
            skip_rows: 0,
            sim_box: SimBox::default(),
            pbc: [true; 3],
        }
    }
}

/// One column per property, vector components suffixed `[0]`, `[1]`, `[2]`.
pub fn default_columns(atoms: &Atoms) -> Vec<TableColumn> {
    atoms
        .columns()
        .map(|(name, prop)| match prop {
            Property::Vector(_) => {
                let names: Vec<String> = (0..3).map(|i| format!("{name}[{i}]")).collect();
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                TableColumn::new(name, &names)
            }
            Property::Integer(_) => TableColumn::new(name, &[name]).integer(),
            Property::Scalar(_) => TableColumn::new(name, &[name]),
        })
        .collect()
}

/// Writes the table for `system`.
pub fn write<W: Write>(mut writer: W, system: &System, options: &TableOptions) -> Result<(), Error> {
    let columns = match &options.columns {
        Some(columns) => columns.clone(),
        None => default_columns(system.atoms()),
    };
    let rows = render_rows(FORMAT, system, &columns, &options.float_format)?;

    if options.header {
        let names: Vec<&str> = columns
            .iter()
            .flat_map(|c| c.table_names.iter().map(String::as_str))
            .collect();
        writeln!(writer, "{}", names.join(" ")).map_err(|e| Error::from_io(e, None))?;
    }
    writer
        .write_all(rows.as_bytes())
        .map_err(|e| Error::from_io(e, None))
}

enum OutputColumn<'a> {
    Id,
    Integer(&'a [i64]),
    Scalar(&'a [f64], f64),
    Vector(&'a [Vector3<f64>], f64),
    Owned(Vec<Vector3<f64>>),
}

fn resolve_output<'a>(
    format: &'static str,
    system: &'a System,
    column: &TableColumn,
) -> Result<OutputColumn<'a>, Error> {
    let width_error = |width: usize| {
        Error::inconsistent_data(
            format,
            None,
            format!(
                "column '{}' needs {width} table name(s), got {}",
                column.prop_name,
                column.width()
            ),
        )
    };

    if column.prop_name == A_ID {
        if column.width() != 1 {
            return Err(width_error(1));
        }
        return Ok(OutputColumn::Id);
    }

    let property = system.atoms().get_property(&column.prop_name)?;
    if column.width() != property.width() {
        return Err(width_error(property.width()));
    }

    let scale = match &column.unit {
        ColumnUnit::Named(unit) => units::scale_of(unit)?,
        _ => 1.0,
    };

    match (property, &column.unit) {
        (Property::Vector(values), ColumnUnit::Scaled) => Ok(OutputColumn::Owned(system.scale(values))),
        (_, ColumnUnit::Scaled) => Err(Error::inconsistent_data(
            format,
            None,
            format!(
                "only vector properties can be written scaled, '{}' is not one",
                column.prop_name
            ),
        )),
        (Property::Integer(values), _) => Ok(OutputColumn::Integer(values)),
        (Property::Scalar(values), _) => Ok(OutputColumn::Scalar(values, scale)),
        (Property::Vector(values), _) => Ok(OutputColumn::Vector(values, scale)),
    }
}

/// Renders one line per atom for `columns`, separated by single spaces.
///
/// Every column is resolved before the first row, so callers can validate a layout before
/// writing anything.
pub(crate) fn render_rows(
    format: &'static str,
    system: &System,
    columns: &[TableColumn],
    float_format: &FloatFormat,
) -> Result<String, Error> {
    let resolved = columns
        .iter()
        .map(|c| resolve_output(format, system, c))
        .collect::<Result<Vec<_>, _>>()?;

    let mut text = String::new();
    let mut fields: Vec<String> = Vec::new();
    for index in 0..system.natoms() {
        fields.clear();
        for column in &resolved {
            match column {
                OutputColumn::Id => fields.push((index + 1).to_string()),
                OutputColumn::Integer(values) => fields.push(values[index].to_string()),
                OutputColumn::Scalar(values, scale) => {
                    fields.push(float_format.format(values[index] / scale))
                }
                OutputColumn::Vector(values, scale) => fields.extend(
                    values[index]
                        .iter()
                        .map(|v| float_format.format(v / scale)),
                ),
                OutputColumn::Owned(values) => {
                    fields.extend(values[index].iter().map(|&v| float_format.format(v)))
                }
            }
        }
        text.push_str(&fields.join(" "));
        text.push('\n');
    }

    tracing::trace!(format, rows = system.natoms(), "rendered table rows");
    Ok(text)
}

/// Reads a table into a new system.
pub fn read<R: BufRead>(mut reader: R, options: &TableLoadOptions) -> Result<System, Error> {
    let lines = numbered_lines(&mut reader)?;
    let mut lines = lines
        .iter()
        .skip(options.skip_rows)
        .filter(|(_, line)| !line.trim().is_empty());

    let header = if options.header {
        lines.next().map(|(_, line)| line.as_str())
    } else {
        None
    };

    let columns = match (&options.columns, header) {
        (Some(columns), _) => columns.clone(),
        (None, Some(header)) => infer_columns(&header.split_whitespace().collect::<Vec<_>>()),
        (None, None) => {
            return Err(Error::argument_conflict(
                "reading a table needs explicit columns or a header line",
            ));
        }
    };

    let rows: Vec<(usize, &str)> = lines.map(|(n, line)| (*n, line.as_str())).collect();
    let atoms = read_rows(FORMAT, &rows, &columns, &options.sim_box, false)?;
    let atoms = order_by_id(FORMAT, atoms)?;

    tracing::debug!(natoms = atoms.natoms(), "loaded table");
    Ok(System::new(options.sim_box, atoms, options.pbc))
}

/// Groups `name[0] name[1] name[2]` runs into vector columns.
fn infer_columns(names: &[&str]) -> Vec<TableColumn> {
    let mut columns = Vec::new();
    let mut i = 0;
    while i < names.len() {
        let vector_name = names[i].strip_suffix("[0]").filter(|base| {
            i + 2 < names.len()
                && names[i + 1] == format!("{base}[1]")
                && names[i + 2] == format!("{base}[2]")
        });
        match vector_name {
            Some(base) => {
                columns.push(TableColumn::new(base, &names[i..i + 3]));
                i += 3;
            }
            None => {
                columns.push(TableColumn::new(names[i], &names[i..i + 1]));
                i += 1;
            }
        }
    }
    columns
}

enum InputColumn {
    Integer(Vec<i64>),
    Scalar(Vec<f64>),
    Vector(Vec<Vector3<f64>>),
}

/// Parses `rows` (line number, text) into atoms, one row per atom.
///
/// Text after `#` is ignored. With `image_flags`, a row may also end in exactly three integer
/// image flags, which are checked and skipped.
pub(crate) fn read_rows(
    format: &'static str,
    rows: &[(usize, &str)],
    columns: &[TableColumn],
    sim_box: &SimBox,
    image_flags: bool,
) -> Result<Atoms, Error> {
    let mut buffers = Vec::with_capacity(columns.len());
    let mut scales = Vec::with_capacity(columns.len());
    for column in columns {
        let buffer = match (column.width(), column.integer) {
            (1, true) => InputColumn::Integer(Vec::with_capacity(rows.len())),
            (1, false) => InputColumn::Scalar(Vec::with_capacity(rows.len())),
            (3, false) => InputColumn::Vector(Vec::with_capacity(rows.len())),
            (width, _) => {
                return Err(Error::inconsistent_data(
                    format,
                    None,
                    format!(
                        "column '{}' cannot span {width} table field(s)",
                        column.prop_name
                    ),
                ));
            }
        };
        if column.unit == ColumnUnit::Scaled && !matches!(buffer, InputColumn::Vector(_)) {
            return Err(Error::inconsistent_data(
                format,
                None,
                format!("scaled column '{}' must be a vector", column.prop_name),
            ));
        }
        buffers.push(buffer);
        scales.push(match &column.unit {
            ColumnUnit::Named(unit) => units::scale_of(unit)?,
            _ => 1.0,
        });
    }

    let expected: usize = columns.iter().map(TableColumn::width).sum();

    for &(line_number, line) in rows {
        let content = line.split('#').next().unwrap_or_default();
        let fields: Vec<&str> = content.split_whitespace().collect();
        let flagged = image_flags && fields.len() == expected + 3;
        if fields.len() != expected && !flagged {
            let wanted = if image_flags {
                format!("{expected} or {}", expected + 3)
            } else {
                expected.to_string()
            };
            return Err(Error::parse(
                format,
                None,
                line_number,
                format!("expected {wanted} fields, found {}", fields.len()),
            ));
        }
        if flagged {
            for flag in &fields[expected..] {
                parse_field::<i64>(format, line_number, Some(flag))?;
            }
        }

        let mut fields = fields.into_iter();
        for ((buffer, column), &scale) in buffers.iter_mut().zip(columns).zip(&scales) {
            match buffer {
                InputColumn::Integer(values) => {
                    values.push(parse_field(format, line_number, fields.next())?);
                }
                InputColumn::Scalar(values) => {
                    let value: f64 = parse_field(format, line_number, fields.next())?;
                    values.push(value * scale);
                }
                InputColumn::Vector(values) => {
                    let mut v = Vector3::zeros();
                    for k in 0..3 {
                        v[k] = parse_field(format, line_number, fields.next())?;
                    }
                    values.push(match column.unit {
                        ColumnUnit::Scaled => sim_box.position_absolute(&v),
                        _ => v * scale,
                    });
                }
            }
        }
    }

    let mut atoms = Atoms::new(rows.len());
    for (buffer, column) in buffers.into_iter().zip(columns) {
        let property = match buffer {
            InputColumn::Integer(values) => Property::Integer(values),
            InputColumn::Scalar(values) => Property::Scalar(values),
            InputColumn::Vector(values) => Property::Vector(values),
        };
        atoms.add_property(&column.prop_name, property)?;
    }
    Ok(atoms)
}

fn parse_field<T: std::str::FromStr>(
    format: &'static str,
    line_number: usize,
    field: Option<&str>,
) -> Result<T, Error> {
    let field = field.ok_or_else(|| Error::parse(format, None, line_number, "missing field"))?;
    field
        .parse()
        .map_err(|_| Error::parse(format, None, line_number, format!("invalid value '{field}'")))
}

/// Reorders atoms by their `a_id` column and drops it.
pub(crate) fn order_by_id(format: &'static str, atoms: Atoms) -> Result<Atoms, Error> {
    if !atoms.contains(A_ID) {
        return Ok(atoms);
    }
    let ids = atoms.integer(A_ID)?;

    let mut seen = HashSet::with_capacity(ids.len());
    if let Some(duplicate) = ids.iter().find(|id| !seen.insert(**id)) {
        return Err(Error::inconsistent_data(
            format,
            None,
            format!("atom id {duplicate} appears more than once"),
        ));
    }

    let mut order: Vec<usize> = (0..ids.len()).collect();
    order.sort_by_key(|&i| ids[i]);

    let mut sorted = atoms.subset(&order);
    sorted.remove_property(A_ID)?;
    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::atoms::POS;

    fn sample_system() -> System {
        let mut atoms = Atoms::from_types_and_positions(
            vec![1, 2],
            vec![Vector3::new(1.0, 2.0, 3.0), Vector3::new(5.0, 5.0, 5.0)],
        )
        .unwrap();
        atoms.add_property("charge", vec![0.5, -0.5]).unwrap();
        System::new(SimBox::cubic(10.0).unwrap(), atoms, [true; 3])
    }

    fn render(system: &System, options: &TableOptions) -> String {
        let mut buffer = Vec::new();
        write(&mut buffer, system, options).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn default_columns_cover_every_property() {
        let system = sample_system();
        let columns = default_columns(system.atoms());
        let names: Vec<&str> = columns
            .iter()
            .flat_map(|c| c.table_names.iter().map(String::as_str))
            .collect();
        assert_eq!(names, ["atype", "pos[0]", "pos[1]", "pos[2]", "charge"]);
        assert!(columns[0].integer);
    }

    #[test]
    fn writes_header_and_rows() {
        let options = TableOptions {
            header: true,
            float_format: "%.2f".parse().unwrap(),
            ..TableOptions::default()
        };
        let text = render(&sample_system(), &options);
        assert_eq!(
            text,
            "atype pos[0] pos[1] pos[2] charge\n\
             1 1.00 2.00 3.00 0.50\n\
             2 5.00 5.00 5.00 -0.50\n"
        );
    }

    #[test]
    fn writes_ids_units_and_scaled_columns() {
        let options = TableOptions {
            columns: Some(vec![
                TableColumn::new(A_ID, &["id"]),
                TableColumn::new(POS, &["x", "y", "z"]).with_unit("nm"),
                TableColumn::new(POS, &["xs", "ys", "zs"]).scaled(),
            ]),
            header: false,
            float_format: "%.1f".parse().unwrap(),
        };
        let text = render(&sample_system(), &options);
        assert_eq!(text, "1 0.1 0.2 0.3 0.1 0.2 0.3\n2 0.5 0.5 0.5 0.5 0.5 0.5\n");
    }

    #[test]
    fn rejects_mismatched_column_width() {
        let options = TableOptions {
            columns: Some(vec![TableColumn::new(POS, &["x"])]),
            ..TableOptions::default()
        };
        let mut buffer = Vec::new();
        let err = write(&mut buffer, &sample_system(), &options).unwrap_err();
        assert!(matches!(err, Error::InconsistentData { .. }));
        assert!(buffer.is_empty());
    }

    #[test]
    fn rejects_scalar_written_as_vector_before_header() {
        let mut system = sample_system();
        system
            .atoms_mut()
            .add_property("velocity", vec![1.0, 2.0])
            .unwrap();
        let options = TableOptions {
            columns: Some(vec![
                TableColumn::new(ATYPE, &["type"]),
                TableColumn::new("velocity", &["vx", "vy", "vz"]),
            ]),
            header: true,
            ..TableOptions::default()
        };
        let mut buffer = Vec::new();
        assert!(write(&mut buffer, &system, &options).is_err());
        assert!(buffer.is_empty());
    }

    #[test]
    fn image_flags_must_be_three_integers() {
        let columns = vec![
            TableColumn::new(ATYPE, &["type"]),
            TableColumn::new(POS, &["x", "y", "z"]),
        ];
        let sim_box = SimBox::cubic(10.0).unwrap();

        let atoms = read_rows(FORMAT, &[(1, "1 0 0 0 1 -1 0")], &columns, &sim_box, true).unwrap();
        assert_eq!(atoms.natoms(), 1);

        for row in ["1 0 0 0 1", "1 0 0 0 1 0", "1 0 0 0 0.5 0 0"] {
            let err = read_rows(FORMAT, &[(7, row)], &columns, &sim_box, true).unwrap_err();
            assert!(matches!(err, Error::Parse { line_number: 7, .. }), "{row}: {err:?}");
        }
    }

    #[test]
    fn rejects_missing_property() {
        let options = TableOptions {
            columns: Some(vec![TableColumn::new("velocity", &["vx", "vy", "vz"])]),
            ..TableOptions::default()
        };
        let err = write(Vec::new(), &sample_system(), &options).unwrap_err();
        assert!(matches!(err, Error::Model(_)));
    }

    #[test]
    fn default_options_round_trip_through_header() {
        let system = sample_system();
        let text = render(&system, &TableOptions::default());
        assert!(text.starts_with("atype pos[0] pos[1] pos[2] charge\n"));

        let loaded = read(text.as_bytes(), &TableLoadOptions::default()).unwrap();
        assert_eq!(loaded.atoms().atype(), &[1, 2]);
        assert_eq!(loaded.atoms().pos(), system.atoms().pos());
        assert_eq!(loaded.atoms().scalar("charge").unwrap(), &[0.5, -0.5]);
    }

    #[test]
    fn reads_rows_in_id_order_with_units_and_scaling() {
        let text = "# comment line\n3 1 0.1 0.2 0.3\n1 2 0.5 0.5 0.5\n2 1 0.0 0.0 0.0\n";
        let options = TableLoadOptions {
            columns: Some(vec![
                TableColumn::new(A_ID, &["id"]),
                TableColumn::new(ATYPE, &["type"]),
                TableColumn::new(POS, &["xs", "ys", "zs"]).scaled(),
            ]),
            header: false,
            skip_rows: 1,
            sim_box: SimBox::cubic(10.0).unwrap(),
            pbc: [true; 3],
        };

        let system = read(text.as_bytes(), &options).unwrap();
        assert_eq!(system.natoms(), 3);
        assert_eq!(system.atoms().atype(), &[2, 1, 1]);
        assert!((system.atoms().pos()[2] - Vector3::new(1.0, 2.0, 3.0)).norm() < 1e-12);
        assert!(!system.atoms().contains(A_ID));
    }

    #[test]
    fn reports_line_numbers_for_bad_rows() {
        let text = "atype x\n1 0.5\n1 oops\n";
        let err = read(text.as_bytes(), &TableLoadOptions::default()).unwrap_err();
        match err {
            Error::Parse { line_number, .. } => assert_eq!(line_number, 3),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rejects_duplicate_ids() {
        let text = "a_id atype\n1 1\n1 2\n";
        let err = read(text.as_bytes(), &TableLoadOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InconsistentData { .. }));
    }

    #[test]
    fn table_without_columns_or_header_is_rejected() {
        let options = TableLoadOptions {
            header: false,
            ..TableLoadOptions::default()
        };
        let err = read("1 2 3\n".as_bytes(), &options).unwrap_err();
        assert!(matches!(err, Error::ArgumentConflict { .. }));
    }
}
