use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args;
use prettytable::{Table, format, row};

use atom_forge::{Property, System};

use crate::commands::run_with_spinner;

/// Report-only command that inspects a system and mirrors the input stream.
#[derive(Debug, Default, Args)]
pub struct InfoArgs {}

/// Computes and prints system statistics without mutating the system.
pub fn run(system: &System, _args: &InfoArgs) -> Result<()> {
    let (type_reports, property_reports, box_metrics) =
        run_with_spinner("Collecting system statistics", system.natoms(), || {
            Ok((
                collect_type_reports(system),
                collect_property_reports(system),
                BoxMetrics::of(system),
            ))
        })?;

    print_tables(system, &type_reports, &property_reports, &box_metrics)?;
    Ok(())
}

fn collect_type_reports(system: &System) -> Vec<TypeReport> {
    let atypes = system.atoms().atype();
    (1..=system.natypes() as i64)
        .map(|atype| TypeReport {
            atype,
            symbol: system.symbol_of(atype).unwrap_or("-").to_string(),
            atoms: atypes.iter().filter(|&&t| t == atype).count(),
        })
        .collect()
}

fn collect_property_reports(system: &System) -> Vec<PropertyReport> {
    let atoms = system.atoms();
    atoms
        .prop_names()
        .into_iter()
        .filter_map(|name| {
            let property = atoms.property(name)?;
            Some(PropertyReport {
                name: name.to_string(),
                kind: kind_label(property),
                width: property.width(),
                range: value_range(property),
            })
        })
        .collect()
}

fn kind_label(property: &Property) -> &'static str {
    match property {
        Property::Integer(_) => "integer",
        Property::Scalar(_) => "scalar",
        Property::Vector(_) => "vector",
    }
}

fn value_range(property: &Property) -> String {
    let (min, max) = match property {
        Property::Integer(values) => {
            let min = values.iter().min();
            let max = values.iter().max();
            return match (min, max) {
                (Some(min), Some(max)) => format!("{min} .. {max}"),
                _ => "-".to_string(),
            };
        }
        Property::Scalar(values) => values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            }),
        Property::Vector(values) => values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v.norm()), hi.max(v.norm()))
            }),
    };
    if min > max {
        "-".to_string()
    } else {
        format!("{min:.4} .. {max:.4}")
    }
}

fn print_tables(
    system: &System,
    types: &[TypeReport],
    properties: &[PropertyReport],
    metrics: &BoxMetrics,
) -> Result<()> {
    let mut stderr = io::stderr().lock();

    write_section(&mut stderr, "System report", None)?;

    let mut type_table = Table::new();
    write_section(&mut stderr, "Atom types", Some(types.len()))?;
    type_table.set_format(*format::consts::FORMAT_BOX_CHARS);
    type_table.set_titles(row!["Type", "Symbol", "Atoms"]);
    for report in types {
        type_table.add_row(row![report.atype, report.symbol, report.atoms]);
    }
    type_table
        .print(&mut stderr)
        .context("Failed to render atom type summary")?;
    writeln!(&mut stderr)?;

    let mut property_table = Table::new();
    write_section(&mut stderr, "Per-atom properties", Some(properties.len()))?;
    property_table.set_format(*format::consts::FORMAT_BOX_CHARS);
    property_table.set_titles(row!["Name", "Kind", "Width", "Range"]);
    for report in properties {
        property_table.add_row(row![report.name, report.kind, report.width, report.range]);
    }
    property_table
        .print(&mut stderr)
        .context("Failed to render property summary")?;
    writeln!(&mut stderr)?;

    let mut summary_table = Table::new();
    write_section(&mut stderr, "Cell and atoms", None)?;
    summary_table.set_format(*format::consts::FORMAT_BOX_CHARS);
    summary_table.set_titles(row!["Metric", "Value"]);
    summary_table.add_row(row!["Atoms", system.natoms()]);
    summary_table.add_row(row!["Atom Types", system.natypes()]);
    summary_table.add_row(row![
        "Box Lengths",
        format!(
            "a = {a:.4}, b = {b:.4}, c = {c:.4}",
            a = metrics.a,
            b = metrics.b,
            c = metrics.c
        )
    ]);
    summary_table.add_row(row![
        "Box Angles (°)",
        format!(
            "α = {alpha:.2}, β = {beta:.2}, γ = {gamma:.2}",
            alpha = metrics.alpha,
            beta = metrics.beta,
            gamma = metrics.gamma
        )
    ]);
    summary_table.add_row(row!["Volume", format!("{:.4}", metrics.volume)]);
    summary_table.add_row(row!["Periodic", metrics.pbc]);
    summary_table
        .print(&mut stderr)
        .context("Failed to render system summary")?;

    Ok(())
}

/// Section title underlined to its own width, with an optional entry count.
fn write_section<W: Write>(writer: &mut W, title: &str, entries: Option<usize>) -> io::Result<()> {
    let heading = match entries {
        Some(n) => format!("{title} [{n}]"),
        None => title.to_string(),
    };
    writeln!(writer, "{heading}")?;
    writeln!(writer, "{}", "=".repeat(heading.chars().count()))
}

#[derive(Debug)]
struct TypeReport {
    atype: i64,
    symbol: String,
    atoms: usize,
}

#[derive(Debug)]
struct PropertyReport {
    name: String,
    kind: &'static str,
    width: usize,
    range: String,
}

#[derive(Debug)]
struct BoxMetrics {
    a: f64,
    b: f64,
    c: f64,
    alpha: f64,
    beta: f64,
    gamma: f64,
    volume: f64,
    pbc: String,
}

impl BoxMetrics {
    fn of(system: &System) -> Self {
        let sim_box = system.sim_box();
        let pbc = ["x", "y", "z"]
            .iter()
            .zip(system.pbc)
            .filter(|(_, periodic)| *periodic)
            .map(|(axis, _)| *axis)
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            a: sim_box.a(),
            b: sim_box.b(),
            c: sim_box.c(),
            alpha: sim_box.alpha(),
            beta: sim_box.beta(),
            gamma: sim_box.gamma(),
            volume: sim_box.volume(),
            pbc: if pbc.is_empty() { "none".to_string() } else { pbc },
        }
    }
}
