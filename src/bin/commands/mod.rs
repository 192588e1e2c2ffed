use std::fmt;
use std::io::{self as stdio, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use is_terminal::IsTerminal;

use atom_forge::System;
use atom_forge::units::UnitStyle;
use atom_forge::io::{self, Destination, DumpOutput, DumpRequest, LoadRequest, Source, Style};

pub mod convert;
pub mod info;
pub mod wrap;

/// Text formats the CLI can read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FileFormat {
    /// LAMMPS atom data file.
    #[value(name = "data")]
    AtomData,
    /// LAMMPS `dump custom` snapshot.
    #[value(name = "dump")]
    AtomDump,
    /// Whitespace-separated column table.
    #[value(name = "table")]
    Table,
    /// VASP POSCAR.
    #[value(name = "poscar")]
    Poscar,
    /// JSON system model document.
    #[value(name = "json")]
    SystemModel,
}

impl FileFormat {
    /// Attempts to infer a format from a file name or extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_uppercase();
        if name.starts_with("POSCAR") || name.starts_with("CONTCAR") {
            return Some(Self::Poscar);
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "data" | "lmp" | "lammps" => Some(Self::AtomData),
            "dump" | "lammpstrj" => Some(Self::AtomDump),
            "txt" | "table" => Some(Self::Table),
            "poscar" | "vasp" => Some(Self::Poscar),
            "json" => Some(Self::SystemModel),
            _ => None,
        }
    }

    pub fn style(&self) -> Style {
        match self {
            FileFormat::AtomData => Style::AtomData,
            FileFormat::AtomDump => Style::AtomDump,
            FileFormat::Table => Style::Table,
            FileFormat::Poscar => Style::Poscar,
            FileFormat::SystemModel => Style::SystemModel,
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::AtomData => write!(f, "LAMMPS data"),
            FileFormat::AtomDump => write!(f, "LAMMPS dump"),
            FileFormat::Table => write!(f, "table"),
            FileFormat::Poscar => write!(f, "POSCAR"),
            FileFormat::SystemModel => write!(f, "system model"),
        }
    }
}

/// Aggregated IO parameters shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct IoParameters {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub input_format: Option<FileFormat>,
    pub output_format: Option<FileFormat>,
    /// LAMMPS units of LAMMPS-formatted input.
    pub input_units: Option<UnitStyle>,
}

impl IoParameters {
    pub fn resolve_input_format(&self) -> Result<FileFormat> {
        if let Some(explicit) = self.input_format {
            Ok(explicit)
        } else if let Some(path) = &self.input {
            FileFormat::from_path(path).ok_or_else(|| {
                anyhow!(
                    "Unable to infer input format from '{}'. Please specify --format.",
                    path.display()
                )
            })
        } else {
            Ok(FileFormat::AtomData)
        }
    }

    /// Falls back to the input format when the output gives no hint.
    pub fn resolve_output_format(&self) -> Result<FileFormat> {
        if let Some(explicit) = self.output_format {
            return Ok(explicit);
        }

        match &self.output {
            Some(path) => FileFormat::from_path(path).ok_or_else(|| {
                anyhow!(
                    "Unable to infer output format from '{}'. Please specify --out-format.",
                    path.display()
                )
            }),
            None => self.resolve_input_format(),
        }
    }
}

/// Loads a system from the configured input source.
pub fn load_input(params: &IoParameters) -> Result<(System, FileFormat)> {
    let format = params.resolve_input_format()?;
    let mut request = LoadRequest::default_for(format.style())?;
    if let Some(units) = params.input_units {
        match &mut request {
            LoadRequest::AtomData(options) => options.units = units,
            LoadRequest::AtomDump(options) => options.units = units,
            _ => tracing::warn!(%format, "--in-units has no effect on this input format"),
        }
    }

    let system = if let Some(path) = &params.input {
        io::load(&request, Source::path(path))
            .with_context(|| format!("Failed to parse {} input from {}", format, path.display()))?
    } else {
        let stdin = stdio::stdin();
        if stdin.is_terminal() {
            bail!(
                "No --input provided and stdin is a TTY. Provide -i/--input or pipe a file into atomforge."
            );
        }
        let mut reader = BufReader::new(stdin.lock());
        io::load(&request, Source::Reader(&mut reader))
            .with_context(|| format!("Failed to parse {} input from stdin", format))?
    };

    tracing::info!(natoms = system.natoms(), %format, "loaded input");
    Ok((system, format))
}

/// Saves a system to the configured output destination and returns the dump result.
pub fn save_output(
    system: &mut System,
    request: &DumpRequest,
    params: &IoParameters,
) -> Result<DumpOutput> {
    let style = request.style();
    match &params.output {
        Some(path) => system
            .dump(request, Destination::path(path))
            .with_context(|| format!("Failed to write {} output to {}", style, path.display())),
        None => {
            let mut stdout = stdio::stdout().lock();
            system
                .dump(request, Destination::Stream(&mut stdout))
                .with_context(|| format!("Failed to write {} output to stdout", style))
        }
    }
}

/// Runs `work` over a system of `natoms` atoms behind a stderr spinner.
///
/// The spinner is hidden when stderr is not a terminal; the elapsed time is logged either way.
pub fn run_with_spinner<T, F>(step: &str, natoms: usize, work: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let spinner = if stdio::stderr().is_terminal() {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::hidden()
    };
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("{step} ({natoms} atoms)"));

    let result = work();
    let elapsed = spinner.elapsed();

    match &result {
        Ok(_) => spinner.finish_with_message(format!("{step}: done ({natoms} atoms)")),
        Err(_) => spinner.abandon_with_message(format!("{step}: failed")),
    }
    tracing::debug!(step, natoms, elapsed_ms = elapsed.as_millis() as u64, "finished step");

    result
}

/// Returns true when stdout is a TTY and no explicit output file was supplied.
pub fn interactive_stdout_requested(params: &IoParameters) -> bool {
    params.output.is_none() && stdio::stdout().is_terminal()
}

/// Fails when `command` would print `format` text straight into a terminal.
pub fn refuse_terminal_output(command: &str, format: FileFormat, params: &IoParameters) -> Result<()> {
    if interactive_stdout_requested(params) {
        bail!(
            "`atomforge {command}` produces {format} text; write it with -o/--output <file> or redirect stdout."
        );
    }
    Ok(())
}

/// Prints the LAMMPS input lines returned by an atom data dump to stderr.
pub fn report_info(output: &DumpOutput) {
    if let Some(info) = output.info() {
        eprintln!("{info}");
    }
}
