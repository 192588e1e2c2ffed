//! Format registry: routes dump and load requests to the codec for each style.

use super::atom_data::{self, AtomDataLoadOptions, AtomDataOptions};
use super::atom_dump::{self, AtomDumpLoadOptions, AtomDumpOptions};
use super::error::Error;
use super::mirror::{self, AseAtoms, PymatgenStructure};
use super::poscar::{self, PoscarOptions};
use super::sink::{self, Delivered, Destination, Source};
use super::system_model::{self, SystemModelOptions};
use super::table::{self, TableLoadOptions, TableOptions};
use crate::model::system::System;
use std::fmt;
use std::str::FromStr;

/// Every format a system can be dumped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Style {
    SystemModel,
    AtomData,
    AtomDump,
    Table,
    AseAtoms,
    PymatgenStructure,
    Poscar,
}

impl Style {
    pub const ALL: [Style; 7] = [
        Style::SystemModel,
        Style::AtomData,
        Style::AtomDump,
        Style::Table,
        Style::AseAtoms,
        Style::PymatgenStructure,
        Style::Poscar,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Style::SystemModel => "system_model",
            Style::AtomData => "atom_data",
            Style::AtomDump => "atom_dump",
            Style::Table => "table",
            Style::AseAtoms => "ase_Atoms",
            Style::PymatgenStructure => "pymatgen_Structure",
            Style::Poscar => "poscar",
        }
    }

    /// Whether the style produces text rather than an in-memory structure.
    pub fn is_text(&self) -> bool {
        !matches!(self, Style::AseAtoms | Style::PymatgenStructure)
    }
}

impl FromStr for Style {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Style::ALL
            .into_iter()
            .find(|style| style.name() == s)
            .ok_or_else(|| Error::unsupported_style(s))
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A dump style together with its format-specific options.
#[derive(Debug, Clone, PartialEq)]
pub enum DumpRequest {
    SystemModel(SystemModelOptions),
    AtomData(AtomDataOptions),
    AtomDump(AtomDumpOptions),
    Table(TableOptions),
    AseAtoms,
    PymatgenStructure,
    Poscar(PoscarOptions),
}

impl DumpRequest {
    pub fn default_for(style: Style) -> Self {
        match style {
            Style::SystemModel => DumpRequest::SystemModel(SystemModelOptions::default()),
            Style::AtomData => DumpRequest::AtomData(AtomDataOptions::default()),
            Style::AtomDump => DumpRequest::AtomDump(AtomDumpOptions::default()),
            Style::Table => DumpRequest::Table(TableOptions::default()),
            Style::AseAtoms => DumpRequest::AseAtoms,
            Style::PymatgenStructure => DumpRequest::PymatgenStructure,
            Style::Poscar => DumpRequest::Poscar(PoscarOptions::default()),
        }
    }

    pub fn style(&self) -> Style {
        match self {
            DumpRequest::SystemModel(_) => Style::SystemModel,
            DumpRequest::AtomData(_) => Style::AtomData,
            DumpRequest::AtomDump(_) => Style::AtomDump,
            DumpRequest::Table(_) => Style::Table,
            DumpRequest::AseAtoms => Style::AseAtoms,
            DumpRequest::PymatgenStructure => Style::PymatgenStructure,
            DumpRequest::Poscar(_) => Style::Poscar,
        }
    }
}

/// A load style together with its format-specific options.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadRequest {
    SystemModel,
    AtomData(AtomDataLoadOptions),
    AtomDump(AtomDumpLoadOptions),
    Table(TableLoadOptions),
    Poscar,
}

impl LoadRequest {
    /// Fails with `ArgumentConflict` for the in-memory mirror styles, which load through
    /// [`load_ase`] and [`load_pymatgen`] instead.
    pub fn default_for(style: Style) -> Result<Self, Error> {
        match style {
            Style::SystemModel => Ok(LoadRequest::SystemModel),
            Style::AtomData => Ok(LoadRequest::AtomData(AtomDataLoadOptions::default())),
            Style::AtomDump => Ok(LoadRequest::AtomDump(AtomDumpLoadOptions::default())),
            Style::Table => Ok(LoadRequest::Table(TableLoadOptions::default())),
            Style::Poscar => Ok(LoadRequest::Poscar),
            Style::AseAtoms | Style::PymatgenStructure => Err(Error::argument_conflict(format!(
                "{style} is loaded from an in-memory structure, not from text"
            ))),
        }
    }

    pub fn style(&self) -> Style {
        match self {
            LoadRequest::SystemModel => Style::SystemModel,
            LoadRequest::AtomData(_) => Style::AtomData,
            LoadRequest::AtomDump(_) => Style::AtomDump,
            LoadRequest::Table(_) => Style::Table,
            LoadRequest::Poscar => Style::Poscar,
        }
    }
}

/// Result of a dump.
#[derive(Debug, Clone, PartialEq)]
pub enum DumpOutput {
    /// Rendered content for an in-memory destination.
    Text(String),
    /// LAMMPS input lines; the data itself went to the destination.
    Info(String),
    TextWithInfo { text: String, info: String },
    /// Content went to the destination and nothing is returned.
    Written,
    Ase(AseAtoms),
    Pymatgen(PymatgenStructure),
}

impl DumpOutput {
    pub fn text(&self) -> Option<&str> {
        match self {
            DumpOutput::Text(text) | DumpOutput::TextWithInfo { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn info(&self) -> Option<&str> {
        match self {
            DumpOutput::Info(info) | DumpOutput::TextWithInfo { info, .. } => Some(info),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            DumpOutput::Text(text) | DumpOutput::TextWithInfo { text, .. } => Some(text),
            _ => None,
        }
    }
}

impl From<Delivered> for DumpOutput {
    fn from(delivered: Delivered) -> Self {
        match delivered {
            Delivered::Text(text) => DumpOutput::Text(text),
            Delivered::Written => DumpOutput::Written,
        }
    }
}

/// Dumps `system` in the requested format.
///
/// `atom_data` wraps the system in place before writing. The mirror styles only accept
/// [`Destination::InMemory`] and fail before touching the system otherwise.
pub fn dump(
    system: &mut System,
    request: &DumpRequest,
    destination: Destination<'_>,
) -> Result<DumpOutput, Error> {
    let style = request.style();
    if !style.is_text() && !destination.is_in_memory() {
        return Err(Error::argument_conflict(format!(
            "{style} returns an in-memory structure and cannot be written to {destination:?}"
        )));
    }
    tracing::debug!(%style, ?destination, "dumping system");

    let output = match request {
        DumpRequest::SystemModel(options) => {
            sink::deliver(destination, |w| system_model::write(w, system, options))?.into()
        }
        DumpRequest::AtomData(options) => {
            atom_data::check_properties(system, options)?;
            system.wrap();
            let data_path = destination.as_path().map(|p| p.to_path_buf());
            let delivered = sink::deliver(destination, |w| atom_data::write(w, system, options))?;
            if !options.return_info {
                delivered.into()
            } else {
                let info = atom_data::read_info(system, options, data_path.as_deref());
                match delivered {
                    Delivered::Text(text) => DumpOutput::TextWithInfo { text, info },
                    Delivered::Written => DumpOutput::Info(info),
                }
            }
        }
        DumpRequest::AtomDump(options) => {
            sink::deliver(destination, |w| atom_dump::write(w, system, options))?.into()
        }
        DumpRequest::Table(options) => {
            sink::deliver(destination, |w| table::write(w, system, options))?.into()
        }
        DumpRequest::Poscar(options) => {
            sink::deliver(destination, |w| poscar::write(w, system, options))?.into()
        }
        DumpRequest::AseAtoms => DumpOutput::Ase(mirror::to_ase(system)?),
        DumpRequest::PymatgenStructure => DumpOutput::Pymatgen(mirror::to_pymatgen(system)?),
    };
    Ok(output)
}

/// Dumps with the default options of the style named `style`.
///
/// Unknown names fail with `UnsupportedStyle` before the destination is opened.
pub fn dump_style(
    system: &mut System,
    style: &str,
    destination: Destination<'_>,
) -> Result<DumpOutput, Error> {
    let style: Style = style.parse()?;
    dump(system, &DumpRequest::default_for(style), destination)
}

pub fn load(request: &LoadRequest, source: Source<'_>) -> Result<System, Error> {
    tracing::debug!(style = %request.style(), ?source, "loading system");
    match request {
        LoadRequest::SystemModel => sink::consume(source, |r| system_model::read(r)),
        LoadRequest::AtomData(options) => sink::consume(source, |r| atom_data::read(r, options)),
        LoadRequest::AtomDump(options) => sink::consume(source, |r| atom_dump::read(r, options)),
        LoadRequest::Table(options) => sink::consume(source, |r| table::read(r, options)),
        LoadRequest::Poscar => sink::consume(source, |r| poscar::read(r)),
    }
}

/// Loads with the default options of the style named `style`.
pub fn load_style(style: &str, source: Source<'_>) -> Result<System, Error> {
    let request = LoadRequest::default_for(style.parse()?)?;
    load(&request, source)
}

pub fn load_ase(atoms: &AseAtoms) -> Result<System, Error> {
    mirror::from_ase(atoms)
}

pub fn load_pymatgen(structure: &PymatgenStructure) -> Result<System, Error> {
    mirror::from_pymatgen(structure)
}

impl System {
    /// See [`dump`].
    pub fn dump(
        &mut self,
        request: &DumpRequest,
        destination: Destination<'_>,
    ) -> Result<DumpOutput, Error> {
        dump(self, request, destination)
    }

    /// See [`dump_style`].
    pub fn dump_style(
        &mut self,
        style: &str,
        destination: Destination<'_>,
    ) -> Result<DumpOutput, Error> {
        dump_style(self, style, destination)
    }
}
