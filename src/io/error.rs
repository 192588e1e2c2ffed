use crate::{model, units};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "I/O error for {path_desc}: {source}",
        path_desc = PathDisplay(path)
    )]
    Io {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "failed to parse {format} {path_desc}: {details} (line {line_number})",
        path_desc = PathDisplay(path)
    )]
    Parse {
        format: &'static str,
        path: Option<PathBuf>,
        line_number: usize,
        details: String,
    },

    #[error(
        "inconsistent data in {format} {path_desc}: {details}",
        path_desc = PathDisplay(path)
    )]
    InconsistentData {
        format: &'static str,
        path: Option<PathBuf>,
        details: String,
    },

    #[error("unsupported style '{style}'")]
    UnsupportedStyle { style: String },

    #[error("conflicting arguments: {reason}")]
    ArgumentConflict { reason: String },

    #[error("unsupported LAMMPS atom_style '{style}'")]
    UnsupportedAtomStyle { style: String },

    #[error("invalid float format '{format}': {reason}")]
    InvalidFloatFormat { format: String, reason: String },

    #[error("{format} needs an element symbol for every atom type; type {atype} has none")]
    MissingSymbols { format: &'static str, atype: usize },

    #[error(transparent)]
    Model(#[from] model::Error),

    #[error(transparent)]
    Units(#[from] units::Error),
}

impl Error {
    pub fn from_io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { path, source }
    }

    pub fn parse(
        format: &'static str,
        path: Option<PathBuf>,
        line_number: usize,
        details: impl Into<String>,
    ) -> Self {
        Self::Parse {
            format,
            path,
            line_number,
            details: details.into(),
        }
    }

    pub fn inconsistent_data(
        format: &'static str,
        path: Option<PathBuf>,
        details: impl Into<String>,
    ) -> Self {
        Self::InconsistentData {
            format,
            path,
            details: details.into(),
        }
    }

    pub fn unsupported_style(style: impl Into<String>) -> Self {
        Self::UnsupportedStyle {
            style: style.into(),
        }
    }

    pub fn argument_conflict(reason: impl Into<String>) -> Self {
        Self::ArgumentConflict {
            reason: reason.into(),
        }
    }

    pub fn unsupported_atom_style(style: impl Into<String>) -> Self {
        Self::UnsupportedAtomStyle {
            style: style.into(),
        }
    }

    pub fn invalid_float_format(format: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFloatFormat {
            format: format.into(),
            reason: reason.into(),
        }
    }

    /// Attaches `path` to errors raised while the codec only saw an anonymous stream.
    pub(crate) fn with_path(mut self, file: &std::path::Path) -> Self {
        match &mut self {
            Self::Io { path, .. } | Self::Parse { path, .. } | Self::InconsistentData { path, .. }
                if path.is_none() =>
            {
                *path = Some(file.to_path_buf());
            }
            _ => {}
        }
        self
    }
}

struct PathDisplay<'a>(&'a Option<PathBuf>);

impl<'a> fmt::Display for PathDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(p) => write!(f, "file '{}'", p.display()),
            None => write!(f, "stream source"),
        }
    }
}
