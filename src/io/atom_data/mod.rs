//! LAMMPS atom data files (`read_data` input).

mod reader;
mod styles;
mod writer;

pub(crate) const FORMAT: &str = "atom_data";

pub use reader::{AtomDataLoadOptions, read};
pub use styles::{AtomStyle, VELOCITY};
pub(crate) use writer::check_properties;
pub use writer::{AtomDataOptions, read_info, write};
