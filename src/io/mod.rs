//! Format codecs translating a [`System`](crate::System) to and from external representations.
//!
//! Every codec reads from a buffered reader and writes to any `Write` sink; [`dump`] and
//! [`load`] resolve a [`Destination`] or [`Source`] and route by [`Style`].

pub mod atom_data;
pub mod atom_dump;
mod cell;
mod dispatch;
mod error;
mod float_format;
pub mod mirror;
pub mod poscar;
mod sink;
pub mod system_model;
pub mod table;

pub use dispatch::{
    DumpOutput, DumpRequest, LoadRequest, Style, dump, dump_style, load, load_ase, load_pymatgen,
    load_style,
};
pub use error::Error;
pub use float_format::FloatFormat;
pub use mirror::{AseAtoms, PymatgenStructure};
pub use sink::{Destination, Source};
