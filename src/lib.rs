//! # AtomForge
//!
//! **AtomForge** is a pure-Rust container for atomic configurations that converts them between the file formats used by molecular-simulation tools. A `System` couples a LAMMPS-style triclinic `SimBox` with an `Atoms` table of named per-atom properties, and every physical quantity crossing a format boundary goes through a shared unit registry.
//!
//! ## Features
//!
//! - **Triclinic cells** – `SimBox` accepts bounds and tilts, edge vectors, or lattice parameters, and converts positions to and from box-relative coordinates.
//! - **Typed property columns** – integer, scalar, and 3-vector columns of equal length keyed by name, with `atype` and `pos` always present.
//! - **Unit conversion** – a process-wide registry parses unit expressions such as `angstrom/ps` or `(eV/amu)^0.5` and can be rebuilt from new base units.
//! - **Format codecs** – LAMMPS data and dump files, column tables, POSCAR, a self-describing JSON document, and plain mirrors of ASE `Atoms` and pymatgen `Structure`, all routed by style name.
//! - **Exact layouts** – printf-compatible float formatting reproduces the byte layout simulation engines expect.

mod model;

pub mod io;
pub mod units;

pub use model::Error as ModelError;
pub use model::atoms::{ATYPE, AtomView, Atoms, POS, Property, PropertyMut, PropertyValue};
pub use model::sim_box::{Lattice, SimBox};
pub use model::system::System;
