//! Core data structures modeling an atomic configuration.
//!
//! This module defines the simulation cell, the per-atom property table, and the `System`
//! tying them together. These types are consumed and mutated by the format codecs under `io`.

pub mod atoms;
pub mod error;
pub mod sim_box;
pub mod system;

pub use error::Error;
