//! Unit conversion between stored working units and external unit systems.
//!
//! Conversions go through a process-wide [`UnitRegistry`] guarded by a read/write lock.
//! [`reset_units`] swaps the table atomically: conversions already in flight finish against the
//! old table, and every later conversion sees the new one. Values that were converted before a
//! reset are not touched. Code that prefers explicit context can build its own
//! [`UnitRegistry`] and call the same methods on it directly.

mod error;
mod expr;
mod profile;
mod registry;

use nalgebra::Vector3;
use std::sync::{OnceLock, PoisonError, RwLock};

pub use error::Error;
pub use profile::{Quantity, UnitStyle};
pub use registry::{BaseUnits, UnitRegistry};

static REGISTRY: OnceLock<RwLock<UnitRegistry>> = OnceLock::new();

fn global() -> &'static RwLock<UnitRegistry> {
    REGISTRY.get_or_init(|| RwLock::new(UnitRegistry::default()))
}

/// Rebuilds the process-wide table from a new set of base units.
///
/// On error the current table is left in place.
pub fn reset_units(base: BaseUnits) -> Result<(), Error> {
    let registry = UnitRegistry::new(base)?;
    tracing::debug!(base = ?registry.base(), "resetting working units");
    let mut guard = global().write().unwrap_or_else(PoisonError::into_inner);
    *guard = registry;
    Ok(())
}

/// Runs `f` against a consistent snapshot of the process-wide table.
pub fn with_registry<T>(f: impl FnOnce(&UnitRegistry) -> T) -> T {
    let guard = global().read().unwrap_or_else(PoisonError::into_inner);
    f(&guard)
}

/// Factor mapping one `unit` into working units.
pub fn scale_of(unit: &str) -> Result<f64, Error> {
    with_registry(|registry| registry.scale_of(unit))
}

/// Converts a stored (working-unit) value into `unit`.
pub fn get_in_units(value: f64, unit: &str) -> Result<f64, Error> {
    with_registry(|registry| registry.get_in_units(value, unit))
}

/// Converts a value given in `unit` into working units.
pub fn set_in_units(value: f64, unit: &str) -> Result<f64, Error> {
    with_registry(|registry| registry.set_in_units(value, unit))
}

pub fn get_vector_in_units(value: &Vector3<f64>, unit: &str) -> Result<Vector3<f64>, Error> {
    Ok(value / scale_of(unit)?)
}

pub fn set_vector_in_units(value: &Vector3<f64>, unit: &str) -> Result<Vector3<f64>, Error> {
    Ok(value * scale_of(unit)?)
}

/// Factor for an optional unit; `None` means values pass through unchanged.
pub(crate) fn optional_scale(unit: Option<&str>) -> Result<f64, Error> {
    match unit {
        Some(unit) => scale_of(unit),
        None => Ok(1.0),
    }
}
