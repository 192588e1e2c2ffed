use anyhow::Result;
use clap::Args;

use atom_forge::System;

use crate::commands::run_with_spinner;

/// Periodic wrapping options.
#[derive(Debug, Default, Args)]
pub struct WrapArgs {
    /// Treat every axis as periodic before wrapping.
    #[arg(long = "all-periodic")]
    pub all_periodic: bool,
}

/// Wraps atoms back into the box along each periodic axis.
pub fn run(system: &mut System, args: &WrapArgs) -> Result<()> {
    if args.all_periodic {
        system.pbc = [true; 3];
    }
    let natoms = system.natoms();
    run_with_spinner("Wrapping atoms into the box", natoms, || {
        system.wrap();
        Ok(())
    })?;
    tracing::debug!(pbc = ?system.pbc, "wrapped system");
    Ok(())
}
