use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use atom_forge::units::UnitStyle;
use commands::{FileFormat, IoParameters};
use commands::{convert, info, wrap};

#[derive(Parser, Debug)]
#[command(
    name = "atomforge",
    about = "A command-line tool for inspecting, wrapping, and converting atomic systems between simulation file formats.",
    version,
    author,
    arg_required_else_help = true
)]
struct Cli {
    /// Input file path. When omitted, stdin is used.
    #[arg(short, long, value_name = "FILE", global = true)]
    input: Option<PathBuf>,
    /// Output file path. When omitted, stdout is used.
    #[arg(short, long, value_name = "FILE", global = true)]
    output: Option<PathBuf>,
    /// Force the input format.
    #[arg(long = "format", value_enum, global = true)]
    input_format: Option<FileFormat>,
    /// Force the output format.
    #[arg(long = "out-format", value_enum, global = true)]
    output_format: Option<FileFormat>,
    /// LAMMPS units of a data or dump input (default metal).
    #[arg(long = "in-units", global = true)]
    input_units: Option<UnitStyle>,
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inspect the system without modifying the data stream.
    Info(info::InfoArgs),
    /// Convert the system to another file format.
    Convert(convert::ConvertArgs),
    /// Wrap atoms back into the box along periodic axes.
    Wrap(wrap::WrapArgs),
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let io_params = IoParameters {
        input: cli.input.clone(),
        output: cli.output.clone(),
        input_format: cli.input_format,
        output_format: cli.output_format,
        input_units: cli.input_units,
    };

    match cli.command {
        Command::Info(args) => {
            let (mut system, _) = commands::load_input(&io_params)?;
            info::run(&system, &args)?;
            if !commands::interactive_stdout_requested(&io_params) {
                let format = io_params.resolve_output_format()?;
                let request = convert::request(format, &convert::ConvertArgs::default());
                commands::save_output(&mut system, &request, &io_params)?;
            }
        }
        Command::Convert(args) => {
            let format = io_params.resolve_output_format()?;
            commands::refuse_terminal_output("convert", format, &io_params)?;
            let (mut system, _) = commands::load_input(&io_params)?;
            convert::run(&mut system, &args)?;
            let request = convert::request(format, &args);
            let output = commands::save_output(&mut system, &request, &io_params)?;
            commands::report_info(&output);
        }
        Command::Wrap(args) => {
            let format = io_params.resolve_output_format()?;
            commands::refuse_terminal_output("wrap", format, &io_params)?;
            let (mut system, _) = commands::load_input(&io_params)?;
            wrap::run(&mut system, &args)?;
            let request = convert::request(format, &convert::ConvertArgs::default());
            commands::save_output(&mut system, &request, &io_params)?;
        }
    }

    Ok(())
}
