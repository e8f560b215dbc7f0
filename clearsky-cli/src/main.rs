//! Clearsky CLI - Command-line interface
//!
//! Values tasking orders against a rev's visibility, priority and weather
//! layers, and reports the clear-sky value surface.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::config::ConfigCommands;
use commands::metrics::MetricsArgs;
use commands::resolve::ResolveArgs;
use commands::revs::RevsArgs;
use commands::run::RunArgs;
use error::CliError;

/// Default log filter when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "clearsky=info";

#[derive(Debug, Parser)]
#[command(name = "clearsky", version, about = "Clear-sky order valuation per rev")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Value one or more revs and write a JSON report
    Run(RunArgs),

    /// List the revs present in the visibility layer
    Revs(RevsArgs),

    /// Show per-order extents for the orders selected on a rev
    Resolve(ResolveArgs),

    /// Show clear/cloudy collection counts from the inventory log
    Metrics(MetricsArgs),

    /// View and modify configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = dispatch(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("clearsky=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn dispatch(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Revs(args) => commands::revs::run(args),
        Commands::Resolve(args) => commands::resolve::run(args),
        Commands::Metrics(args) => commands::metrics::run(args),
        Commands::Config(command) => commands::config::run(command),
    }
}
