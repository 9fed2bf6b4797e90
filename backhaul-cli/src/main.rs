//! Backhaul CLI - Command-line interface
//!
//! Provides command-line access to single simulation runs and parameter
//! sweeps.

mod commands;

use backhaul_core::tracing_setup::{self, CliLogLevel};
use clap::Parser;

#[derive(Parser)]
#[command(name = "backhaul")]
#[command(about = "An edge-cache latency simulator")]
struct Cli {
    /// Console log level (full debug always goes to logs/)
    #[arg(long, value_enum, default_value_t = CliLogLevel::Warn)]
    log_level: CliLogLevel,

    #[command(subcommand)]
    command: commands::Commands,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_setup::init_tracing(cli.log_level.as_tracing_level(), None)?;
    commands::handle_command(cli.command)?;

    Ok(())
}
