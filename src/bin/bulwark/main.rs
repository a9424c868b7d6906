//! Bulwark CLI - hardening and IPO flag configuration for C/C++ builds

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("bulwark=debug")
    } else {
        EnvFilter::new("bulwark=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    // Execute command
    match cli.command {
        Commands::Harden(args) => commands::harden::execute(args),
        Commands::Ipo(args) => commands::ipo::execute(args),
        Commands::Probe(args) => commands::probe::execute(args),
        Commands::Toolchain => commands::toolchain::execute(),
        Commands::Cache(args) => commands::cache::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
