//! Development tasks for the ruleset workspace
//!
//! This binary provides development utilities using the cargo-xtask pattern.
//! Run with: `cargo xtask <command>`

mod commands;
mod dirs;

use anyhow::Result;
use clap::Parser;
use commands::{Eval, Prepare, Validate};
use tracing_subscriber::EnvFilter;

/// Development tasks for the ruleset workspace
#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Development tools for the ruleset engine", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Prepare an actor from data files and print the derived sheet
    Prepare(Prepare),

    /// Evaluate a formula against a JSON context or a prepared actor
    Eval(Eval),

    /// Strictly validate authored rule data
    Validate(Validate),
}

fn main() -> Result<()> {
    // Load .env file if it exists (for RULESET_DATA_DIR and RUST_LOG)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Prepare(cmd) => cmd.execute(),
        Command::Eval(cmd) => cmd.execute(),
        Command::Validate(cmd) => cmd.execute(),
    }
}
