// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Courier - delayed message dispatch and real-time delivery backend.
//!
//! This is the binary entry point for the courier server.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};

mod doctor;
mod serve;
mod shutdown;

/// Courier - delayed message dispatch and real-time delivery backend.
#[derive(Parser, Debug)]
#[command(name = "courier", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the courier server.
    Serve,
    /// Sweep failed messages older than the configured window, then exit.
    SweepFailed,
    /// Run diagnostic checks against the configured environment.
    Doctor,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve => serve::run_serve().await,
        Commands::SweepFailed => serve::run_sweep_failed().await,
        Commands::Doctor => serve::run_doctor_command().await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
