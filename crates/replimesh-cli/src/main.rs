//! replimesh command-line driver.
//!
//! # Quick Start
//!
//! ```bash
//! # Run a simulation from a config file
//! replimesh run --config sim.toml --strategy balanced-tree
//!
//! # Same run, machine-readable summary only
//! replimesh run --config sim.toml --headless
//!
//! # Re-run a scenario twice and check determinism + invariants
//! replimesh verify --scenario tree-growth --seed 42
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Discrete-time simulator for remote-data-mirror overlay networks.
#[derive(Parser)]
#[command(name = "replimesh")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation from a config file.
    Run {
        /// Path to the TOML config file.
        #[arg(short, long)]
        config: String,

        /// Initial topology strategy.
        #[arg(short, long, default_value = "balanced-tree")]
        strategy: String,

        /// Emit a JSON summary instead of the interactive report.
        #[arg(long)]
        headless: bool,

        /// Override the config's seed.
        #[arg(long)]
        seed: Option<u64>,

        /// Override the config's tick count.
        #[arg(long)]
        ticks: Option<u64>,
    },

    /// Run a named scenario twice, checking determinism and invariants.
    Verify {
        /// Scenario name (see `replimesh scenarios`).
        #[arg(short, long, default_value = "tree-baseline")]
        scenario: String,

        /// Seed to verify.
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// List the available topology strategies.
    Strategies,

    /// List the predefined scenarios.
    Scenarios,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            strategy,
            headless,
            seed,
            ticks,
        } => commands::run::run(&config, &strategy, headless, seed, ticks),
        Commands::Verify { scenario, seed } => commands::verify::verify(&scenario, seed),
        Commands::Strategies => {
            commands::strategies();
            Ok(())
        }
        Commands::Scenarios => {
            commands::scenarios();
            Ok(())
        }
    }
}
