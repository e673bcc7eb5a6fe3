//! cpamm CLI - scenario runner and quote tool for the constant product pool
//!
//! Scenarios are TOML files describing a pool pair, funded accounts and a
//! sequence of liquidity, swap and query steps. They run against an
//! in-memory asset ledger and print the resulting pool and account state.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod config;
mod quote;
mod scenario;

#[derive(Parser)]
#[command(name = "cpamm")]
#[command(about = "Constant product AMM - run pool scenarios and quote swaps", long_about = None)]
#[command(version)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario file against a fresh pool
    Run {
        /// Path to the scenario TOML file
        scenario: PathBuf,

        /// Print the final report as JSON
        #[arg(long)]
        json: bool,

        /// Continue after a failed step instead of stopping
        #[arg(long)]
        keep_going: bool,
    },

    /// Quote a swap against the given reserves (decimal units)
    Quote {
        /// Amount of the input asset sold
        amount_in: String,

        /// Reserve of the input asset
        reserve_in: String,

        /// Reserve of the output asset
        reserve_out: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Run {
            scenario: path,
            json,
            keep_going,
        } => {
            scenario::run_scenario(&path, json, keep_going)?;
        }
        Commands::Quote {
            amount_in,
            reserve_in,
            reserve_out,
        } => {
            quote::show_quote(&amount_in, &reserve_in, &reserve_out)?;
        }
    }

    Ok(())
}
