// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Draftwise - cost-aware LLM draft/verify cascade.
//!
//! This is the binary entry point: configuration checks and offline
//! inspection of how queries would be classified and routed.

mod check;
mod inspect;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use draftwise_config::DraftwiseConfig;

/// Draftwise - cost-aware LLM draft/verify cascade.
#[derive(Parser, Debug)]
#[command(name = "draftwise", version, about, long_about = None)]
struct Cli {
    /// Configuration file. Defaults to the XDG lookup hierarchy.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration and report every problem found.
    Check,
    /// Show the domain and complexity tier resolved for a query.
    Classify {
        query: String,
        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Show the ordered candidate models for a query.
    Select {
        query: String,
        /// Identity plan whose allowed models and selection order apply.
        #[arg(long, default_value = "free")]
        plan: String,
        /// Remaining budget in USD. Candidates estimated above it are dropped.
        #[arg(long)]
        budget: Option<f64>,
        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => draftwise_config::load_and_validate_path(path),
        None => draftwise_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            eprint!("{}", draftwise_config::render_errors(&errors));
            eprintln!("draftwise: {} configuration error(s)", errors.len());
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config);

    let result = match cli.command {
        Commands::Check => check::run_check(&config),
        Commands::Classify { query, json } => inspect::run_classify(&query, json),
        Commands::Select {
            query,
            plan,
            budget,
            json,
        } => inspect::run_select(&config, &query, &plan, budget, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("draftwise: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize the tracing subscriber with an env filter.
///
/// `RUST_LOG` wins over the configured level. Logs go to stderr so command
/// output on stdout stays machine-readable.
fn init_tracing(config: &DraftwiseConfig) {
    use tracing_subscriber::EnvFilter;

    let log_level = &config.engine.log_level;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("draftwise={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
