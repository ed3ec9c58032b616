//! tokveil - hides OAuth access tokens behind opaque handles
//!
//! Main entry point for the tokveil CLI.

use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod commands;

use commands::{check_config, start};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// tokveil - reverse proxy that keeps OAuth access tokens away from clients
#[derive(Parser)]
#[command(name = "tokveil")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the token proxy
    Start(start::StartArgs),

    /// Validate configuration and print the effective settings
    CheckConfig(check_config::CheckConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_dir = match &cli.command {
        Commands::Start(args) => args.log_dir.clone(),
        Commands::CheckConfig(_) => None,
    };
    let _guard = init_tracing(cli.verbose, log_dir.as_deref());

    let ctx = commands::Context {
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Start(args) => start::run(args, &ctx).await,
        Commands::CheckConfig(args) => check_config::run(args, &ctx),
    }
}

/// Console (human-readable) logging, plus rotating JSON files when `log_dir` is set.
fn init_tracing(verbose: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let default_filter = if verbose {
        "tokveil=debug,tokveil_cache=debug,tokveil_config=debug,tokveil_proxy=debug,tower_http=debug,info"
    } else {
        "tokveil=info,tokveil_cache=info,tokveil_proxy=info,warn"
    };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "tokveil.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new(
                    "tokveil=trace,tokveil_cache=trace,tokveil_proxy=trace,tower_http=debug,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();

    guard
}
