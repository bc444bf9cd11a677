//! codegen-forge CLI entry point.
//!
//! Loads `.env`, initializes logging and delegates to the CLI module for
//! command handling.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Values from .env must be visible before clap reads `env` defaults
    dotenv::dotenv().ok();

    let cli = codegen_forge::cli::parse_cli();

    // Priority: RUST_LOG env var > --log-level CLI arg > default "info"
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| cli.log_level.clone());

    // Logs go to stderr so stdout carries only command output
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)))
        .init();

    codegen_forge::cli::run_with_cli(cli).await
}
