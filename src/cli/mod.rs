//! Command-line interface for codegen-forge.
//!
//! Provides commands for serving the HTTP API, running one generation from
//! a task file and listing the configured models.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli, Commands};
