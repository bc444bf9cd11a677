//! CLI command definitions for codegen-forge.
//!
//! `serve` runs the HTTP endpoint, `generate` runs the pipeline once for a
//! task file, and `models` lists the configured provider/model table.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ForgeConfig;
use crate::llm::ModelRoster;
use crate::pipeline::{GenerationRequest, GenerationResult, GenerationStatus, Orchestrator};

/// Default bind address for `serve`.
const DEFAULT_BIND: &str = "0.0.0.0:8000";

/// Multi-model code generation service.
#[derive(Parser)]
#[command(name = "codegen-forge")]
#[command(about = "Ask several LLMs to solve a task and upload one archive per model")]
#[command(version)]
#[command(
    long_about = "codegen-forge sends a task to every configured model, extracts the files each \
                  model wrote, packs them into one zip per model and uploads the zips to a \
                  storage service.\n\nExample usage:\n  codegen-forge generate --task-file task.txt --destination my-project\n  codegen-forge serve --bind 127.0.0.1:8000"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run the HTTP API.
    Serve(ServeArgs),

    /// Run the pipeline once for a task file.
    #[command(alias = "gen")]
    Generate(GenerateArgs),

    /// Print the configured providers and models.
    Models,
}

/// Overrides for the storage settings read from the environment.
#[derive(clap::Args, Debug, Default)]
pub struct StorageArgs {
    /// Staging root for archives (overrides FORGE_STAGING_DIR).
    #[arg(long)]
    pub staging_dir: Option<PathBuf>,

    /// Upload base URL (overrides FORGE_UPLOAD_BASE_URL).
    #[arg(long)]
    pub upload_base_url: Option<String>,
}

/// Arguments for `codegen-forge serve`.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(short, long, env = "FORGE_BIND", default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,

    #[command(flatten)]
    pub storage: StorageArgs,
}

/// Arguments for `codegen-forge generate`.
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// File containing the task text.
    #[arg(short, long)]
    pub task_file: PathBuf,

    /// Destination identifier; archives go to `<base>/<destination>/upload`.
    #[arg(short, long)]
    pub destination: String,

    /// Print the result as JSON instead of a summary.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub storage: StorageArgs,
}

/// One row of `codegen-forge models`.
#[derive(Debug, Serialize)]
struct ModelRow<'a> {
    provider: &'a str,
    name: &'a str,
    id: &'a str,
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve(args) => run_serve_command(args).await,
        Commands::Generate(args) => run_generate_command(args).await,
        Commands::Models => run_models_command(),
    }
}

/// Reads the environment, applies CLI overrides and validates the result.
fn load_config(storage: &StorageArgs) -> anyhow::Result<ForgeConfig> {
    let mut config = ForgeConfig::from_env().context("Failed to read configuration")?;
    if let Some(dir) = &storage.staging_dir {
        config = config.with_staging_dir(dir.clone());
    }
    if let Some(url) = &storage.upload_base_url {
        config = config.with_upload_base_url(url.clone());
    }
    config.validate().context("Invalid configuration")?;

    if config.openrouter.is_none() && config.gemini.is_none() {
        warn!("No provider API key set; set OPENROUTER_API_KEY and/or GEMINI_API_KEY");
    }
    Ok(config)
}

async fn run_serve_command(args: ServeArgs) -> anyhow::Result<()> {
    let config = load_config(&args.storage)?;
    let orchestrator = Orchestrator::from_config(config)?;
    info!(
        models = orchestrator.roster().model_count(),
        staging = %orchestrator.config().staging_dir.display(),
        "Orchestrator ready"
    );

    crate::server::serve(args.bind, Arc::new(orchestrator))
        .await
        .with_context(|| format!("API server on {} stopped", args.bind))
}

async fn run_generate_command(args: GenerateArgs) -> anyhow::Result<()> {
    let task = tokio::fs::read(&args.task_file)
        .await
        .with_context(|| format!("Failed to read task file {}", args.task_file.display()))?;
    let request = GenerationRequest::from_bytes(task, args.destination.clone())?;

    let config = load_config(&args.storage)?;
    let orchestrator = Orchestrator::from_config(config)?;

    let start = std::time::Instant::now();
    let result = orchestrator.run(request).await?;

    if args.json {
        let json_output = serde_json::to_string_pretty(&result)
            .map_err(|e| anyhow::anyhow!("Failed to serialize JSON output: {}", e))?;
        println!("{json_output}");
        return Ok(());
    }

    if result.status == GenerationStatus::UploadFailed {
        warn!(
            upload_url = %result.upload_url,
            upload_status = ?result.upload_status,
            "Archives were generated but the upload failed"
        );
    }
    info!(
        archives = result.generated_archives.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Generation complete"
    );
    print!("{}", format_summary(&result));
    Ok(())
}

/// Human-readable report of a finished run.
fn format_summary(result: &GenerationResult) -> String {
    let upload = match result.upload_status {
        Some(code) => format!("HTTP {code}"),
        None => "no response".to_string(),
    };
    let mut out = format!(
        "Status:      {}\nRequest:     {}\nDestination: {}\nUpload:      {} ({})\nArchives:\n",
        result.status, result.request_id, result.storage_path, result.upload_url, upload
    );
    for path in &result.generated_archives {
        out.push_str(&format!("  {}\n", path.display()));
    }
    out
}

fn run_models_command() -> anyhow::Result<()> {
    let config = ForgeConfig::from_env().context("Failed to read configuration")?;
    let roster = ModelRoster::from_config(&config)?;

    if roster.is_empty() {
        warn!("No providers configured");
    }

    let rows: Vec<ModelRow<'_>> = roster
        .assignments()
        .map(|(provider, model)| ModelRow {
            provider: provider.name(),
            name: &model.name,
            id: &model.id,
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_command() {
        let cli = Cli::try_parse_from([
            "codegen-forge",
            "generate",
            "--task-file",
            "task.txt",
            "--destination",
            "proj",
            "--staging-dir",
            "/tmp/stage",
        ])
        .expect("should parse");

        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.task_file, PathBuf::from("task.txt"));
                assert_eq!(args.destination, "proj");
                assert!(!args.json);
                assert_eq!(args.storage.staging_dir, Some(PathBuf::from("/tmp/stage")));
                assert!(args.storage.upload_base_url.is_none());
            }
            _ => panic!("Expected Generate command"),
        }
    }

    #[test]
    fn test_generate_requires_destination() {
        assert!(Cli::try_parse_from(["codegen-forge", "generate", "-t", "task.txt"]).is_err());
    }

    #[test]
    fn test_serve_bind_and_global_log_level() {
        let cli = Cli::try_parse_from([
            "codegen-forge",
            "serve",
            "--bind",
            "127.0.0.1:9000",
            "--log-level",
            "debug",
        ])
        .expect("should parse");

        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.bind, "127.0.0.1:9000".parse::<SocketAddr>().expect("addr"));
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_summary_lists_archives_and_upload_outcome() {
        let result = GenerationResult {
            status: GenerationStatus::UploadFailed,
            storage_path: "proj".to_string(),
            upload_url: "http://h/api/proj/upload".to_string(),
            upload_success: false,
            upload_status: None,
            generated_archives: vec![PathBuf::from("files/r/modela.zip")],
            request_id: uuid::Uuid::nil(),
            completed_at: chrono::Utc::now(),
        };

        let summary = format_summary(&result);
        assert!(summary.starts_with("Status:      upload_failed\n"));
        assert!(summary.contains("http://h/api/proj/upload (no response)"));
        assert!(summary.contains("  files/r/modela.zip\n"));
        assert!(serde_json::from_str::<serde_json::Value>(&summary).is_err());

        let ok = GenerationResult {
            status: GenerationStatus::Success,
            upload_success: true,
            upload_status: Some(201),
            ..result
        };
        assert!(format_summary(&ok).contains("(HTTP 201)"));
    }

    #[test]
    fn test_models_command() {
        let cli = Cli::try_parse_from(["codegen-forge", "models"]).expect("should parse");
        assert!(matches!(cli.command, Commands::Models));
    }
}
