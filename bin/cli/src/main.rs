//! `flowsmith`: edit, lay out and simulate workflow documents from the shell.

mod commands;
mod config;
mod error;

use clap::Parser;
use commands::Command;
use config::CliConfig;
use error::CliError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Workflow graph editor
#[derive(Parser, Debug)]
#[command(name = "flowsmith", version, about, long_about = None)]
struct Cli {
    /// Workflow document to operate on (defaults to the configured document)
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    /// Configuration file (JSON, TOML or YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match CliConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "error: {}",
                CliError::Config {
                    details: e.to_string()
                }
            );
            return ExitCode::FAILURE;
        }
    };
    let path = cli.file.unwrap_or_else(|| config.document.clone());
    tracing::debug!(path = %path.display(), "using document");

    match commands::run(cli.command, &path, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            eprintln!("error: {report}");
            ExitCode::FAILURE
        }
    }
}
