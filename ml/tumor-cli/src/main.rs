//! Tumor scan pipeline command-line tool.
//!
//! # Commands
//!
//! - `tumor inspect --no-tumor <dir> --tumor <dir>` - Ingest, assemble and partition; print the reports
//! - `tumor predict --checkpoint <file> <image>` - Classify one scan
//! - `tumor evaluate --checkpoint <file> --no-tumor <dir> --tumor <dir>` - Score a checkpoint on the test split
//! - `tumor config [--training]` - Print the default configuration as JSON
//!
//! Logs go to stderr; `RUST_LOG` overrides the default `info` filter.

mod evaluate;
mod inspect;
mod predict;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use tumor_dataset::PipelineConfig;
use tumor_training::TrainingConfig;

/// Brain tumor scan classification pipeline
#[derive(Debug, Parser)]
#[command(name = "tumor")]
#[command(about = "Ingest, partition and classify brain MRI scans", long_about = None)]
#[command(version)]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Plain, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Plain,
    Json,
}

/// Labeled source directories.
#[derive(Debug, clap::Args)]
struct DataArgs {
    /// Directory of scans without a tumor (label 0)
    #[arg(long = "no-tumor")]
    no_tumor: PathBuf,

    /// Directory of scans with a tumor (label 1)
    #[arg(long)]
    tumor: PathBuf,

    /// Pipeline configuration (JSON); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load both directories, partition, and print the class and split reports
    Inspect {
        #[command(flatten)]
        data: DataArgs,

        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },

    /// Classify a single image with a saved checkpoint
    Predict {
        /// Checkpoint weights (.bin or .json) with its manifest alongside
        #[arg(long)]
        checkpoint: PathBuf,

        /// Image file to classify
        #[arg(name = "IMAGE")]
        image: PathBuf,
    },

    /// Evaluate a checkpoint on the held-out test split
    Evaluate {
        /// Checkpoint weights (.bin or .json) with its manifest alongside
        #[arg(long)]
        checkpoint: PathBuf,

        #[command(flatten)]
        data: DataArgs,

        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration
    Config {
        /// Print the training configuration instead of the pipeline one
        #[arg(long)]
        training: bool,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(Level::INFO.into()));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().flatten_event(true).with_writer(std::io::stderr))
            .init(),
        LogFormat::Plain => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init(),
    }
}

/// Loads `path`, or the defaults when no file was given.
fn pipeline_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading pipeline config {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::Inspect { data, json } => inspect::run(&data, json),
        Commands::Predict { checkpoint, image } => predict::run(&checkpoint, &image),
        Commands::Evaluate {
            checkpoint,
            data,
            json,
        } => evaluate::run(&checkpoint, &data, json),
        Commands::Config { training } => {
            let text = if training {
                serde_json::to_string_pretty(&TrainingConfig::default())?
            } else {
                serde_json::to_string_pretty(&PipelineConfig::default())?
            };
            println!("{text}");
            Ok(ExitCode::SUCCESS)
        }
    }
}
