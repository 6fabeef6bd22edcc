//! Spaceflights data science pipeline
//!
//! Trains and evaluates a shuttle price model with BigQuery ML.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::{Config, DEFAULT_PARAMETERS_PATH, Parameters};
use spaceflights::commands;
use spaceflights::nodes::ModelStatus;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Spaceflights data science pipeline
#[derive(Parser)]
#[command(name = "spaceflights")]
#[command(about = "Train and evaluate the spaceflights price model in BigQuery ML")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the YAML file holding `bq_model_name` and `bq_master_table`
    #[arg(short, long, global = true, default_value = DEFAULT_PARAMETERS_PATH)]
    params: PathBuf,

    /// Overrides `bq_model_name` (e.g. "project.dataset.model")
    #[arg(long, global = true)]
    model_name: Option<String>,

    /// Overrides `bq_master_table` (e.g. "project.dataset.master_table")
    #[arg(long, global = true)]
    master_table: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or replace the model
    Train {
        /// Write the training status table to this JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Log the R^2 score of an existing model
    Evaluate {
        /// Training status table written by `train --output`
        #[arg(short, long)]
        status: Option<PathBuf>,
    },

    /// Train the model, then evaluate it
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;
    let parameters = Parameters::resolve(&cli.params, cli.model_name, cli.master_table)?;

    match cli.command {
        Commands::Train { output } => {
            let status = commands::train::run(&config, &parameters).await?;
            if let Some(path) = output {
                status.save(&path)?;
                info!(path = %path.display(), "Status written");
            }
        }
        Commands::Evaluate { status } => {
            let status = match status {
                Some(path) => ModelStatus::load(&path)?,
                // Ordering is the caller's responsibility without a status file
                None => ModelStatus::ready(),
            };
            commands::evaluate::run(&config, &status, &parameters).await?;
        }
        Commands::Run => {
            commands::pipeline::run(&config, &parameters).await?;
        }
    }

    Ok(())
}
