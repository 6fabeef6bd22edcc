//! Example: Run the data science pipeline without a parameters file.
//!
//! Trains the price model in BigQuery ML and logs its R^2 score.
//!
//! Usage:
//!   cargo run --example pipeline
//!
//! Environment Variables:
//!   `GOOGLE_CLOUD_PROJECT`  - Project the jobs run in (required)
//!   `BIGQUERY_ACCESS_TOKEN` - OAuth2 access token (required)
//!   `BQ_MODEL_NAME`         - Model to create (default: `spaceflights.price_model`)
//!   `BQ_MASTER_TABLE`       - Input table (default: `spaceflights.master_table`)
//!
//! Example:
//!   `BIGQUERY_ACCESS_TOKEN=$(gcloud auth print-access-token)` cargo run --example pipeline

use anyhow::Result;
use config::{Config, Parameters};
use spaceflights::commands;
use tracing_subscriber::EnvFilter;

fn get_env_or_default(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("info"))
        .init();

    let config = Config::from_env()?;
    let parameters = Parameters::new(
        get_env_or_default("BQ_MODEL_NAME", "spaceflights.price_model"),
        get_env_or_default("BQ_MASTER_TABLE", "spaceflights.master_table"),
    );

    println!("=== Spaceflights Pipeline ===");
    println!("Project:      {}", config.project_id);
    println!("Model:        {}", parameters.bq_model_name);
    println!("Master table: {}", parameters.bq_master_table);
    println!();

    let scores = commands::pipeline::run(&config, &parameters).await?;

    for score in scores {
        println!("R^2: {score:.3}");
    }

    Ok(())
}
