//! Train command - creates the price model in BigQuery ML.

use anyhow::{Context, Result};
use bigquery_client::BigQueryClient;
use config::{Config, Parameters};
use tracing::info;

use crate::nodes::{self, ModelStatus};

/// Runs the train command.
///
/// # Errors
///
/// Returns an error if the client cannot be created or training fails.
pub async fn run(config: &Config, parameters: &Parameters) -> Result<ModelStatus> {
    let client = BigQueryClient::new(config).context("Failed to create BigQuery client")?;

    let status = nodes::train_model(&client, parameters).await?;

    info!(model = %parameters.bq_model_name, "Training complete");

    Ok(status)
}
