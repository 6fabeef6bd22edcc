//! Evaluate command - reports the R^2 score of the trained model.

use anyhow::{Context, Result};
use bigquery_client::BigQueryClient;
use config::{Config, Parameters};

use crate::nodes::{self, ModelStatus};

/// Runs the evaluate command.
///
/// The model named in `parameters` must already exist.
///
/// # Errors
///
/// Returns an error if the client cannot be created or evaluation fails.
pub async fn run(
    config: &Config,
    status: &ModelStatus,
    parameters: &Parameters,
) -> Result<Vec<f64>> {
    let client = BigQueryClient::new(config).context("Failed to create BigQuery client")?;

    Ok(nodes::evaluate_model(&client, status, parameters).await?)
}
