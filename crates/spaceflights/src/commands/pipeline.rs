//! Data science pipeline: train the model, then evaluate it.

use anyhow::Result;
use config::{Config, Parameters};
use tracing::info;

use super::{evaluate, train};

/// Runs both nodes in order, each with its own client.
///
/// # Errors
///
/// Returns the first error raised by either node.
pub async fn run(config: &Config, parameters: &Parameters) -> Result<Vec<f64>> {
    info!("=== Data science pipeline ===");

    info!("Step 1: Training model...");
    let status = train::run(config, parameters).await?;

    info!("Step 2: Evaluating model...");
    let scores = evaluate::run(config, &status, parameters).await?;

    info!(rows = scores.len(), "Pipeline complete");

    Ok(scores)
}
