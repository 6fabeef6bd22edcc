use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default REST endpoint for BigQuery.
pub const DEFAULT_API_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Default location of the node parameters file.
pub const DEFAULT_PARAMETERS_PATH: &str = "conf/base/parameters.yml";

/// Connection configuration loaded from environment variables.
///
/// The access token is read once and never refreshed. Google access tokens
/// expire after about an hour, so a job still running past that point fails
/// with a 401 while being polled.
#[derive(Debug, Clone)]
pub struct Config {
    /// Project that owns and bills the query jobs
    pub project_id: String,

    /// OAuth2 bearer token sent with every request
    pub access_token: String,

    /// Job location (e.g. `EU`), if the datasets are not in the default region
    pub location: Option<String>,

    /// REST base URL, overridable for emulators
    pub api_url: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `GOOGLE_CLOUD_PROJECT`: project the jobs run in
    /// - `BIGQUERY_ACCESS_TOKEN`: OAuth2 access token (e.g. `gcloud auth print-access-token`)
    ///
    /// Optional environment variables:
    /// - `BIGQUERY_LOCATION`: job location
    /// - `BIGQUERY_API_URL`: REST base URL (default: [`DEFAULT_API_URL`])
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing.
    pub fn from_env() -> Result<Self> {
        // Load .env file
        dotenvy::dotenv().ok();

        let project_id = std::env::var("GOOGLE_CLOUD_PROJECT")
            .context("GOOGLE_CLOUD_PROJECT environment variable not set")?;

        let access_token = std::env::var("BIGQUERY_ACCESS_TOKEN")
            .context("BIGQUERY_ACCESS_TOKEN environment variable not set")?;

        let location = std::env::var("BIGQUERY_LOCATION")
            .ok()
            .filter(|value| !value.is_empty());

        let api_url = std::env::var("BIGQUERY_API_URL")
            .map_or_else(|_| DEFAULT_API_URL.to_string(), |url| {
                url.trim_end_matches('/').to_string()
            });

        Ok(Self {
            project_id,
            access_token,
            location,
            api_url,
        })
    }
}

/// Parameters consumed by the data science nodes.
///
/// Both values are fully-qualified BigQuery identifiers
/// (`project.dataset.name`) and are substituted verbatim into the queries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Parameters {
    /// Model to create and evaluate
    pub bq_model_name: String,

    /// Table holding the model input features and the `price` label
    pub bq_master_table: String,
}

impl Parameters {
    /// Creates parameters from explicit values.
    pub fn new(bq_model_name: impl Into<String>, bq_master_table: impl Into<String>) -> Self {
        Self {
            bq_model_name: bq_model_name.into(),
            bq_master_table: bq_master_table.into(),
        }
    }

    /// Parses parameters from a YAML document. Unrelated keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed, a key is missing or a value is empty.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let parameters: Self =
            serde_yaml::from_str(yaml).context("Failed to parse parameters YAML")?;
        parameters.validate()?;
        Ok(parameters)
    }

    /// Loads parameters from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read parameters file {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("Invalid parameters file {}", path.display()))
    }

    /// Resolves parameters from command-line overrides and the parameters file.
    ///
    /// When both overrides are given the file is not read at all. Otherwise the
    /// file supplies whatever the overrides leave out.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is missing from both sources, the file
    /// cannot be parsed, or a value is empty.
    pub fn resolve(
        path: &Path,
        bq_model_name: Option<String>,
        bq_master_table: Option<String>,
    ) -> Result<Self> {
        if let (Some(model), Some(table)) = (&bq_model_name, &bq_master_table) {
            let parameters = Self::new(model.clone(), table.clone());
            parameters.validate()?;
            return Ok(parameters);
        }

        if !path.exists() {
            anyhow::bail!(
                "Parameters file {} not found; pass both --model-name and --master-table instead",
                path.display()
            );
        }

        Self::load(path)?.with_overrides(bq_model_name, bq_master_table)
    }

    /// Replaces values with the given overrides, when present.
    ///
    /// # Errors
    ///
    /// Returns an error if an override is empty.
    pub fn with_overrides(
        mut self,
        bq_model_name: Option<String>,
        bq_master_table: Option<String>,
    ) -> Result<Self> {
        if let Some(model) = bq_model_name {
            self.bq_model_name = model;
        }
        if let Some(table) = bq_master_table {
            self.bq_master_table = table;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.bq_model_name.trim().is_empty() {
            anyhow::bail!("bq_model_name must not be empty");
        }
        if self.bq_master_table.trim().is_empty() {
            anyhow::bail!("bq_master_table must not be empty");
        }
        Ok(())
    }
}
