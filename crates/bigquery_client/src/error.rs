//! Errors raised while talking to BigQuery.

use thiserror::Error;

/// Errors returned by [`crate::BigQueryClient`] and [`crate::QueryRows`].
#[derive(Debug, Error)]
pub enum BigQueryError {
    /// The request could not be sent or the response could not be read.
    #[error("HTTP request to BigQuery failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("BigQuery API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    /// The job finished with an error result.
    #[error("BigQuery job {job_id} failed ({reason}): {message}")]
    JobFailed {
        job_id: String,
        reason: String,
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("Failed to decode BigQuery response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A requested column is not part of the result schema.
    #[error("Column `{0}` not found in query result")]
    MissingColumn(String),

    /// A cell could not be converted to the requested type.
    #[error("Invalid value in column `{column}`: {value}")]
    InvalidValue { column: String, value: String },
}
