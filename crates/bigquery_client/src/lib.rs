//! BigQuery query-job client.
//!
//! Submits GoogleSQL statements as query jobs, waits for them to finish and
//! decodes their result rows.

pub mod api;
mod error;
mod job;
mod rows;

pub use api::client::BigQueryClient;
pub use config::Config;
pub use error::BigQueryError;
pub use job::{QueryJob, QueryService};
pub use rows::{QueryRows, Row};
