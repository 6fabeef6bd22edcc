//! BigQuery v2 REST API.

pub mod client;
pub mod models;
