//! Spaceflights data science pipeline.
//!
//! Trains a linear regression model of shuttle prices with BigQuery ML and
//! reports how well it fits.

pub mod commands;
pub mod nodes;
pub mod sql;
