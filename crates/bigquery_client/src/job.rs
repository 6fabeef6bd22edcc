//! Query jobs and the services that run them.

use crate::api::models::{JobReference, QueryResponse};
use crate::error::BigQueryError;
use crate::rows::QueryRows;

/// Handle to a submitted query.
///
/// Created by [`QueryService::query`] and consumed by [`QueryService::result`].
#[derive(Debug, Clone)]
pub struct QueryJob {
    pub(crate) reference: JobReference,
    pub(crate) response: QueryResponse,
}

impl QueryJob {
    #[must_use]
    pub fn job_id(&self) -> &str {
        &self.reference.job_id
    }
}

/// A service that runs SQL as remote jobs.
///
/// Submission and waiting are separate steps so that callers can log or
/// inspect the job in between.
pub trait QueryService {
    /// Handle returned on submission.
    type Job: Send;

    /// Submits `sql` as a new job.
    fn query(&self, sql: &str) -> impl Future<Output = Result<Self::Job, BigQueryError>> + Send;

    /// Blocks until the job completes and returns all of its rows.
    fn result(
        &self,
        job: Self::Job,
    ) -> impl Future<Output = Result<QueryRows, BigQueryError>> + Send;
}
