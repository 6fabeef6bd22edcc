//! HTTP client for the BigQuery v2 REST API.

use core::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use config::Config;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::models::{ErrorEnvelope, Job, JobReference, QueryRequest, QueryResponse};
use crate::error::BigQueryError;
use crate::job::{QueryJob, QueryService};
use crate::rows::QueryRows;

/// How long the server holds a query or getQueryResults call open
/// waiting for the job to finish.
const SERVER_WAIT_MS: u32 = 10_000;

/// Timeout of a single HTTP request, must exceed `SERVER_WAIT_MS`.
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Delay bounds between completion polls.
const MIN_POLL_DELAY: Duration = Duration::from_millis(500);
const MAX_POLL_DELAY: Duration = Duration::from_secs(10);

/// Outcome of a completion poll that did not return a finished job.
enum Poll {
    Running,
    Failed(BigQueryError),
}

impl From<BigQueryError> for Poll {
    fn from(err: BigQueryError) -> Self {
        Self::Failed(err)
    }
}

/// Client for running query jobs against BigQuery.
///
/// Each instance owns its own connection pool; it is not shared between
/// pipeline nodes.
pub struct BigQueryClient {
    client: Client,
    config: Config,
}

impl BigQueryClient {
    /// Creates a new client for the configured project.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &Config) -> Result<Self, BigQueryError> {
        let client = Client::builder().timeout(HTTP_TIMEOUT).build()?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn project_url(&self, project_id: &str) -> String {
        format!("{}/projects/{project_id}", self.config.api_url)
    }

    /// Sends an authorized request and decodes the JSON response.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BigQueryError> {
        let response = request
            .bearer_auth(&self.config.access_token)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let mut message = serde_json::from_slice::<ErrorEnvelope>(&body).map_or_else(
                |_| String::from_utf8_lossy(&body).into_owned(),
                |envelope| envelope.error.message,
            );
            if status == StatusCode::UNAUTHORIZED {
                // Tokens are never refreshed, see `Config`
                message.push_str(" (access token invalid or expired, refresh BIGQUERY_ACCESS_TOKEN)");
            }
            return Err(BigQueryError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }

    /// Fetches the state of a job and, once complete, a page of its rows.
    async fn get_query_results(
        &self,
        reference: &JobReference,
        page_token: Option<&str>,
    ) -> Result<QueryResponse, BigQueryError> {
        let url = format!(
            "{}/queries/{}",
            self.project_url(&reference.project_id),
            reference.job_id
        );

        let mut params = vec![("timeoutMs", SERVER_WAIT_MS.to_string())];
        if let Some(location) = &reference.location {
            params.push(("location", location.clone()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        self.send(self.client.get(&url).query(&params)).await
    }

    /// Polls until the job reports completion.
    async fn wait_for_completion(&self, job: QueryJob) -> Result<QueryResponse, BigQueryError> {
        if job.response.job_complete {
            return Ok(job.response);
        }

        let reference = &job.reference;

        let polled = (|| async move {
            let response = self.get_query_results(reference, None).await?;
            if response.job_complete {
                Ok(response)
            } else {
                Err(Poll::Running)
            }
        })
        .retry(
            ExponentialBuilder::default()
                .with_min_delay(MIN_POLL_DELAY)
                .with_max_delay(MAX_POLL_DELAY)
                .without_max_times(),
        )
        .when(|poll| matches!(poll, Poll::Running))
        .notify(|_, delay| {
            debug!(job_id = %reference.job_id, ?delay, "Job still running");
        })
        .await;

        match polled {
            Ok(response) => Ok(response),
            Err(Poll::Failed(err)) => Err(err),
            // Polling has no attempt limit, so this only happens if one is added
            Err(Poll::Running) => Err(BigQueryError::JobFailed {
                job_id: reference.job_id.clone(),
                reason: "incomplete".to_string(),
                message: "job did not complete".to_string(),
            }),
        }
    }

    /// Fails if the finished job carries an error result.
    async fn check_job_status(&self, reference: &JobReference) -> Result<(), BigQueryError> {
        let url = format!(
            "{}/jobs/{}",
            self.project_url(&reference.project_id),
            reference.job_id
        );

        let mut request = self.client.get(&url);
        if let Some(location) = &reference.location {
            request = request.query(&[("location", location)]);
        }

        let job: Job = self.send(request).await?;
        debug!(job_id = %reference.job_id, state = %job.status.state, "Job status");

        if let Some(error) = job.status.error_result {
            return Err(BigQueryError::JobFailed {
                job_id: reference.job_id.clone(),
                reason: error.reason.unwrap_or_else(|| "unknown".to_string()),
                message: error.message.unwrap_or_default(),
            });
        }

        Ok(())
    }

    /// Collects the first page and every following page of results.
    async fn collect_rows(
        &self,
        reference: &JobReference,
        first_page: QueryResponse,
    ) -> Result<QueryRows, BigQueryError> {
        let mut rows = QueryRows::from_schema(first_page.schema.as_ref());
        rows.extend_from_page(first_page.rows);

        let mut page_token = first_page.page_token;
        while let Some(token) = page_token {
            debug!(job_id = %reference.job_id, "Fetching next result page");
            let page = self.get_query_results(reference, Some(&token)).await?;
            rows.extend_from_page(page.rows);
            page_token = page.page_token;
        }

        Ok(rows)
    }
}

impl QueryService for BigQueryClient {
    type Job = QueryJob;

    async fn query(&self, sql: &str) -> Result<QueryJob, BigQueryError> {
        let url = format!("{}/queries", self.project_url(&self.config.project_id));

        let request = QueryRequest {
            query: sql.to_string(),
            use_legacy_sql: false,
            location: self.config.location.clone(),
            timeout_ms: SERVER_WAIT_MS,
        };

        debug!(sql, "Submitting query");

        let response: QueryResponse = self.send(self.client.post(&url).json(&request)).await?;

        let reference = response
            .job_reference
            .clone()
            .ok_or_else(|| BigQueryError::Api {
                status: 200,
                message: "query response has no jobReference".to_string(),
            })?;

        info!(
            job_id = %reference.job_id,
            complete = response.job_complete,
            "Query job submitted"
        );

        Ok(QueryJob {
            reference,
            response,
        })
    }

    async fn result(&self, job: QueryJob) -> Result<QueryRows, BigQueryError> {
        let reference = job.reference.clone();

        let response = self.wait_for_completion(job).await?;
        self.check_job_status(&reference).await?;
        let rows = self.collect_rows(&reference, response).await?;

        info!(job_id = %reference.job_id, rows = rows.len(), "Query job completed");

        Ok(rows)
    }
}
