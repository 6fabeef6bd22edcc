//! Request and response types for the BigQuery v2 REST API.

use serde::{Deserialize, Serialize};

/// Body of POST /projects/{projectId}/queries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// SQL text of the query
    pub query: String,

    /// Always false, the statements use GoogleSQL
    pub use_legacy_sql: bool,

    /// Job location (e.g. "EU")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// How long the server waits for the job before answering
    pub timeout_ms: u32,
}

/// Response from the query and getQueryResults endpoints.
///
/// Both endpoints share this shape; `rows` and `schema` are only
/// present once `job_complete` is true.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    /// Reference to the job backing the query
    pub job_reference: Option<JobReference>,

    /// Whether the job has finished
    #[serde(default)]
    pub job_complete: bool,

    /// Result schema
    pub schema: Option<TableSchema>,

    /// Rows of the current page
    #[serde(default)]
    pub rows: Vec<TableRow>,

    /// Token for the next page of results (if available)
    pub page_token: Option<String>,
}

/// Identifies a job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    /// Project that owns the job
    pub project_id: String,

    /// Unique job ID
    pub job_id: String,

    /// Location the job runs in
    pub location: Option<String>,
}

/// Schema of a result set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableSchema {
    /// Columns, in row order
    #[serde(default)]
    pub fields: Vec<TableFieldSchema>,
}

/// A single column of a result schema.
#[derive(Debug, Clone, Deserialize)]
pub struct TableFieldSchema {
    /// Column name
    pub name: String,
}

/// A result row, cells in schema order.
#[derive(Debug, Clone, Deserialize)]
pub struct TableRow {
    /// Cells
    #[serde(default)]
    pub f: Vec<TableCell>,
}

/// A single cell. Scalars are encoded as strings, NULL as JSON null.
#[derive(Debug, Clone, Deserialize)]
pub struct TableCell {
    /// Cell value
    pub v: serde_json::Value,
}

/// Response from GET /projects/{projectId}/jobs/{jobId}.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Execution status
    pub status: JobStatus,
}

/// Execution status of a job.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    /// PENDING, RUNNING or DONE
    pub state: String,

    /// Final error, present only when the job failed
    pub error_result: Option<ErrorProto>,
}

/// An error reported by a job.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorProto {
    /// Short error code (e.g. "invalidQuery", "notFound")
    pub reason: Option<String>,

    /// Human-readable description
    pub message: Option<String>,
}

/// Error envelope returned with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    /// Error body
    pub error: ApiErrorBody,
}

/// Body of an error envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Human-readable description
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_request_serializes_camel_case() {
        let request = QueryRequest {
            query: "SELECT 1".to_string(),
            use_legacy_sql: false,
            location: None,
            timeout_ms: 10_000,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "query": "SELECT 1",
                "useLegacySql": false,
                "timeoutMs": 10_000,
            })
        );
    }

    #[test]
    fn test_incomplete_query_response() {
        let body = r#"{
            "kind": "bigquery#queryResponse",
            "jobReference": {"projectId": "p", "jobId": "job_1", "location": "US"},
            "jobComplete": false
        }"#;
        let response: QueryResponse = serde_json::from_str(body).unwrap();
        assert!(!response.job_complete);
        assert!(response.rows.is_empty());
        assert!(response.schema.is_none());
        assert_eq!(response.job_reference.unwrap().job_id, "job_1");
    }

    #[test]
    fn test_job_with_error_result() {
        let body = r#"{
            "jobReference": {"projectId": "p", "jobId": "job_1"},
            "status": {
                "state": "DONE",
                "errorResult": {"reason": "notFound", "message": "Not found: Table p:d.t"},
                "errors": [{"reason": "notFound", "message": "Not found: Table p:d.t"}]
            }
        }"#;
        let job: Job = serde_json::from_str(body).unwrap();
        assert_eq!(job.status.state, "DONE");
        assert_eq!(
            job.status.error_result.unwrap().reason.as_deref(),
            Some("notFound")
        );
    }
}
