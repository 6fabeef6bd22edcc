//! Data science pipeline nodes.
//!
//! Training and evaluation both run inside BigQuery ML; the nodes only
//! submit the statements, wait for the jobs and report the outcome.

use std::path::Path;

use anyhow::Context as _;
use bigquery_client::{BigQueryError, QueryService};
use config::Parameters;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::sql::{evaluate_model_query, train_model_query};

/// State reported once the model has been (re)created.
pub const READY: &str = "ready";

/// A row of the training node output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRow {
    pub state: String,
}

/// Single-row table returned by [`train_model`].
///
/// It carries no reference to the model itself; downstream steps only use
/// it as a signal that training has finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelStatus {
    rows: Vec<StatusRow>,
}

impl ModelStatus {
    #[must_use]
    pub fn ready() -> Self {
        Self {
            rows: vec![StatusRow {
                state: READY.to_string(),
            }],
        }
    }

    #[must_use]
    pub fn rows(&self) -> &[StatusRow] {
        &self.rows
    }

    /// Reads a status table written by [`ModelStatus::save`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a status table.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read status file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Invalid status file {}", path.display()))
    }

    /// Writes the status table as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write status file {}", path.display()))
    }
}

/// Trains the linear regression price model in BigQuery ML.
///
/// The training data never leaves the warehouse: the statement selects it
/// from `bq_master_table` and writes the model to `bq_model_name`,
/// replacing any existing model.
///
/// # Errors
///
/// Returns the client error unchanged if the job cannot be submitted or fails.
pub async fn train_model<C: QueryService>(
    client: &C,
    parameters: &Parameters,
) -> Result<ModelStatus, BigQueryError> {
    info!(
        model = %parameters.bq_model_name,
        table = %parameters.bq_master_table,
        "Training model"
    );

    let job = client.query(&train_model_query(parameters)).await?;
    client.result(job).await?;

    info!(model = %parameters.bq_model_name, "Model trained");

    Ok(ModelStatus::ready())
}

/// Calculates the coefficient of determination and logs the result.
///
/// `status` is the output of [`train_model`]; it orders this node after
/// training and is otherwise unused. Returns the scores in row order.
///
/// # Errors
///
/// Returns the client error unchanged if the job cannot be submitted or
/// fails, or if a row has no numeric `r2_score`.
pub async fn evaluate_model<C: QueryService>(
    client: &C,
    _status: &ModelStatus,
    parameters: &Parameters,
) -> Result<Vec<f64>, BigQueryError> {
    let job = client.query(&evaluate_model_query(parameters)).await?;
    let rows = client.result(job).await?;

    let mut scores = Vec::with_capacity(rows.len());
    for row in rows.iter() {
        let r2_score = row.get_f64("r2_score")?;
        info!("Model has a coefficient R^2 of {r2_score:.3}.");
        scores.push(r2_score);
    }

    Ok(scores)
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use bigquery_client::QueryRows;
    use serde_json::json;
    use tracing::subscriber::DefaultGuard;
    use tracing_subscriber::fmt::MakeWriter;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum FailAt {
        Query,
        Result,
    }

    /// Records submitted SQL and answers with canned rows.
    #[derive(Default)]
    struct MockClient {
        rows: QueryRows,
        fail_at: Option<FailAt>,
        submitted: Mutex<Vec<String>>,
    }

    impl MockClient {
        fn returning(rows: QueryRows) -> Self {
            Self {
                rows,
                ..Self::default()
            }
        }

        fn failing_at(fail_at: FailAt) -> Self {
            Self {
                fail_at: Some(fail_at),
                ..Self::default()
            }
        }

        fn submitted(&self) -> Vec<String> {
            self.submitted.lock().unwrap().clone()
        }
    }

    impl QueryService for MockClient {
        type Job = String;

        async fn query(&self, sql: &str) -> Result<String, BigQueryError> {
            self.submitted.lock().unwrap().push(sql.to_string());
            if self.fail_at == Some(FailAt::Query) {
                return Err(BigQueryError::Api {
                    status: 403,
                    message: "Access Denied".to_string(),
                });
            }
            Ok("job_1".to_string())
        }

        async fn result(&self, job: String) -> Result<QueryRows, BigQueryError> {
            if self.fail_at == Some(FailAt::Result) {
                return Err(BigQueryError::JobFailed {
                    job_id: job,
                    reason: "notFound".to_string(),
                    message: "Not found: Table my-project:spaceflights.master_table".to_string(),
                });
            }
            Ok(self.rows.clone())
        }
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Routes this thread's log output into a buffer until the guard drops.
    fn capture_logs() -> (CapturedLogs, DefaultGuard) {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (logs, guard)
    }

    fn parameters() -> Parameters {
        Parameters::new(
            "my-project.spaceflights.price_model",
            "my-project.spaceflights.master_table",
        )
    }

    fn r2_rows(scores: &[&str]) -> QueryRows {
        QueryRows::new(
            vec!["r2_score".to_string()],
            scores.iter().map(|score| vec![json!(score)]).collect(),
        )
    }

    #[tokio::test]
    async fn test_train_model_returns_ready() {
        let client = MockClient::default();

        let status = train_model(&client, &parameters()).await.unwrap();

        assert_eq!(status.rows().len(), 1);
        assert_eq!(status.rows()[0].state, "ready");
        assert_eq!(status, ModelStatus::ready());
    }

    #[tokio::test]
    async fn test_train_model_submits_template() {
        let client = MockClient::default();

        train_model(&client, &parameters()).await.unwrap();

        assert_eq!(client.submitted(), vec![train_model_query(&parameters())]);
    }

    #[tokio::test]
    async fn test_train_model_propagates_query_error() {
        let client = MockClient::failing_at(FailAt::Query);

        let err = train_model(&client, &parameters()).await.unwrap_err();

        assert!(matches!(err, BigQueryError::Api { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_train_model_propagates_result_error() {
        let client = MockClient::failing_at(FailAt::Result);

        let err = train_model(&client, &parameters()).await.unwrap_err();

        assert!(
            matches!(err, BigQueryError::JobFailed { ref reason, .. } if reason == "notFound")
        );
    }

    #[tokio::test]
    async fn test_evaluate_model_logs_r2_score() {
        let (logs, _guard) = capture_logs();
        let client = MockClient::returning(r2_rows(&["0.842"]));

        let scores = evaluate_model(&client, &ModelStatus::ready(), &parameters())
            .await
            .unwrap();

        assert_eq!(scores, vec![0.842]);
        assert!(
            logs.contents()
                .contains("Model has a coefficient R^2 of 0.842.")
        );
        assert_eq!(client.submitted(), vec![evaluate_model_query(&parameters())]);
    }

    #[tokio::test]
    async fn test_evaluate_model_rounds_to_three_decimals() {
        let (logs, _guard) = capture_logs();
        let client = MockClient::returning(r2_rows(&["0.84249", "0.5"]));

        evaluate_model(&client, &ModelStatus::ready(), &parameters())
            .await
            .unwrap();

        let contents = logs.contents();
        assert!(contents.contains("Model has a coefficient R^2 of 0.842."));
        assert!(contents.contains("Model has a coefficient R^2 of 0.500."));
    }

    #[tokio::test]
    async fn test_evaluate_model_empty_result() {
        let (logs, _guard) = capture_logs();
        let client = MockClient::returning(r2_rows(&[]));

        let scores = evaluate_model(&client, &ModelStatus::ready(), &parameters())
            .await
            .unwrap();

        assert!(scores.is_empty());
        assert!(!logs.contents().contains("coefficient"));
    }

    #[tokio::test]
    async fn test_evaluate_model_propagates_errors() {
        let client = MockClient::failing_at(FailAt::Query);
        let err = evaluate_model(&client, &ModelStatus::ready(), &parameters())
            .await
            .unwrap_err();
        assert!(matches!(err, BigQueryError::Api { status: 403, .. }));

        let client = MockClient::failing_at(FailAt::Result);
        let err = evaluate_model(&client, &ModelStatus::ready(), &parameters())
            .await
            .unwrap_err();
        assert!(matches!(err, BigQueryError::JobFailed { .. }));
    }

    #[test]
    fn test_model_status_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.json");

        ModelStatus::ready().save(&path).unwrap();
        assert_eq!(ModelStatus::load(&path).unwrap(), ModelStatus::ready());
    }

    #[test]
    fn test_model_status_load_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.json");
        let err = ModelStatus::load(&missing).unwrap_err();
        assert!(err.to_string().contains("Failed to read status file"));

        let invalid = dir.path().join("invalid.json");
        std::fs::write(&invalid, "{\"state\": \"ready\"}").unwrap();
        let err = ModelStatus::load(&invalid).unwrap_err();
        assert!(err.to_string().contains("Invalid status file"));
    }

    #[test]
    fn test_model_status_serializes_as_table() {
        let json = serde_json::to_value(ModelStatus::ready()).unwrap();
        assert_eq!(json, json!([{"state": "ready"}]));

        let status: ModelStatus = serde_json::from_value(json).unwrap();
        assert_eq!(status, ModelStatus::ready());
    }
}
