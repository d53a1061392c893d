//! Asynchronous workspace metadata scan jobs.
//!
//! A scan is triggered for a batch of workspace ids with one POST to
//! `admin/workspaces/getInfo`; the response body is uninteresting and the
//! job handle is the `Location` response header. Status is polled at that
//! location until `Succeeded` or the poll budget is exhausted, and the
//! final status response's own `Location` header points at the result
//! endpoint (valid for a bounded retention window after completion).

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{PowerBiClient, PowerBiError};

/// Query flags requesting the full metadata surface: dataset expressions,
/// schema, datasource details, artifact users and lineage.
const SCAN_INFO_FLAGS: &str = "datasetExpressions=True&datasetSchema=True\
&datasourceDetails=True&getArtifactUsers=True&lineage=True";

/// Lifecycle status of a scan job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    /// Any status string this library does not know about
    #[serde(untagged)]
    Other(String),
}

impl ScanStatus {
    /// Check if the scan completed successfully.
    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        matches!(self, ScanStatus::Succeeded)
    }

    /// Check if the scan reached a terminal state (success or failure).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanStatus::Succeeded | ScanStatus::Failed)
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanStatus::NotStarted => write!(f, "NotStarted"),
            ScanStatus::Running => write!(f, "Running"),
            ScanStatus::Succeeded => write!(f, "Succeeded"),
            ScanStatus::Failed => write!(f, "Failed"),
            ScanStatus::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Handle for one in-flight scan job: the status poll URL returned in the
/// scan trigger's `Location` header. Lives for one batch iteration.
#[derive(Debug, Clone)]
pub struct ScanJob {
    pub location: String,
}

/// Body of a scan status response.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanStatusResponse {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub status: ScanStatus,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// One status poll: the parsed body plus the result location carried on
/// the response's `Location` header (present once the scan succeeded).
#[derive(Debug, Clone)]
pub struct ScanStatusPoll {
    pub response: ScanStatusResponse,
    pub result_location: Option<String>,
}

/// Full nested metadata record for one workspace.
///
/// Only id and name are modelled; everything else (reports, dashboards,
/// datasets, dataflows, users, lineage, ...) is preserved verbatim in
/// `extra` so the record round-trips unchanged through JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl WorkspaceInfo {
    /// Nested child records under `key` (e.g. `reports`), empty when absent.
    #[must_use]
    pub fn children(&self, key: &str) -> &[serde_json::Value] {
        self.extra
            .get(key)
            .and_then(|v| v.as_array())
            .map_or(&[], Vec::as_slice)
    }
}

/// Result set of one scan job (and, by concatenation, of a whole run).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanResult {
    pub workspaces: Vec<WorkspaceInfo>,
}

/// Outcome of driving one batch's scan to completion.
///
/// Nothing is dropped silently: a batch that never reached `Succeeded`
/// within the poll budget is reported as `TimedOut`, an explicit `Failed`
/// status as `Failed`, and the caller decides whether to abort or proceed
/// with a partial aggregate.
#[derive(Debug)]
pub enum BatchOutcome {
    /// The scan succeeded and its result was fetched
    Succeeded(ScanResult),
    /// The poll budget was exhausted before the scan reached `Succeeded`
    TimedOut { polls: u32, last_status: ScanStatus },
    /// The scan reported a terminal failure status
    Failed { status: ScanStatus },
}

/// Tunables for scan submission and polling.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Maximum workspaces per scan request (the API caps this at 100)
    pub batch_size: usize,
    /// Fixed wait between status polls
    pub poll_interval: Duration,
    /// Maximum number of status polls before a batch is abandoned
    pub max_polls: u32,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            poll_interval: Duration::from_secs(30),
            max_polls: 10,
        }
    }
}

impl ScanOptions {
    /// Override the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Override the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Override the poll budget.
    #[must_use]
    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }
}

#[derive(Serialize)]
struct ScanRequest<'a> {
    workspaces: &'a [String],
}

/// Scan API operations.
pub struct ScanApi<'a> {
    client: &'a PowerBiClient,
}

impl<'a> ScanApi<'a> {
    /// Create a new scan API instance.
    #[must_use]
    pub fn new(client: &'a PowerBiClient) -> Self {
        Self { client }
    }

    /// Trigger a metadata scan for one batch of workspace ids.
    ///
    /// # Errors
    ///
    /// Returns `PowerBiError::Api` on a non-success status and
    /// `PowerBiError::InvalidResponse` when the response carries no
    /// `Location` header to poll.
    pub async fn start_scan(&self, workspace_ids: &[String]) -> Result<ScanJob, PowerBiError> {
        let url = self
            .client
            .admin_url(&format!("admin/workspaces/getInfo?{SCAN_INFO_FLAGS}"));

        let response = self
            .client
            .post_json(
                &url,
                &ScanRequest {
                    workspaces: workspace_ids,
                },
            )
            .await?;

        let location = header_location(&response).ok_or_else(|| {
            PowerBiError::InvalidResponse(
                "scan trigger response carried no Location header".to_string(),
            )
        })?;

        debug!(
            "Scan requested for {} workspace(s); polling at {location}",
            workspace_ids.len()
        );
        Ok(ScanJob { location })
    }

    /// Poll the status of a scan job once.
    ///
    /// # Errors
    ///
    /// Returns `PowerBiError::Api` on a non-success HTTP status.
    pub async fn get_status(&self, job: &ScanJob) -> Result<ScanStatusPoll, PowerBiError> {
        let response = self.client.get(&job.location).await?;
        let result_location = header_location(&response);
        let body: ScanStatusResponse = response.json().await?;

        debug!("Scan status: {}", body.status);
        Ok(ScanStatusPoll {
            response: body,
            result_location,
        })
    }

    /// Fetch the result of a succeeded scan from its result location.
    ///
    /// # Errors
    ///
    /// Returns `PowerBiError::Api` on a non-success HTTP status (including
    /// results fetched after the retention window).
    pub async fn get_result(&self, location: &str) -> Result<ScanResult, PowerBiError> {
        let response = self.client.get(location).await?;
        let result: ScanResult = response.json().await?;
        Ok(result)
    }

    /// Drive one scan job to an explicit outcome.
    ///
    /// Sleeps `poll_interval` before each status check (a cancellable task
    /// suspension, never a thread block), stops as soon as the scan reports
    /// `Succeeded`, and gives up after `max_polls` checks. On success the
    /// result is fetched from the final status response's location; no
    /// result fetch is attempted for timed-out or failed scans.
    ///
    /// # Errors
    ///
    /// Propagates transport and non-success API errors from the status and
    /// result calls. Poll-budget exhaustion is not an error; it is the
    /// `TimedOut` outcome.
    pub async fn wait_for_scan(
        &self,
        job: &ScanJob,
        options: &ScanOptions,
    ) -> Result<BatchOutcome, PowerBiError> {
        let mut last_status = ScanStatus::NotStarted;

        for poll in 1..=options.max_polls {
            debug!(
                "Waiting {}s before status poll {poll}/{}",
                options.poll_interval.as_secs(),
                options.max_polls
            );
            tokio::time::sleep(options.poll_interval).await;

            let polled = self.get_status(job).await?;
            last_status = polled.response.status.clone();

            if last_status.is_succeeded() {
                let location = result_location_for(job, &polled)?;
                let result = self.get_result(&location).await?;
                info!(
                    "Scan succeeded after {poll} poll(s); fetched {} workspace record(s)",
                    result.workspaces.len()
                );
                return Ok(BatchOutcome::Succeeded(result));
            }

            if last_status.is_terminal() {
                warn!("Scan reported terminal status {last_status}");
                return Ok(BatchOutcome::Failed {
                    status: last_status,
                });
            }
        }

        Ok(BatchOutcome::TimedOut {
            polls: options.max_polls,
            last_status,
        })
    }

    /// Trigger a scan for one batch and drive it to an outcome.
    ///
    /// # Errors
    ///
    /// Propagates errors from `start_scan` and `wait_for_scan`.
    pub async fn scan_batch(
        &self,
        workspace_ids: &[String],
        options: &ScanOptions,
    ) -> Result<BatchOutcome, PowerBiError> {
        let job = self.start_scan(workspace_ids).await?;
        self.wait_for_scan(&job, options).await
    }
}

/// Where to fetch the result of a succeeded scan.
///
/// Prefers the status response's `Location` header; falls back to the
/// documented `scanResult/{id}` path when the header is absent but the
/// status body carries the scan id.
fn result_location_for(job: &ScanJob, polled: &ScanStatusPoll) -> Result<String, PowerBiError> {
    if let Some(location) = &polled.result_location {
        return Ok(location.clone());
    }

    if let Some(id) = polled.response.id.as_ref().map(id_to_string) {
        let base = job
            .location
            .split_once("/scanStatus/")
            .map(|(base, _)| base.to_string());
        if let Some(base) = base {
            return Ok(format!("{base}/scanResult/{id}"));
        }
    }

    Err(PowerBiError::InvalidResponse(
        "succeeded scan status carried no result location".to_string(),
    ))
}

fn id_to_string(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn header_location(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}
