//! Batch scan orchestration.
//!
//! Partitions the workspace list into fixed-size batches, drives each
//! batch's scan job through the scan API, and aggregates the results in
//! arrival order. Batches that never reach `Succeeded` are recorded and
//! warned about explicitly; with `strict` they fail the whole run.

use log::{info, warn};
use powerbi_admin::{
    BatchOutcome, ModifiedWorkspace, PowerBiClient, PowerBiError, ScanOptions, ScanResult,
};
use std::time::Duration;

use crate::cli::Args;

/// Scan orchestration errors
#[derive(thiserror::Error, Debug)]
pub enum ScanRunError {
    /// Power BI API error (token, listing, scan trigger, status or result)
    #[error("Power BI API error: {0}")]
    Api(#[from] PowerBiError),

    /// One or more batches did not complete and strict mode is on
    #[error(
        "{incomplete} of {total} scan batches did not complete; rerun, raise --max-polls, or drop --strict to continue with partial results"
    )]
    IncompleteScan { incomplete: usize, total: usize },
}

/// Orchestration tunables, derived from the CLI once at startup.
#[derive(Debug, Clone)]
pub struct ScanRunConfig {
    pub batch_size: usize,
    pub poll_interval: Duration,
    pub max_polls: u32,
    /// Reproduce the original exporter, which returned after the first batch
    pub first_batch_only: bool,
    /// Fail the run when any batch is dropped
    pub strict: bool,
}

impl ScanRunConfig {
    #[must_use]
    pub fn from_args(args: &Args) -> Self {
        Self {
            batch_size: args.batch_size,
            poll_interval: Duration::from_secs(args.poll_interval),
            max_polls: args.max_polls,
            first_batch_only: args.first_batch_only,
            strict: args.strict,
        }
    }

    fn scan_options(&self) -> ScanOptions {
        ScanOptions::default()
            .with_batch_size(self.batch_size)
            .with_poll_interval(self.poll_interval)
            .with_max_polls(self.max_polls)
    }
}

/// A batch whose scan never produced a result, with the reason.
#[derive(Debug, Clone)]
pub struct DroppedBatch {
    /// Zero-based batch index
    pub index: usize,
    pub workspace_ids: Vec<String>,
    pub reason: String,
}

/// What a run scanned and what it dropped.
#[derive(Debug)]
pub struct ScanRunReport {
    /// Concatenation of every succeeded batch's workspaces, arrival order
    pub result: ScanResult,
    pub batches_total: usize,
    pub batches_succeeded: usize,
    pub dropped: Vec<DroppedBatch>,
}

/// Partition workspace ids into contiguous, order-preserving batches.
///
/// Produces `ceil(N / batch_size)` non-overlapping slices.
#[must_use]
pub fn chunk_workspaces(ids: &[String], batch_size: usize) -> Vec<&[String]> {
    ids.chunks(batch_size.max(1)).collect()
}

/// Scan every batch of the given workspaces and aggregate the results.
///
/// Each batch is triggered and polled in order; a succeeded batch's
/// workspaces are appended to the aggregate, a timed-out or failed batch
/// is recorded in the report and logged. With `first_batch_only` the run
/// stops after the first batch regardless of how many remain (the
/// original exporter's behavior, kept behind a flag).
///
/// # Errors
///
/// Propagates API errors immediately (no partial-result salvage on those
/// paths) and returns `IncompleteScan` when strict mode is on and any
/// batch was dropped.
pub async fn run_tenant_scan(
    client: &PowerBiClient,
    workspaces: &[ModifiedWorkspace],
    config: &ScanRunConfig,
) -> Result<ScanRunReport, ScanRunError> {
    let ids: Vec<String> = workspaces.iter().map(|ws| ws.id.clone()).collect();
    let batches = chunk_workspaces(&ids, config.batch_size);
    let total = batches.len();

    info!(
        "Workspaces to scan: {} ({} batch(es) of up to {})",
        ids.len(),
        total,
        config.batch_size
    );

    let scan_api = client.scan_api();
    let options = config.scan_options();
    let mut report = ScanRunReport {
        result: ScanResult::default(),
        batches_total: total,
        batches_succeeded: 0,
        dropped: Vec::new(),
    };

    for (index, batch) in batches.iter().enumerate() {
        info!(
            "Scanning batch {}/{} ({} workspace(s))",
            index + 1,
            total,
            batch.len()
        );

        let outcome = scan_api.scan_batch(batch, &options).await?;
        record_outcome(&mut report, index, batch, outcome);

        if config.first_batch_only {
            let remaining = total - index - 1;
            if remaining > 0 {
                warn!("--first-batch-only: skipping {remaining} remaining batch(es)");
            }
            break;
        }
    }

    if config.strict && !report.dropped.is_empty() {
        return Err(ScanRunError::IncompleteScan {
            incomplete: report.dropped.len(),
            total,
        });
    }

    info!(
        "Scan run complete: {}/{} batch(es) succeeded, {} workspace record(s) aggregated",
        report.batches_succeeded,
        total,
        report.result.workspaces.len()
    );
    Ok(report)
}

/// Fold one batch outcome into the run report.
fn record_outcome(
    report: &mut ScanRunReport,
    index: usize,
    batch: &[String],
    outcome: BatchOutcome,
) {
    match outcome {
        BatchOutcome::Succeeded(result) => {
            report.batches_succeeded += 1;
            report.result.workspaces.extend(result.workspaces);
        }
        BatchOutcome::TimedOut { polls, last_status } => {
            warn!(
                "Batch {} abandoned after {polls} poll(s); last status {last_status} - {} workspace(s) dropped from the aggregate",
                index + 1,
                batch.len()
            );
            report.dropped.push(DroppedBatch {
                index,
                workspace_ids: batch.to_vec(),
                reason: format!("poll budget exhausted (last status {last_status})"),
            });
        }
        BatchOutcome::Failed { status } => {
            warn!(
                "Batch {} failed with scan status {status} - {} workspace(s) dropped from the aggregate",
                index + 1,
                batch.len()
            );
            report.dropped.push(DroppedBatch {
                index,
                workspace_ids: batch.to_vec(),
                reason: format!("scan reported status {status}"),
            });
        }
    }
}
