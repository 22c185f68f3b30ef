//! Result enhancement, batching, aggregation, and storage forwarding.

use std::collections::BTreeMap;
use std::mem;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map as JsonMap, Value};
use tracing::{debug, warn};

use warden_core::{GateResult, GateStatus, ResultStorage, RunSummary};

/// A gate result enhanced with run-level context and persistence state.
#[derive(Debug, Clone, Serialize)]
pub struct ReportedResult {
    /// The underlying gate result.
    pub result: GateResult,
    /// Correlation id of the run this result belongs to.
    pub task_id: Option<String>,
    /// Reporter-level metadata merged into every result.
    pub metadata: JsonMap<String, Value>,
    /// Whether the result reached the storage collaborator.
    pub stored: bool,
    /// Why persistence failed, when it did.
    pub storage_error: Option<String>,
    /// When the reporter saw the result.
    pub reported_at: DateTime<Utc>,
}

/// Outcome of flushing the batch buffer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FlushReport {
    /// Number of buffered entries processed.
    pub flushed: usize,
    /// Entries persisted successfully.
    pub stored: usize,
    /// Entries whose persistence failed.
    pub failed: usize,
    /// The processed entries with their final persistence state.
    pub results: Vec<ReportedResult>,
}

/// A run summary with its persistence state.
///
/// The summary itself stays a pure value; persistence bookkeeping lives here.
#[derive(Debug, Clone, Serialize)]
pub struct StoredSummary {
    /// The aggregate verdict.
    pub summary: RunSummary,
    /// Whether the summary reached the storage collaborator.
    pub stored: bool,
    /// Why persistence failed, when it did.
    pub storage_error: Option<String>,
}

/// Collects per-gate results, enhances them with run context, and forwards
/// them to an optional storage collaborator.
///
/// Persistence is always best-effort: failures are logged and recorded as
/// `stored = false`, never raised to the caller. The batch buffer is the one
/// piece of shared mutable state in the engine; appends are serialized
/// behind a mutex because parallel-mode gate tasks report concurrently.
#[derive(Default)]
pub struct QualityReporter {
    /// Optional persistence backend.
    storage: Option<Arc<dyn ResultStorage>>,
    /// Buffer results until [`QualityReporter::flush_batch`] instead of
    /// persisting immediately.
    batching: bool,
    /// Metadata merged into every reported result.
    metadata: JsonMap<String, Value>,
    /// Correlation id of the run in flight.
    task_id: Mutex<Option<String>>,
    /// Results awaiting a flush.
    batch: Mutex<Vec<ReportedResult>>,
}

impl QualityReporter {
    /// Creates a reporter with no storage and batching off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a storage collaborator.
    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn ResultStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Turns batching on or off.
    #[must_use]
    pub fn with_batching(mut self, batching: bool) -> Self {
        self.batching = batching;
        self
    }

    /// Sets metadata merged into every reported result.
    #[must_use]
    pub fn with_metadata(mut self, metadata: JsonMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Sets the correlation id shared by all results of the current run.
    pub fn set_task_id(&self, task_id: Option<String>) {
        if let Ok(mut guard) = self.task_id.lock() {
            *guard = task_id;
        }
    }

    /// Returns the correlation id of the run in flight.
    pub fn current_task_id(&self) -> Option<String> {
        self.task_id.lock().map(|guard| guard.clone()).ok().flatten()
    }

    /// Enhances a gate result with run context and forwards it.
    ///
    /// With batching active the result is buffered and storage is not
    /// contacted. Otherwise, when both a storage collaborator and a task id
    /// are present, the result is persisted immediately; a failed write
    /// degrades to `stored = false`.
    pub async fn report_result(&self, result: GateResult) -> ReportedResult {
        let task_id = self.current_task_id();
        let mut reported = ReportedResult {
            result,
            task_id,
            metadata: self.metadata.clone(),
            stored: false,
            storage_error: None,
            reported_at: Utc::now(),
        };

        if self.batching {
            if let Ok(mut batch) = self.batch.lock() {
                batch.push(reported.clone());
            }
            return reported;
        }

        if let Some(storage) = self.storage.as_ref()
            && let Some(task_id_value) = reported.task_id.clone()
        {
            match storage
                .store_quality_result(&task_id_value, &reported.result.gate, &reported.result)
                .await
            {
                Ok(receipt) => {
                    debug!(
                        "Stored result for gate '{}' as {}",
                        reported.result.gate, receipt.id
                    );
                    reported.stored = true;
                }
                Err(error) => {
                    warn!(
                        "Failed to store result for gate '{}': {error}",
                        reported.result.gate
                    );
                    reported.storage_error = Some(error.to_string());
                }
            }
        }

        reported
    }

    /// Persists every buffered result and clears the batch.
    ///
    /// Flushing an empty batch is a no-op that never contacts storage.
    pub async fn flush_batch(&self) -> FlushReport {
        let drained = match self.batch.lock() {
            Ok(mut guard) => mem::take(&mut *guard),
            Err(_poisoned) => Vec::new(),
        };

        if drained.is_empty() {
            return FlushReport::default();
        }

        let mut report = FlushReport {
            flushed: drained.len(),
            ..FlushReport::default()
        };

        for mut entry in drained {
            if let Some(storage) = self.storage.as_ref()
                && let Some(task_id_value) = entry.task_id.clone()
            {
                match storage
                    .store_quality_result(&task_id_value, &entry.result.gate, &entry.result)
                    .await
                {
                    Ok(_receipt) => {
                        entry.stored = true;
                        report.stored += 1;
                    }
                    Err(error) => {
                        warn!(
                            "Failed to store batched result for gate '{}': {error}",
                            entry.result.gate
                        );
                        entry.storage_error = Some(error.to_string());
                        report.failed += 1;
                    }
                }
            }
            report.results.push(entry);
        }

        report
    }

    /// Computes the aggregate verdict over a run's results.
    ///
    /// Pure: recomputing over the same results yields an identical summary,
    /// and the `BTreeMap` of gate sub-summaries keeps serialization
    /// byte-stable. Run duration and task id are attached by the runner
    /// afterwards.
    pub fn generate_summary(results: &[GateResult]) -> RunSummary {
        let mut summary = RunSummary {
            total: results.len(),
            passed: 0,
            failed: 0,
            skipped: 0,
            errors: 0,
            gates: BTreeMap::new(),
            overall_status: GateStatus::Pass,
            score: 0.0,
            duration_ms: 0,
            task_id: None,
        };

        for result in results {
            match result.status {
                GateStatus::Pass => summary.passed += 1,
                GateStatus::Fail => summary.failed += 1,
                GateStatus::Skip => summary.skipped += 1,
                GateStatus::Error => summary.errors += 1,
            }

            let gate_summary = summary.gates.entry(result.gate.clone()).or_default();
            gate_summary.total += 1;
            match result.status {
                GateStatus::Pass => gate_summary.passed += 1,
                GateStatus::Fail | GateStatus::Error => gate_summary.failed += 1,
                GateStatus::Skip => {}
            }
            gate_summary.results.push(result.clone());
        }

        summary.overall_status = if summary.failed == 0 && summary.errors == 0 {
            GateStatus::Pass
        } else {
            GateStatus::Fail
        };
        summary.score = if summary.total == 0 {
            0.0
        } else {
            summary.passed as f64 / summary.total as f64 * 100.0
        };

        summary
    }

    /// Persists the final summary, best-effort.
    pub async fn store_summary(&self, summary: RunSummary) -> StoredSummary {
        let mut stored_summary = StoredSummary {
            summary,
            stored: false,
            storage_error: None,
        };

        if let Some(storage) = self.storage.as_ref()
            && let Some(task_id_value) = stored_summary.summary.task_id.clone()
        {
            match storage
                .store_run_summary(&task_id_value, &stored_summary.summary)
                .await
            {
                Ok(receipt) => {
                    debug!("Stored run summary as {}", receipt.id);
                    stored_summary.stored = true;
                }
                Err(error) => {
                    warn!("Failed to store run summary: {error}");
                    stored_summary.storage_error = Some(error.to_string());
                }
            }
        }

        stored_summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::to_string;
    use warden_core::GateOutcome;

    fn result_with_status(gate: &str, status: GateStatus) -> GateResult {
        let outcome = GateOutcome::with_status(status, Vec::new());
        GateResult::from_outcome(gate, outcome, 10, 1)
    }

    #[test]
    fn test_summary_counts_and_score() {
        let results = vec![
            result_with_status("style", GateStatus::Pass),
            result_with_status("security", GateStatus::Pass),
            result_with_status("tests", GateStatus::Fail),
        ];

        let summary = QualityReporter::generate_summary(&results);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.overall_status, GateStatus::Fail);
        assert!((summary.score - 66.666_666_666_666_67).abs() < 1e-9);
    }

    #[test]
    fn test_summary_is_idempotent() {
        let results = vec![
            result_with_status("style", GateStatus::Pass),
            result_with_status("tests", GateStatus::Error),
            result_with_status("style", GateStatus::Skip),
        ];

        let first = to_string(&QualityReporter::generate_summary(&results)).unwrap_or_default();
        let second = to_string(&QualityReporter::generate_summary(&results)).unwrap_or_default();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_summary_of_empty_run() {
        let summary = QualityReporter::generate_summary(&[]);
        assert_eq!(summary.total, 0);
        assert!(summary.score.abs() < f64::EPSILON);
        assert_eq!(summary.overall_status, GateStatus::Pass);
    }

    #[test]
    fn test_skip_counts_toward_total_only() {
        let results = vec![result_with_status("style", GateStatus::Skip)];
        let summary = QualityReporter::generate_summary(&results);
        assert_eq!(summary.total, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.passed, 0);
        assert_eq!(summary.failed, 0);

        let gate_summary = summary.gates.get("style").cloned().unwrap_or_default();
        assert_eq!(gate_summary.total, 1);
        assert_eq!(gate_summary.passed, 0);
        assert_eq!(gate_summary.failed, 0);
    }

    #[test]
    fn test_error_counts_as_gate_failure() {
        let results = vec![result_with_status("tests", GateStatus::Error)];
        let summary = QualityReporter::generate_summary(&results);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.overall_status, GateStatus::Fail);

        let gate_summary = summary.gates.get("tests").cloned().unwrap_or_default();
        assert_eq!(gate_summary.failed, 1);
    }

    #[tokio::test]
    async fn test_batching_defers_and_reports_unstored() {
        let reporter = QualityReporter::new().with_batching(true);
        reporter.set_task_id(Some("task-1".to_owned()));

        let reported = reporter
            .report_result(result_with_status("style", GateStatus::Pass))
            .await;
        assert!(!reported.stored);
        assert_eq!(reported.task_id.as_deref(), Some("task-1"));

        let flush = reporter.flush_batch().await;
        assert_eq!(flush.flushed, 1);
        assert_eq!(flush.stored, 0);
        assert_eq!(flush.failed, 0);
    }

    #[tokio::test]
    async fn test_flush_empty_batch_is_noop() {
        let reporter = QualityReporter::new().with_batching(true);
        let flush = reporter.flush_batch().await;
        assert_eq!(flush.flushed, 0);
        assert!(flush.results.is_empty());
    }
}
