//! The gate execution contract and the storage collaborator contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{
    GateContext, GateIssue, GateOutcome, GateResult, GateStatus, IssueSeverity, RunSummary,
};
use crate::Result;

/// A single named verification check.
///
/// Implementations are stateless across runs: `execute` must not carry state
/// from one invocation to the next, and metadata is immutable after
/// construction. A gate fails only by returning `Err` — never by handing back
/// a malformed outcome. The executor owns turning raised errors into `error`
/// results, timeouts, and retries; gates stay oblivious to attempts.
///
/// Gates that delegate to an external process own that process's lifecycle
/// and must tie it to the returned future (`kill_on_drop` on tokio commands),
/// so that a timed-out attempt terminates the child rather than leaking it.
#[async_trait]
pub trait Gate: Send + Sync {
    /// Runs the check against a code artifact.
    ///
    /// # Errors
    /// Returns an error if the check cannot be performed. The error is
    /// eligible for retry and is never surfaced to run callers directly.
    async fn execute(&self, code: &str, context: &GateContext) -> Result<GateOutcome>;

    /// Unique name of this gate.
    fn name(&self) -> &str;

    /// Whether the gate participates in runs. Disabled gates produce a
    /// `skip` result without any execution machinery engaging.
    fn enabled(&self) -> bool {
        true
    }

    /// Per-gate deadline in milliseconds. `None` defers to the runner's
    /// default.
    fn timeout_ms(&self) -> Option<u64> {
        None
    }

    /// Number of retries the executor may consume after failed attempts.
    fn retry_count(&self) -> u32 {
        0
    }

    /// Number of issues at severity `error` or above that fail the gate.
    fn failure_threshold(&self) -> usize {
        1
    }

    /// Failure policy: whether the collected issues fail the gate.
    fn should_fail(&self, issues: &[GateIssue]) -> bool {
        let blocking = issues
            .iter()
            .filter(|issue| issue.severity >= IssueSeverity::Error)
            .count();
        blocking >= self.failure_threshold()
    }

    /// Derives a pass/fail outcome from collected issues via [`Gate::should_fail`].
    ///
    /// Issue-collecting gates build their outcome through this so the failure
    /// policy lives in one place.
    fn outcome_from_issues(&self, issues: Vec<GateIssue>) -> GateOutcome {
        let status = if self.should_fail(&issues) {
            GateStatus::Fail
        } else {
            GateStatus::Pass
        };
        GateOutcome::with_status(status, issues)
    }
}

/// Receipt returned by a storage collaborator for a persisted record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreReceipt {
    /// Storage-assigned identifier of the persisted record.
    pub id: String,
}

/// External persistence for gate results and run summaries.
///
/// Always optional and always best-effort: the reporter records persistence
/// failures on the enhanced result (`stored = false`) and never lets them
/// reach the runner.
#[async_trait]
pub trait ResultStorage: Send + Sync {
    /// Prepares the backend for writes.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be prepared.
    async fn initialize(&self) -> Result<()>;

    /// Identifier of the backend kind (for example `memory` or `json-file`).
    fn storage_type(&self) -> &str;

    /// Whether records end up in a shared, off-machine location.
    fn supports_cloud(&self) -> bool;

    /// Persists one gate result under the given correlation id.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    async fn store_quality_result(
        &self,
        task_id: &str,
        gate_name: &str,
        result: &GateResult,
    ) -> Result<StoreReceipt>;

    /// Persists a run summary under the given correlation id.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    async fn store_run_summary(&self, task_id: &str, summary: &RunSummary) -> Result<StoreReceipt>;
}
