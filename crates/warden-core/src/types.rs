//! Data types flowing through the gate engine: issues, outcomes, results,
//! and run summaries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};

use crate::Error;

/// Canonical execution status used at every layer of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateStatus {
    /// The gate ran and found nothing blocking.
    Pass,
    /// The gate ran and its failure policy tripped.
    Fail,
    /// The gate was disabled and never executed.
    Skip,
    /// The gate raised or timed out past its retry budget.
    Error,
}

impl GateStatus {
    /// Whether this status halts a fail-fast sequential run.
    ///
    /// An executor-level error counts exactly like a failed check.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Fail | Self::Error)
    }
}

/// Severity of a single diagnostic. Ordering is significant: the default
/// failure policy counts issues at [`IssueSeverity::Error`] and above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    /// Informational note, never blocking.
    Info,
    /// Should be fixed, does not fail a gate by default.
    Warning,
    /// Counts toward the gate's failure threshold.
    Error,
    /// Counts toward the failure threshold; reserved for security findings.
    Critical,
}

/// One diagnostic produced by a gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateIssue {
    /// 1-based line the issue was found on (0 when not line-addressable).
    pub line: usize,
    /// 1-based column within the line (0 when not column-addressable).
    pub column: usize,
    /// Severity of the finding.
    pub severity: IssueSeverity,
    /// Human-readable description.
    pub message: String,
    /// Identifier of the rule that produced the finding.
    pub rule: String,
    /// Whether the finding is mechanically fixable.
    pub fixable: bool,
}

impl GateIssue {
    /// Creates an issue at the given position.
    pub fn new<M: Into<String>, R: Into<String>>(
        line: usize,
        column: usize,
        severity: IssueSeverity,
        message: M,
        rule: R,
    ) -> Self {
        Self {
            line,
            column,
            severity,
            message: message.into(),
            rule: rule.into(),
            fixable: false,
        }
    }

    /// Marks the issue as mechanically fixable.
    #[must_use]
    pub fn fixable(mut self) -> Self {
        self.fixable = true;
        self
    }
}

/// What a gate's `execute` returns: the raw verdict before the executor
/// attaches timing and attempt information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateOutcome {
    /// Verdict of this execution.
    pub status: GateStatus,
    /// Diagnostics found, in discovery order.
    pub issues: Vec<GateIssue>,
    /// Gate-defined counters.
    pub stats: JsonMap<String, Value>,
    /// Gate-defined free-form data.
    pub details: JsonMap<String, Value>,
}

impl GateOutcome {
    /// Creates a passing outcome with no issues.
    pub fn pass() -> Self {
        Self {
            status: GateStatus::Pass,
            issues: Vec::new(),
            stats: JsonMap::new(),
            details: JsonMap::new(),
        }
    }

    /// Creates an outcome with an explicit status and issue list.
    pub fn with_status(status: GateStatus, issues: Vec<GateIssue>) -> Self {
        Self {
            status,
            issues,
            stats: JsonMap::new(),
            details: JsonMap::new(),
        }
    }

    /// Attaches a gate-defined counter.
    #[must_use]
    pub fn with_stat<T: Into<String>>(mut self, key: T, value: Value) -> Self {
        self.stats.insert(key.into(), value);
        self
    }

    /// Attaches a gate-defined detail entry.
    #[must_use]
    pub fn with_detail<T: Into<String>>(mut self, key: T, value: Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }
}

/// Final record of one gate invocation. Immutable once produced; retried
/// attempts discard their intermediate outcomes and only the last survives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateResult {
    /// Name of the gate that produced this result.
    pub gate: String,
    /// Verdict of the invocation.
    pub status: GateStatus,
    /// Diagnostics found, in discovery order.
    pub issues: Vec<GateIssue>,
    /// Gate-defined counters.
    pub stats: JsonMap<String, Value>,
    /// Gate-defined free-form data.
    pub details: JsonMap<String, Value>,
    /// Wall-clock duration of the invocation in milliseconds.
    pub duration_ms: u64,
    /// Number of attempts consumed (1 + retries). 0 for skipped gates.
    pub attempts: u32,
    /// When the result was produced.
    pub timestamp: DateTime<Utc>,
}

impl GateResult {
    /// Builds the final result from a gate outcome plus executor bookkeeping.
    pub fn from_outcome(gate: &str, outcome: GateOutcome, duration_ms: u64, attempts: u32) -> Self {
        Self {
            gate: gate.to_owned(),
            status: outcome.status,
            issues: outcome.issues,
            stats: outcome.stats,
            details: outcome.details,
            duration_ms,
            attempts,
            timestamp: Utc::now(),
        }
    }

    /// Builds a skip result for a disabled gate. The executor never ran, so
    /// duration and attempts are both zero.
    pub fn skipped(gate: &str, reason: &str) -> Self {
        let mut details = JsonMap::new();
        details.insert("reason".to_owned(), Value::String(reason.to_owned()));

        Self {
            gate: gate.to_owned(),
            status: GateStatus::Skip,
            issues: Vec::new(),
            stats: JsonMap::new(),
            details,
            duration_ms: 0,
            attempts: 0,
            timestamp: Utc::now(),
        }
    }

    /// Builds an error result after the retry budget is exhausted.
    pub fn from_error(gate: &str, error: &Error, duration_ms: u64, attempts: u32) -> Self {
        let mut details = JsonMap::new();
        details.insert("error".to_owned(), Value::String(error.to_string()));

        Self {
            gate: gate.to_owned(),
            status: GateStatus::Error,
            issues: Vec::new(),
            stats: JsonMap::new(),
            details,
            duration_ms,
            attempts,
            timestamp: Utc::now(),
        }
    }
}

/// Per-gate slice of a [`RunSummary`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateSummary {
    /// Number of results this gate produced in the run.
    pub total: usize,
    /// Results with status `pass`.
    pub passed: usize,
    /// Results with status `fail` or `error`.
    pub failed: usize,
    /// The results themselves, in run order.
    pub results: Vec<GateResult>,
}

/// Aggregate verdict over all gate results from one run.
///
/// A pure function of the result sequence: recomputing over the same results
/// yields an identical summary. Gate sub-summaries are kept in a `BTreeMap`
/// so serialization is byte-stable across recomputation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Total number of gate results, skipped gates included.
    pub total: usize,
    /// Results with status `pass`.
    pub passed: usize,
    /// Results with status `fail`.
    pub failed: usize,
    /// Results with status `skip`.
    pub skipped: usize,
    /// Results with status `error`.
    pub errors: usize,
    /// Per-gate breakdown keyed by gate name.
    pub gates: BTreeMap<String, GateSummary>,
    /// `Pass` iff zero failed and zero errored results.
    pub overall_status: GateStatus,
    /// `passed / total * 100`; 0 when there were no results.
    pub score: f64,
    /// Wall-clock duration of the whole run in milliseconds.
    pub duration_ms: u64,
    /// Correlation id shared by every result in the run, when provided.
    pub task_id: Option<String>,
}

/// Ambient parameters passed to every gate alongside the code artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateContext {
    /// Name of the file the code came from.
    pub file_name: Option<String>,
    /// Language of the code artifact.
    pub language: Option<String>,
    /// Correlation id for result persistence.
    pub task_id: Option<String>,
    /// Gate-specific configuration values.
    pub settings: JsonMap<String, Value>,
}

impl GateContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source file name.
    #[must_use]
    pub fn with_file_name<T: Into<String>>(mut self, file_name: T) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Sets the language of the artifact.
    #[must_use]
    pub fn with_language<T: Into<String>>(mut self, language: T) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Sets the correlation id.
    #[must_use]
    pub fn with_task_id<T: Into<String>>(mut self, task_id: T) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// Adds a gate-specific setting.
    #[must_use]
    pub fn with_setting<T: Into<String>>(mut self, key: T, value: Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }
}

/// Immutable metadata shared by every gate implementation.
///
/// Concrete gates embed one of these and delegate the [`crate::Gate`]
/// metadata accessors to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateMeta {
    /// Unique gate name.
    pub name: String,
    /// Whether the gate participates in runs.
    pub enabled: bool,
    /// Per-gate deadline override in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Number of retries after a failed attempt.
    pub retry_count: u32,
    /// Issues at severity `error` or above needed to fail the gate.
    pub failure_threshold: usize,
}

impl GateMeta {
    /// Creates metadata with the engine defaults: enabled, no timeout
    /// override, no retries, failure threshold of one.
    pub fn new<T: Into<String>>(name: T) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            timeout_ms: None,
            retry_count: 0,
            failure_threshold: 1,
        }
    }

    /// Sets whether the gate is enabled.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the per-gate deadline.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Sets the retry budget.
    #[must_use]
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Sets the failure threshold.
    #[must_use]
    pub fn with_failure_threshold(mut self, failure_threshold: usize) -> Self {
        self.failure_threshold = failure_threshold;
        self
    }
}
