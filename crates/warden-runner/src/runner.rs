//! The gate scheduler: ordered registration, sequential or parallel
//! execution, fail-fast policy, and run summary assembly.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use warden_core::{
    Error, Gate, GateContext, GateResult, GateStatus, RunChannel, RunEvent, RunSummary,
    RunnerConfig,
};

use crate::executor::GateExecutor;
use crate::reporter::QualityReporter;

/// Per-registration scheduling overrides.
#[derive(Debug, Clone, Default)]
pub struct GateOptions {
    /// Overrides the gate's own enabled flag.
    pub enabled: Option<bool>,
    /// Overrides the gate's own deadline, in milliseconds.
    pub timeout_ms: Option<u64>,
}

/// One registered gate with its scheduling overrides.
struct GateEntry {
    /// The gate itself.
    gate: Arc<dyn Gate>,
    /// Registration-time overrides.
    options: GateOptions,
}

impl GateEntry {
    /// Effective enabled flag: the registration override wins over the
    /// gate's own metadata.
    fn is_enabled(&self) -> bool {
        self.options.enabled.unwrap_or_else(|| self.gate.enabled())
    }
}

/// Runs an ordered collection of gates and aggregates their results.
///
/// Sequential mode walks gates in registration order and fully observes each
/// completion (result appended, reported, events emitted) before the next
/// gate starts; with `continue_on_failure` off, a failed or errored gate
/// stops the run and later gates never execute nor appear in the output.
/// Parallel mode dispatches every enabled gate as an independent task and
/// joins them all — the stop policy then only affects the overall status and
/// the stop notification, never which gates run.
pub struct GateRunner {
    /// Registered gates in registration order.
    entries: Vec<GateEntry>,
    /// Keep running sequential gates after a failure.
    continue_on_failure: bool,
    /// Dispatch all enabled gates concurrently.
    parallel: bool,
    /// Timeout/retry wrapper shared by all invocations.
    executor: GateExecutor,
    /// Result aggregation and persistence.
    reporter: Arc<QualityReporter>,
    /// Per-instance event subscribers.
    events: RunChannel,
}

impl Default for GateRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl GateRunner {
    /// Creates a sequential, continue-on-failure runner with engine defaults.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            continue_on_failure: true,
            parallel: false,
            executor: GateExecutor::default(),
            reporter: Arc::new(QualityReporter::new()),
            events: RunChannel::new(),
        }
    }

    /// Creates a runner from declarative configuration. Gates are registered
    /// separately (see the gate registry).
    pub fn from_config(config: &RunnerConfig) -> Self {
        Self {
            entries: Vec::new(),
            continue_on_failure: config.continue_on_failure,
            parallel: config.parallel,
            executor: GateExecutor::new(config.timeout_ms, config.retry_delay_ms),
            reporter: Arc::new(QualityReporter::new()),
            events: RunChannel::new(),
        }
    }

    /// Sets the scheduling mode.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the fail-fast policy.
    #[must_use]
    pub fn with_continue_on_failure(mut self, continue_on_failure: bool) -> Self {
        self.continue_on_failure = continue_on_failure;
        self
    }

    /// Replaces the executor (timeout and backoff defaults).
    #[must_use]
    pub fn with_executor(mut self, executor: GateExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Replaces the reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<QualityReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Returns the reporter this runner forwards results to.
    pub fn reporter(&self) -> &Arc<QualityReporter> {
        &self.reporter
    }

    /// Registers a gate at the end of the execution order. No execution side
    /// effects.
    pub fn add_gate(&mut self, gate: Arc<dyn Gate>, options: GateOptions) {
        self.entries.push(GateEntry { gate, options });
    }

    /// Removes all gates with the given name. Returns whether any were
    /// removed. No execution side effects.
    pub fn remove_gate(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.gate.name() != name);
        self.entries.len() != before
    }

    /// Number of registered gates, disabled ones included.
    pub fn gate_count(&self) -> usize {
        self.entries.len()
    }

    /// Adds an event subscription for subsequent runs.
    pub fn subscribe(&mut self) -> UnboundedReceiver<RunEvent> {
        self.events.subscribe()
    }

    /// Runs every registered gate against the code artifact and returns the
    /// aggregate verdict.
    ///
    /// Never returns an error: executor-level failures become `error`
    /// results and storage failures are recorded on the persisted copies
    /// only.
    pub async fn run(&self, code: &str, context: &GateContext) -> RunSummary {
        let run_started_at = Instant::now();
        self.reporter.set_task_id(context.task_id.clone());

        info!(
            "Starting gate run: {} gates, {} mode",
            self.entries.len(),
            if self.parallel { "parallel" } else { "sequential" }
        );
        self.events.run_started(self.entries.len());

        let results = if self.parallel {
            self.run_parallel(code, context).await
        } else {
            self.run_sequential(code, context).await
        };

        let flush = self.reporter.flush_batch().await;
        if flush.flushed > 0 {
            debug!(
                "Flushed {} batched results ({} stored, {} failed)",
                flush.flushed, flush.stored, flush.failed
            );
        }

        let mut summary = QualityReporter::generate_summary(&results);
        summary.duration_ms = run_started_at.elapsed().as_millis() as u64;
        summary.task_id = context.task_id.clone();

        let stored = self.reporter.store_summary(summary.clone()).await;
        self.events.run_completed(stored.summary);

        info!(
            "Gate run finished: {:?}, {}/{} passed",
            summary.overall_status, summary.passed, summary.total
        );
        summary
    }

    /// Sequential mode: registration order, one gate fully observed before
    /// the next starts.
    async fn run_sequential(&self, code: &str, context: &GateContext) -> Vec<GateResult> {
        let mut results = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            let gate_name = entry.gate.name().to_owned();

            let result = if entry.is_enabled() {
                self.events.gate_started(&gate_name);
                self.executor
                    .run(
                        entry.gate.as_ref(),
                        code,
                        context,
                        entry.options.timeout_ms,
                        &self.events,
                    )
                    .await
            } else {
                GateResult::skipped(&gate_name, "gate disabled")
            };

            self.reporter.report_result(result.clone()).await;
            if result.status == GateStatus::Error {
                self.events.gate_error(&gate_name, &error_message(&result));
            }
            self.events.gate_completed(&gate_name, result.clone());

            let stop = !self.continue_on_failure && result.status.is_failure();
            results.push(result);

            if stop {
                info!("Stopping run after gate '{gate_name}' failed");
                self.events.run_stopped("gate failed", &gate_name);
                break;
            }
        }

        results
    }

    /// Parallel mode: every enabled gate dispatched concurrently, all joined
    /// before the summary is computed. Each task reports its own result on
    /// completion; the reporter serializes the batch appends.
    async fn run_parallel(&self, code: &str, context: &GateContext) -> Vec<GateResult> {
        let mut slots: Vec<Option<GateResult>> = Vec::with_capacity(self.entries.len());
        let mut handles: Vec<(usize, String, JoinHandle<GateResult>)> = Vec::new();

        for (index, entry) in self.entries.iter().enumerate() {
            let gate_name = entry.gate.name().to_owned();

            if !entry.is_enabled() {
                let result = GateResult::skipped(&gate_name, "gate disabled");
                self.reporter.report_result(result.clone()).await;
                self.events.gate_completed(&gate_name, result.clone());
                slots.push(Some(result));
                continue;
            }

            slots.push(None);
            self.events.gate_started(&gate_name);

            let gate = Arc::clone(&entry.gate);
            let executor = self.executor.clone();
            let reporter = Arc::clone(&self.reporter);
            let events = self.events.clone();
            let code = code.to_owned();
            let context = context.clone();
            let timeout_override = entry.options.timeout_ms;

            let handle = tokio::spawn(async move {
                let result = executor
                    .run(gate.as_ref(), &code, &context, timeout_override, &events)
                    .await;
                reporter.report_result(result.clone()).await;
                if result.status == GateStatus::Error {
                    events.gate_error(&result.gate, &error_message(&result));
                }
                events.gate_completed(&result.gate, result.clone());
                result
            });
            handles.push((index, gate_name, handle));
        }

        for (index, gate_name, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_error) => {
                    let error = Error::Execution(format!("gate task aborted: {join_error}"));
                    let result = GateResult::from_error(&gate_name, &error, 0, 1);
                    self.reporter.report_result(result.clone()).await;
                    self.events.gate_error(&gate_name, &error.to_string());
                    self.events.gate_completed(&gate_name, result.clone());
                    result
                }
            };
            slots[index] = Some(result);
        }

        let results: Vec<GateResult> = slots.into_iter().flatten().collect();

        if !self.continue_on_failure
            && let Some(first_failure) = results.iter().find(|result| result.status.is_failure())
        {
            self.events.run_stopped("gate failed", &first_failure.gate);
        }

        results
    }
}

/// Pulls the recorded error message out of an error result.
fn error_message(result: &GateResult) -> String {
    result
        .details
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("gate execution failed")
        .to_owned()
}
