//! Bounded execution of a single gate: deadline, bounded retry with linear
//! backoff, and conversion of raised errors into `error` results.

use std::time::{Duration, Instant};

use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use warden_core::{Error, Gate, GateContext, GateResult, RunChannel};

/// Default deadline applied to gates without their own timeout.
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default base delay between retry attempts.
const DEFAULT_RETRY_DELAY_MS: u64 = 500;

/// Wraps gate execution with a deadline and a bounded retry budget.
///
/// The executor is the only component aware of attempts. It never returns an
/// error: raised errors and elapsed deadlines become `error` results once the
/// gate's retry budget is exhausted. A timed-out attempt is aborted by
/// dropping its future; gates owning external processes arm `kill_on_drop`
/// so the drop terminates the child rather than leaking it.
#[derive(Debug, Clone)]
pub struct GateExecutor {
    /// Deadline for gates without their own timeout, in milliseconds.
    default_timeout_ms: u64,
    /// Base delay for linear backoff, in milliseconds.
    retry_delay_ms: u64,
}

impl Default for GateExecutor {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl GateExecutor {
    /// Creates an executor with the given defaults.
    pub fn new(default_timeout_ms: u64, retry_delay_ms: u64) -> Self {
        Self {
            default_timeout_ms,
            retry_delay_ms,
        }
    }

    /// Runs a gate to a final result.
    ///
    /// Disabled gates short-circuit to a `skip` result without engaging any
    /// timeout or retry machinery. Otherwise each attempt runs under the
    /// effective deadline (`timeout_override`, else the gate's own, else the
    /// executor default); a failed attempt is retried after
    /// `retry_delay_ms × attempt` while attempts remain in the gate's
    /// budget, with every retry announced on the event channel.
    pub async fn run(
        &self,
        gate: &dyn Gate,
        code: &str,
        context: &GateContext,
        timeout_override: Option<u64>,
        events: &RunChannel,
    ) -> GateResult {
        if !gate.enabled() {
            return GateResult::skipped(gate.name(), "gate disabled");
        }

        let timeout_ms = timeout_override
            .or_else(|| gate.timeout_ms())
            .unwrap_or(self.default_timeout_ms);
        let deadline = Duration::from_millis(timeout_ms);
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let attempt_result = match timeout(deadline, gate.execute(code, context)).await {
                Ok(Ok(outcome)) => Ok(outcome),
                Ok(Err(error)) => Err(error),
                Err(_elapsed) => Err(Error::Timeout(timeout_ms)),
            };

            match attempt_result {
                Ok(outcome) => {
                    debug!(
                        "Gate '{}' resolved to {:?} on attempt {attempt}",
                        gate.name(),
                        outcome.status
                    );
                    return GateResult::from_outcome(
                        gate.name(),
                        outcome,
                        started.elapsed().as_millis() as u64,
                        attempt,
                    );
                }
                Err(error) if attempt <= gate.retry_count() => {
                    let message = error.to_string();
                    warn!(
                        "Gate '{}' attempt {attempt} failed: {message}; retrying",
                        gate.name()
                    );
                    events.gate_retry(gate.name(), attempt, &message);
                    sleep(Duration::from_millis(
                        self.retry_delay_ms * u64::from(attempt),
                    ))
                    .await;
                }
                Err(error) => {
                    warn!(
                        "Gate '{}' failed after {attempt} attempt(s): {error}",
                        gate.name()
                    );
                    return GateResult::from_error(
                        gate.name(),
                        &error,
                        started.elapsed().as_millis() as u64,
                        attempt,
                    );
                }
            }
        }
    }
}
