//! Run lifecycle event system.
//!
//! Events fan out over a per-runner subscriber set rather than a
//! process-wide registry, so concurrent runs never observe each other.

use tokio::sync::mpsc;
use tracing::warn;

use crate::types::{GateResult, RunSummary};

/// Lifecycle notifications emitted while a run progresses.
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// A run began with this many registered gates.
    RunStarted {
        /// Number of gates registered on the runner, disabled ones included.
        gate_count: usize,
    },
    /// An enabled gate is about to execute.
    GateStarted {
        /// Name of the gate.
        gate: String,
    },
    /// A gate produced its final result (including skip and error results).
    GateCompleted {
        /// Name of the gate.
        gate: String,
        /// The result, boxed to keep the event small.
        result: Box<GateResult>,
    },
    /// A gate attempt failed and the executor is about to retry.
    GateRetry {
        /// Name of the gate.
        gate: String,
        /// Attempt number that just failed (1-based).
        attempt: u32,
        /// Message of the error that triggered the retry.
        error: String,
    },
    /// A gate exhausted its retry budget and resolved to an error result.
    GateError {
        /// Name of the gate.
        gate: String,
        /// Message of the final error.
        error: String,
    },
    /// A fail-fast sequential run stopped before reaching later gates.
    RunStopped {
        /// Why the run stopped.
        reason: String,
        /// Name of the gate whose result triggered the stop.
        gate: String,
    },
    /// The run finished and produced a summary.
    RunCompleted {
        /// The aggregate verdict, boxed to keep the event small.
        summary: Box<RunSummary>,
    },
}

/// Fan-out channel carrying [`RunEvent`]s to a runner's subscribers.
///
/// Cloned into executor tasks; sending to a dropped subscriber is logged and
/// otherwise ignored so observers can never stall a run.
#[derive(Clone, Default)]
pub struct RunChannel {
    /// Senders for every live subscription.
    senders: Vec<mpsc::UnboundedSender<RunEvent>>,
}

impl RunChannel {
    /// Creates a channel with no subscribers. Sends become no-ops.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a channel from an existing sender (for testing).
    pub fn from_sender(sender: mpsc::UnboundedSender<RunEvent>) -> Self {
        Self {
            senders: vec![sender],
        }
    }

    /// Adds a subscription and returns its receiving half.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<RunEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.senders.push(sender);
        receiver
    }

    /// Sends an event to every subscriber.
    pub fn send(&self, event: &RunEvent) {
        for sender in &self.senders {
            if let Err(error) = sender.send(event.clone()) {
                warn!("Failed to deliver run event: {error}");
            }
        }
    }

    /// Sends a run started event.
    pub fn run_started(&self, gate_count: usize) {
        self.send(&RunEvent::RunStarted { gate_count });
    }

    /// Sends a gate started event.
    pub fn gate_started(&self, gate: &str) {
        self.send(&RunEvent::GateStarted {
            gate: gate.to_owned(),
        });
    }

    /// Sends a gate completed event.
    pub fn gate_completed(&self, gate: &str, result: GateResult) {
        self.send(&RunEvent::GateCompleted {
            gate: gate.to_owned(),
            result: Box::new(result),
        });
    }

    /// Sends a retry notification for a failed attempt.
    pub fn gate_retry(&self, gate: &str, attempt: u32, error: &str) {
        self.send(&RunEvent::GateRetry {
            gate: gate.to_owned(),
            attempt,
            error: error.to_owned(),
        });
    }

    /// Sends a gate error event.
    pub fn gate_error(&self, gate: &str, error: &str) {
        self.send(&RunEvent::GateError {
            gate: gate.to_owned(),
            error: error.to_owned(),
        });
    }

    /// Sends a run stopped event.
    pub fn run_stopped(&self, reason: &str, gate: &str) {
        self.send(&RunEvent::RunStopped {
            reason: reason.to_owned(),
            gate: gate.to_owned(),
        });
    }

    /// Sends a run completed event.
    pub fn run_completed(&self, summary: RunSummary) {
        self.send(&RunEvent::RunCompleted {
            summary: Box::new(summary),
        });
    }
}
