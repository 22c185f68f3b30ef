//! Core types and traits for the warden quality gate engine.
//!
//! This crate provides the gate execution contract, result and summary types,
//! error handling, run lifecycle events, and declarative configuration shared
//! across the warden system.

/// Declarative runner and gate configuration.
pub mod config;
/// Error types and result definitions.
pub mod error;
/// Run lifecycle events and the per-run event channel.
pub mod events;
/// Trait definitions for gates and storage collaborators.
pub mod traits;
/// Core data types for gate results, issues, and run summaries.
pub mod types;

pub use config::{GateConfig, RunnerConfig};
pub use error::{Error, Result};
pub use events::{RunChannel, RunEvent};
pub use traits::{Gate, ResultStorage, StoreReceipt};
pub use types::{
    GateContext, GateIssue, GateMeta, GateOutcome, GateResult, GateStatus, GateSummary,
    IssueSeverity, RunSummary,
};
