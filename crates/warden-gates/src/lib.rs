//! Concrete gate implementations and the gate registry.
//!
//! Every gate here implements the [`warden_core::Gate`] contract; the
//! orchestration engine stays agnostic to whether a gate is pure
//! computation or a wrapped external process.

/// Heuristic source complexity checks.
pub mod complexity;
/// Closure-backed gate for embedders.
pub mod custom;
/// Gate factory keyed by configured gate kind.
pub mod registry;
/// Regex-based security heuristics.
pub mod security;
/// Line-oriented style checks.
pub mod style;
/// Subprocess-backed test runner gate.
pub mod test_runner;

pub use complexity::ComplexityGate;
pub use custom::CustomGate;
pub use registry::GateRegistry;
pub use security::SecurityGate;
pub use style::StyleGate;
pub use test_runner::TestRunnerGate;
