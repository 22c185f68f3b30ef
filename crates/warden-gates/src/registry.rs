//! Gate factory: resolves configured gate kinds to concrete gates.

use std::sync::Arc;

use warden_core::{Error, Gate, GateConfig, GateMeta, Result, RunnerConfig};
use warden_runner::{GateOptions, GateRunner};

use crate::complexity::ComplexityGate;
use crate::security::SecurityGate;
use crate::style::StyleGate;
use crate::test_runner::TestRunnerGate;

/// Builds gates and runners from declarative configuration.
pub struct GateRegistry;

impl GateRegistry {
    /// Builds one gate from its configuration.
    ///
    /// # Errors
    /// Returns a configuration error for unknown gate kinds or invalid
    /// kind-specific settings. This is the only error surfaced to callers,
    /// and only at setup time.
    pub fn build(config: &GateConfig) -> Result<Arc<dyn Gate>> {
        let meta = Self::meta_from(config);

        match config.kind.as_str() {
            "style" | "lint" => Ok(Arc::new(StyleGate::from_config(config, meta))),
            "security" | "security-heuristic" => {
                Ok(Arc::new(SecurityGate::from_config(config, meta)))
            }
            "complexity" | "complexity-heuristic" => {
                Ok(Arc::new(ComplexityGate::from_config(config, meta)))
            }
            "test-runner" => Ok(Arc::new(TestRunnerGate::from_config(config, meta)?)),
            unknown => Err(Error::Config(format!("unknown gate type: {unknown}"))),
        }
    }

    /// Builds a runner with every configured gate registered, in
    /// configuration order.
    ///
    /// # Errors
    /// Returns the first gate construction error encountered.
    pub fn build_runner(config: &RunnerConfig) -> Result<GateRunner> {
        let mut runner = GateRunner::from_config(config);
        for gate_config in &config.gates {
            let gate = Self::build(gate_config)?;
            runner.add_gate(gate, GateOptions::default());
        }
        Ok(runner)
    }

    /// Maps shared configuration fields onto gate metadata. The configured
    /// name wins over the kind's default.
    fn meta_from(config: &GateConfig) -> GateMeta {
        let name = config
            .name
            .clone()
            .unwrap_or_else(|| config.kind.clone());

        let mut meta = GateMeta::new(name)
            .with_enabled(config.enabled)
            .with_retry_count(config.retry_count)
            .with_failure_threshold(config.failure_threshold);
        if let Some(timeout_ms) = config.timeout_ms {
            meta = meta.with_timeout_ms(timeout_ms);
        }
        meta
    }
}
