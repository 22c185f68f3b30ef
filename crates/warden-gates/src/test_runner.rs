//! Subprocess-backed test runner gate.
//!
//! Spawns a configured command and maps its exit status and parsed test
//! counters to a gate outcome. The child's lifetime is tied to the attempt
//! future via `kill_on_drop`, so an executor timeout terminates the process
//! instead of leaking it.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use warden_core::{
    Error, Gate, GateConfig, GateContext, GateIssue, GateMeta, GateOutcome, IssueSeverity, Result,
};

/// Longest output tail kept in the result details.
const OUTPUT_TAIL_CHARS: usize = 2000;

/// Runs an external test command and judges its output.
pub struct TestRunnerGate {
    /// Shared gate metadata.
    meta: GateMeta,
    /// Program to spawn.
    program: String,
    /// Arguments passed to the program.
    args: Vec<String>,
    /// Working directory for the child process.
    working_dir: Option<PathBuf>,
    /// Minimum pass rate required to consider the stage passed (0.0-1.0).
    min_pass_rate: f64,
}

impl TestRunnerGate {
    /// Creates a test runner gate for the given program.
    pub fn new<T: Into<String>>(program: T) -> Self {
        Self {
            meta: GateMeta::new("tests"),
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            min_pass_rate: 1.0,
        }
    }

    /// Builds a test runner gate from declarative configuration.
    ///
    /// # Errors
    /// Returns a configuration error if the `command` setting is missing.
    pub fn from_config(config: &GateConfig, meta: GateMeta) -> Result<Self> {
        let program = config
            .settings
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::Config("test-runner gate requires a `command` setting".to_owned())
            })?;

        let args = config
            .settings
            .get("args")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        let working_dir = config
            .settings
            .get("working_dir")
            .and_then(Value::as_str)
            .map(PathBuf::from);

        let min_pass_rate = config
            .settings
            .get("min_pass_rate")
            .and_then(Value::as_f64)
            .unwrap_or(1.0);

        Ok(Self {
            meta,
            program: program.to_owned(),
            args,
            working_dir,
            min_pass_rate,
        })
    }

    /// Sets the program arguments.
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Sets the child's working directory.
    #[must_use]
    pub fn with_working_dir(mut self, working_dir: PathBuf) -> Self {
        self.working_dir = Some(working_dir);
        self
    }

    /// Sets the minimum pass rate.
    #[must_use]
    pub fn with_min_pass_rate(mut self, min_pass_rate: f64) -> Self {
        self.min_pass_rate = min_pass_rate;
        self
    }

    /// Replaces the gate metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: GateMeta) -> Self {
        self.meta = meta;
        self
    }
}

#[async_trait]
impl Gate for TestRunnerGate {
    async fn execute(&self, _code: &str, _context: &GateContext) -> Result<GateOutcome> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(working_dir) = &self.working_dir {
            command.current_dir(working_dir);
        }

        debug!("Running test command: {} {:?}", self.program, self.args);
        let output = command.output().await.map_err(|err| {
            Error::Execution(format!("failed to run `{}`: {err}", self.program))
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let combined = format!("{stdout}\n{stderr}");

        let passed = parse_counter(&combined, "passed");
        let failed = parse_counter(&combined, "failed");
        let total = passed + failed;
        let pass_rate = if total > 0 {
            passed as f64 / total as f64
        } else {
            1.0
        };
        let exit_code = output.status.code();

        let mut issues = Vec::new();
        if !output.status.success() || pass_rate < self.min_pass_rate {
            let message = if total > 0 {
                format!(
                    "{failed} of {total} tests failed ({:.1}% pass rate)",
                    pass_rate * 100.0
                )
            } else {
                format!("test command exited with status {exit_code:?}")
            };
            issues.push(GateIssue::new(
                0,
                0,
                IssueSeverity::Error,
                message,
                "test-failure".to_owned(),
            ));
        }

        Ok(self
            .outcome_from_issues(issues)
            .with_stat("passed", Value::from(passed))
            .with_stat("failed", Value::from(failed))
            .with_stat("exit_code", exit_code.map_or(Value::Null, Value::from))
            .with_detail("output", Value::String(output_tail(&combined))))
    }

    fn name(&self) -> &str {
        &self.meta.name
    }

    fn enabled(&self) -> bool {
        self.meta.enabled
    }

    fn timeout_ms(&self) -> Option<u64> {
        self.meta.timeout_ms
    }

    fn retry_count(&self) -> u32 {
        self.meta.retry_count
    }

    fn failure_threshold(&self) -> usize {
        self.meta.failure_threshold
    }
}

/// Extracts a `<count> <label>` counter from test runner output.
///
/// Prefers the `test result:` summary line cargo-style runners print, then
/// falls back to the first line mentioning the label.
fn parse_counter(output: &str, label: &str) -> usize {
    output
        .lines()
        .find(|line| line.contains("test result:"))
        .or_else(|| output.lines().find(|line| line.contains(label)))
        .and_then(|line| {
            let words: Vec<&str> = line.split_whitespace().collect();
            words
                .iter()
                .position(|word| word.trim_end_matches([',', ';', '.']) == label)
                .and_then(|position| position.checked_sub(1))
                .and_then(|previous| words.get(previous))
                .and_then(|count| count.parse().ok())
        })
        .unwrap_or(0)
}

/// Keeps the last [`OUTPUT_TAIL_CHARS`] characters of process output.
fn output_tail(combined: &str) -> String {
    let trimmed = combined.trim();
    let total = trimmed.chars().count();
    if total <= OUTPUT_TAIL_CHARS {
        return trimmed.to_owned();
    }
    trimmed
        .chars()
        .skip(total - OUTPUT_TAIL_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::GateStatus;

    #[test]
    fn test_parse_counter_cargo_summary() {
        let output = "running 5 tests\ntest result: ok. 5 passed; 0 failed; 0 ignored\n";
        assert_eq!(parse_counter(output, "passed"), 5);
        assert_eq!(parse_counter(output, "failed"), 0);
    }

    #[test]
    fn test_parse_counter_generic_output() {
        let output = "Suite finished: 12 passed, 3 failed\n";
        assert_eq!(parse_counter(output, "passed"), 12);
        assert_eq!(parse_counter(output, "failed"), 3);
    }

    #[test]
    fn test_parse_counter_missing_label() {
        assert_eq!(parse_counter("no counters here", "passed"), 0);
    }

    #[tokio::test]
    async fn test_failing_counters_fail_the_gate() {
        let gate = TestRunnerGate::new("echo").with_args(vec!["3 passed, 1 failed".to_owned()]);
        let outcome = match gate.execute("", &GateContext::new()).await {
            Ok(outcome) => outcome,
            Err(error) => panic!("test runner gate failed: {error}"),
        };

        assert_eq!(outcome.status, GateStatus::Fail);
        assert_eq!(outcome.stats.get("passed"), Some(&Value::from(3)));
        assert_eq!(outcome.stats.get("failed"), Some(&Value::from(1)));
        assert_eq!(outcome.issues[0].rule, "test-failure");
    }

    #[tokio::test]
    async fn test_clean_run_passes() {
        let gate = TestRunnerGate::new("echo").with_args(vec!["4 passed, 0 failed".to_owned()]);
        let outcome = match gate.execute("", &GateContext::new()).await {
            Ok(outcome) => outcome,
            Err(error) => panic!("test runner gate failed: {error}"),
        };

        assert_eq!(outcome.status, GateStatus::Pass);
        assert!(outcome.issues.is_empty());
    }

    #[tokio::test]
    async fn test_missing_program_raises_execution_error() {
        let gate = TestRunnerGate::new("definitely-not-a-real-program-xyz");
        let result = gate.execute("", &GateContext::new()).await;
        assert!(matches!(result, Err(Error::Execution(_))));
    }
}
