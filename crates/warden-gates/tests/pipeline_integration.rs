//! End-to-end tests: declarative configuration through the registry, the
//! runner, and the concrete gates to a final summary.
#![cfg(test)]
#![allow(
    clippy::expect_used,
    clippy::min_ident_chars,
    clippy::absolute_paths,
    clippy::single_call_fn,
    clippy::float_cmp,
    clippy::unused_trait_names,
    reason = "Test code prioritizes clarity and uses traits anonymously"
)]

use std::sync::Arc;

use warden_core::{GateContext, GateStatus, RunnerConfig};
use warden_gates::{CustomGate, GateRegistry, SecurityGate, StyleGate};
use warden_runner::{GateOptions, GateRunner};

const DIRTY_ARTIFACT: &str = "const endpoint = \"http://internal.example/api\";\nfunction handler(input) {\n    const result = eval(input);\n    return result;   \n}\n";

const CLEAN_ARTIFACT: &str = "\
fn add(left: u64, right: u64) -> u64 {
    left + right
}
";

fn full_config() -> RunnerConfig {
    let raw = r#"
        continue_on_failure = true

        [[gates]]
        type = "style"

        [[gates]]
        type = "security"

        [[gates]]
        type = "complexity"
    "#;
    toml::from_str(raw).unwrap_or_default()
}

#[tokio::test]
async fn test_clean_artifact_passes_every_gate() {
    let config = full_config();
    let runner = GateRegistry::build_runner(&config).expect("runner builds");

    let summary = runner.run(CLEAN_ARTIFACT, &GateContext::new()).await;

    assert_eq!(summary.total, 3);
    assert_eq!(summary.passed, 3);
    assert_eq!(summary.overall_status, GateStatus::Pass);
    assert_eq!(summary.score, 100.0);
}

#[tokio::test]
async fn test_dirty_artifact_fails_security_and_reports_detail() {
    let config = full_config();
    let runner = GateRegistry::build_runner(&config).expect("runner builds");

    let summary = runner.run(DIRTY_ARTIFACT, &GateContext::new()).await;

    assert_eq!(summary.total, 3);
    assert_eq!(summary.overall_status, GateStatus::Fail);

    let security = summary.gates.get("security").expect("security summary");
    assert_eq!(security.failed, 1);
    let issues = &security.results[0].issues;
    assert!(issues.iter().any(|issue| issue.rule == "no-eval"));
    assert!(issues.iter().any(|issue| issue.rule == "insecure-transport"));

    // Trailing whitespace alone is not enough to fail the style gate.
    let style = summary.gates.get("style").expect("style summary");
    assert_eq!(style.passed, 1);
    assert!(
        style.results[0]
            .issues
            .iter()
            .any(|issue| issue.rule == "trailing-whitespace")
    );
}

#[tokio::test]
async fn test_parallel_config_runs_all_gates() {
    let raw = r#"
        parallel = true
        continue_on_failure = false

        [[gates]]
        type = "style"

        [[gates]]
        type = "security"
    "#;
    let config: RunnerConfig = toml::from_str(raw).unwrap_or_default();
    let runner = GateRegistry::build_runner(&config).expect("runner builds");

    let summary = runner.run(DIRTY_ARTIFACT, &GateContext::new()).await;

    // Parallel mode never stops early: both gates appear in the output.
    assert_eq!(summary.total, 2);
    assert_eq!(summary.overall_status, GateStatus::Fail);
}

#[tokio::test]
async fn test_hand_assembled_runner_mixes_gate_kinds() {
    let marker_gate = CustomGate::new("no-markers", |code, _context| async move {
        let issues = if code.contains("DO NOT SHIP") {
            vec![warden_core::GateIssue::new(
                1,
                1,
                warden_core::IssueSeverity::Error,
                "ship blocker marker",
                "no-markers",
            )]
        } else {
            Vec::new()
        };
        let status = if issues.is_empty() {
            GateStatus::Pass
        } else {
            GateStatus::Fail
        };
        Ok(warden_core::GateOutcome::with_status(status, issues))
    });

    let mut runner = GateRunner::new();
    runner.add_gate(Arc::new(StyleGate::new()), GateOptions::default());
    runner.add_gate(Arc::new(SecurityGate::new()), GateOptions::default());
    runner.add_gate(Arc::new(marker_gate), GateOptions::default());

    let summary = runner
        .run("// DO NOT SHIP\nfn main() {}\n", &GateContext::new())
        .await;

    assert_eq!(summary.total, 3);
    assert_eq!(summary.failed, 1);
    let custom = summary.gates.get("no-markers").expect("custom summary");
    assert_eq!(custom.failed, 1);
}
