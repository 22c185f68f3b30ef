//! Regex-based security heuristics.
//!
//! These are cheap pattern checks, not a scanner: they flag the handful of
//! constructs that are almost never acceptable in reviewed code.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use warden_core::{
    Gate, GateConfig, GateContext, GateIssue, GateMeta, GateOutcome, IssueSeverity, Result,
};

/// One compiled heuristic.
struct SecurityPattern {
    /// Compiled matcher, applied per line.
    regex: Regex,
    /// Rule id attached to findings.
    rule: &'static str,
    /// Severity of a match.
    severity: IssueSeverity,
    /// Finding message.
    message: &'static str,
}

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(err) => panic!("Security pattern is invalid: {err}"),
    }
}

static SECURITY_PATTERNS: LazyLock<Vec<SecurityPattern>> = LazyLock::new(|| {
    vec![
        SecurityPattern {
            regex: compile(r"\beval\s*\("),
            rule: "no-eval",
            severity: IssueSeverity::Critical,
            message: "dynamic code evaluation",
        },
        SecurityPattern {
            regex: compile(
                r#"(?i)\b(api[_-]?key|secret|password|token)\s*[:=]\s*["'][^"']{8,}["']"#,
            ),
            rule: "hardcoded-credential",
            severity: IssueSeverity::Critical,
            message: "credential embedded in source",
        },
        SecurityPattern {
            regex: compile(r#"(?i)\b(select|insert|update|delete)\b[^;]*["']\s*\+"#),
            rule: "sql-string-concat",
            severity: IssueSeverity::Error,
            message: "SQL assembled by string concatenation",
        },
        SecurityPattern {
            regex: compile(r#"(?i)access-control-allow-origin["']?\s*[:=,]\s*["']\*"#),
            rule: "permissive-cors",
            severity: IssueSeverity::Error,
            message: "wildcard CORS origin",
        },
        SecurityPattern {
            regex: compile(r#"http://[^\s"']+"#),
            rule: "insecure-transport",
            severity: IssueSeverity::Warning,
            message: "plain-HTTP URL",
        },
    ]
});

/// Flags security-sensitive constructs via per-line regex heuristics.
pub struct SecurityGate {
    /// Shared gate metadata.
    meta: GateMeta,
}

impl Default for SecurityGate {
    fn default() -> Self {
        Self {
            meta: GateMeta::new("security"),
        }
    }
}

impl SecurityGate {
    /// Creates a security gate with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a security gate from declarative configuration.
    pub fn from_config(_config: &GateConfig, meta: GateMeta) -> Self {
        Self { meta }
    }

    /// Replaces the gate metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: GateMeta) -> Self {
        self.meta = meta;
        self
    }

    fn scan(code: &str) -> Vec<GateIssue> {
        let mut issues = Vec::new();

        for (index, line) in code.lines().enumerate() {
            for pattern in SECURITY_PATTERNS.iter() {
                if let Some(found) = pattern.regex.find(line) {
                    issues.push(GateIssue::new(
                        index + 1,
                        found.start() + 1,
                        pattern.severity,
                        pattern.message.to_owned(),
                        pattern.rule.to_owned(),
                    ));
                }
            }
        }

        issues
    }
}

#[async_trait]
impl Gate for SecurityGate {
    async fn execute(&self, code: &str, _context: &GateContext) -> Result<GateOutcome> {
        let issues = Self::scan(code);
        let critical = issues
            .iter()
            .filter(|issue| issue.severity == IssueSeverity::Critical)
            .count();

        Ok(self
            .outcome_from_issues(issues)
            .with_stat("critical", Value::from(critical)))
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

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::GateStatus;

    async fn scan_outcome(code: &str) -> GateOutcome {
        let gate = SecurityGate::new();
        match gate.execute(code, &GateContext::new()).await {
            Ok(outcome) => outcome,
            Err(error) => panic!("security gate failed: {error}"),
        }
    }

    #[tokio::test]
    async fn test_clean_code_passes() {
        let outcome = scan_outcome("let total = items.iter().sum::<u64>();\n").await;
        assert_eq!(outcome.status, GateStatus::Pass);
        assert!(outcome.issues.is_empty());
    }

    #[tokio::test]
    async fn test_eval_is_critical() {
        let outcome = scan_outcome("const result = eval(userInput);\n").await;
        assert_eq!(outcome.status, GateStatus::Fail);
        assert_eq!(outcome.issues[0].rule, "no-eval");
        assert_eq!(outcome.issues[0].severity, IssueSeverity::Critical);
    }

    #[tokio::test]
    async fn test_hardcoded_credential_detected() {
        let outcome = scan_outcome("let api_key = \"sk-abcdef0123456789\";\n").await;
        assert_eq!(outcome.status, GateStatus::Fail);
        assert!(
            outcome
                .issues
                .iter()
                .any(|issue| issue.rule == "hardcoded-credential")
        );
    }

    #[tokio::test]
    async fn test_insecure_url_warns_only() {
        let outcome = scan_outcome("let endpoint = \"http://internal.example\";\n").await;
        assert_eq!(outcome.status, GateStatus::Pass);
        assert_eq!(outcome.issues[0].rule, "insecure-transport");
        assert_eq!(outcome.issues[0].severity, IssueSeverity::Warning);
    }

    #[tokio::test]
    async fn test_issue_position_points_at_match() {
        let outcome = scan_outcome("    eval(payload)\n").await;
        assert_eq!(outcome.issues[0].line, 1);
        assert_eq!(outcome.issues[0].column, 5);
    }
}
