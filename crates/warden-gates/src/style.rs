//! Line-oriented style checks: length limits, whitespace hygiene, and
//! leftover work markers.

use async_trait::async_trait;
use serde_json::Value;

use warden_core::{
    Gate, GateConfig, GateContext, GateIssue, GateMeta, GateOutcome, IssueSeverity, Result,
};

/// Default maximum line length.
const DEFAULT_MAX_LINE_LENGTH: usize = 100;

/// Checks code for mechanical style violations.
pub struct StyleGate {
    /// Shared gate metadata.
    meta: GateMeta,
    /// Longest allowed line, in characters.
    max_line_length: usize,
    /// Whether TODO/FIXME markers produce informational issues.
    flag_todos: bool,
}

impl Default for StyleGate {
    fn default() -> Self {
        Self {
            meta: GateMeta::new("style"),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            flag_todos: true,
        }
    }
}

impl StyleGate {
    /// Creates a style gate with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a style gate from declarative configuration.
    pub fn from_config(config: &GateConfig, meta: GateMeta) -> Self {
        let max_line_length = config
            .settings
            .get("max_line_length")
            .and_then(Value::as_u64)
            .map_or(DEFAULT_MAX_LINE_LENGTH, |value| value as usize);
        let flag_todos = config
            .settings
            .get("flag_todos")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        Self {
            meta,
            max_line_length,
            flag_todos,
        }
    }

    /// Sets the maximum allowed line length.
    #[must_use]
    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    /// Replaces the gate metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: GateMeta) -> Self {
        self.meta = meta;
        self
    }

    fn scan(&self, code: &str) -> Vec<GateIssue> {
        let mut issues = Vec::new();

        for (index, line) in code.lines().enumerate() {
            let line_number = index + 1;
            let length = line.chars().count();

            if length > self.max_line_length {
                issues.push(GateIssue::new(
                    line_number,
                    self.max_line_length + 1,
                    IssueSeverity::Error,
                    format!(
                        "line is {length} characters, limit is {}",
                        self.max_line_length
                    ),
                    "max-line-length".to_owned(),
                ));
            }

            if line.len() != line.trim_end().len() {
                issues.push(
                    GateIssue::new(
                        line_number,
                        line.trim_end().chars().count() + 1,
                        IssueSeverity::Warning,
                        "trailing whitespace".to_owned(),
                        "trailing-whitespace".to_owned(),
                    )
                    .fixable(),
                );
            }

            if line.starts_with('\t') {
                issues.push(
                    GateIssue::new(
                        line_number,
                        1,
                        IssueSeverity::Warning,
                        "tab indentation".to_owned(),
                        "tab-indentation".to_owned(),
                    )
                    .fixable(),
                );
            }

            if self.flag_todos
                && let Some(position) = line.find("TODO").or_else(|| line.find("FIXME"))
            {
                issues.push(GateIssue::new(
                    line_number,
                    position + 1,
                    IssueSeverity::Info,
                    "leftover work marker".to_owned(),
                    "todo-marker".to_owned(),
                ));
            }
        }

        if !code.is_empty() && !code.ends_with('\n') {
            issues.push(
                GateIssue::new(
                    code.lines().count(),
                    1,
                    IssueSeverity::Warning,
                    "file does not end with a newline".to_owned(),
                    "final-newline".to_owned(),
                )
                .fixable(),
            );
        }

        issues
    }
}

#[async_trait]
impl Gate for StyleGate {
    async fn execute(&self, code: &str, _context: &GateContext) -> Result<GateOutcome> {
        let issues = self.scan(code);
        let line_count = code.lines().count();
        let issue_count = issues.len();

        Ok(self
            .outcome_from_issues(issues)
            .with_stat("lines", Value::from(line_count))
            .with_stat("issues", Value::from(issue_count)))
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

    #[tokio::test]
    async fn test_clean_code_passes() {
        let gate = StyleGate::new();
        let code = "fn main() {\n    println!(\"hello\");\n}\n";
        let outcome = gate.execute(code, &GateContext::new()).await;
        let Ok(outcome) = outcome else {
            panic!("style gate failed");
        };
        assert_eq!(outcome.status, GateStatus::Pass);
        assert!(outcome.issues.is_empty());
    }

    #[tokio::test]
    async fn test_long_line_fails_gate() {
        let gate = StyleGate::new().with_max_line_length(20);
        let code = "let value = \"this line is far longer than twenty characters\";\n";
        let outcome = gate.execute(code, &GateContext::new()).await;
        let Ok(outcome) = outcome else {
            panic!("style gate failed");
        };
        assert_eq!(outcome.status, GateStatus::Fail);
        assert_eq!(outcome.issues[0].rule, "max-line-length");
        assert_eq!(outcome.issues[0].line, 1);
    }

    #[tokio::test]
    async fn test_whitespace_issues_warn_without_failing() {
        let gate = StyleGate::new();
        let code = "fn main() {   \n\tlet x = 1;\n}\n";
        let outcome = gate.execute(code, &GateContext::new()).await;
        let Ok(outcome) = outcome else {
            panic!("style gate failed");
        };
        assert_eq!(outcome.status, GateStatus::Pass);

        let rules: Vec<&str> = outcome
            .issues
            .iter()
            .map(|issue| issue.rule.as_str())
            .collect();
        assert!(rules.contains(&"trailing-whitespace"));
        assert!(rules.contains(&"tab-indentation"));
        assert!(outcome.issues.iter().all(|issue| issue.fixable));
    }

    #[tokio::test]
    async fn test_todo_marker_is_informational() {
        let gate = StyleGate::new();
        let code = "// TODO: wire up the cache\n";
        let outcome = gate.execute(code, &GateContext::new()).await;
        let Ok(outcome) = outcome else {
            panic!("style gate failed");
        };
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].severity, IssueSeverity::Info);
    }

    #[tokio::test]
    async fn test_missing_final_newline_flagged() {
        let gate = StyleGate::new();
        let outcome = gate.execute("fn main() {}", &GateContext::new()).await;
        let Ok(outcome) = outcome else {
            panic!("style gate failed");
        };
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].rule, "final-newline");
    }
}
