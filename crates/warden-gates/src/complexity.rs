//! Heuristic complexity checks: nesting depth, function length, and branch
//! density.
//!
//! Brace tracking and keyword counting, language-agnostic by design. Good
//! enough to flag code that needs a human look, not a parser.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use warden_core::{
    Gate, GateConfig, GateContext, GateIssue, GateMeta, GateOutcome, IssueSeverity, Result,
};

/// Default maximum brace nesting depth.
const DEFAULT_MAX_NESTING: usize = 5;

/// Default maximum function length in lines.
const DEFAULT_MAX_FUNCTION_LINES: usize = 60;

/// Default maximum branch count per function.
const DEFAULT_MAX_BRANCHES: usize = 10;

static FUNCTION_START: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r"^\s*(?:pub\s+)?(?:async\s+)?(?:fn|function|def)\s+\w+") {
        Ok(regex) => regex,
        Err(err) => panic!("Function pattern is invalid: {err}"),
    }
});

static BRANCH_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| match Regex::new(r"\b(?:if|for|while|match|case|catch)\b") {
        Ok(regex) => regex,
        Err(err) => panic!("Branch pattern is invalid: {err}"),
    });

/// A function whose closing brace has not been seen yet.
struct OpenFunction {
    /// Line the function header appeared on.
    start_line: usize,
    /// Branch keywords counted inside the function so far.
    branches: usize,
    /// Brace depth just before the function body opened.
    depth_at_entry: usize,
}

/// Flags deeply nested, overlong, or branch-dense code.
pub struct ComplexityGate {
    /// Shared gate metadata.
    meta: GateMeta,
    /// Deepest allowed brace nesting.
    max_nesting: usize,
    /// Longest allowed function, in lines.
    max_function_lines: usize,
    /// Most branch keywords allowed per function.
    max_branches: usize,
}

impl Default for ComplexityGate {
    fn default() -> Self {
        Self {
            meta: GateMeta::new("complexity"),
            max_nesting: DEFAULT_MAX_NESTING,
            max_function_lines: DEFAULT_MAX_FUNCTION_LINES,
            max_branches: DEFAULT_MAX_BRANCHES,
        }
    }
}

impl ComplexityGate {
    /// Creates a complexity gate with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a complexity gate from declarative configuration.
    pub fn from_config(config: &GateConfig, meta: GateMeta) -> Self {
        let read_limit = |key: &str, default: usize| {
            config
                .settings
                .get(key)
                .and_then(Value::as_u64)
                .map_or(default, |value| value as usize)
        };

        Self {
            meta,
            max_nesting: read_limit("max_nesting", DEFAULT_MAX_NESTING),
            max_function_lines: read_limit("max_function_lines", DEFAULT_MAX_FUNCTION_LINES),
            max_branches: read_limit("max_branches", DEFAULT_MAX_BRANCHES),
        }
    }

    /// Sets the deepest allowed nesting.
    #[must_use]
    pub fn with_max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting;
        self
    }

    /// Sets the longest allowed function.
    #[must_use]
    pub fn with_max_function_lines(mut self, max_function_lines: usize) -> Self {
        self.max_function_lines = max_function_lines;
        self
    }

    /// Sets the branch budget per function.
    #[must_use]
    pub fn with_max_branches(mut self, max_branches: usize) -> Self {
        self.max_branches = max_branches;
        self
    }

    /// Replaces the gate metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: GateMeta) -> Self {
        self.meta = meta;
        self
    }

    fn close_function(&self, function: &OpenFunction, end_line: usize, issues: &mut Vec<GateIssue>) {
        let length = end_line.saturating_sub(function.start_line) + 1;
        if length > self.max_function_lines {
            issues.push(GateIssue::new(
                function.start_line,
                1,
                IssueSeverity::Warning,
                format!(
                    "function spans {length} lines, limit is {}",
                    self.max_function_lines
                ),
                "max-function-length".to_owned(),
            ));
        }

        if function.branches > self.max_branches {
            issues.push(GateIssue::new(
                function.start_line,
                1,
                IssueSeverity::Error,
                format!(
                    "function has {} branch points, limit is {}",
                    function.branches, self.max_branches
                ),
                "max-branch-count".to_owned(),
            ));
        }
    }

    fn scan(&self, code: &str) -> (Vec<GateIssue>, usize, usize) {
        let mut issues = Vec::new();
        let mut open_functions: Vec<OpenFunction> = Vec::new();
        let mut depth: usize = 0;
        let mut max_depth: usize = 0;
        let mut deepest_line: usize = 0;
        let mut function_count: usize = 0;
        let mut last_line: usize = 0;

        for (index, line) in code.lines().enumerate() {
            let line_number = index + 1;
            last_line = line_number;

            if FUNCTION_START.is_match(line) {
                function_count += 1;
                open_functions.push(OpenFunction {
                    start_line: line_number,
                    branches: 0,
                    depth_at_entry: depth,
                });
            }

            if let Some(innermost) = open_functions.last_mut() {
                let keywords = BRANCH_KEYWORD.find_iter(line).count();
                let operators = line.matches("&&").count() + line.matches("||").count();
                innermost.branches += keywords + operators;
            }

            for character in line.chars() {
                match character {
                    '{' => {
                        depth += 1;
                        if depth > max_depth {
                            max_depth = depth;
                            deepest_line = line_number;
                        }
                    }
                    '}' => {
                        depth = depth.saturating_sub(1);
                        while open_functions
                            .last()
                            .is_some_and(|function| function.depth_at_entry == depth)
                        {
                            if let Some(function) = open_functions.pop() {
                                self.close_function(&function, line_number, &mut issues);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        // Unterminated functions still get judged on what was seen.
        for function in open_functions.drain(..) {
            self.close_function(&function, last_line, &mut issues);
        }

        if max_depth > self.max_nesting {
            issues.push(GateIssue::new(
                deepest_line,
                1,
                IssueSeverity::Error,
                format!("nesting reaches depth {max_depth}, limit is {}", self.max_nesting),
                "max-nesting-depth".to_owned(),
            ));
        }

        (issues, max_depth, function_count)
    }
}

#[async_trait]
impl Gate for ComplexityGate {
    async fn execute(&self, code: &str, _context: &GateContext) -> Result<GateOutcome> {
        let (issues, max_depth, function_count) = self.scan(code);

        Ok(self
            .outcome_from_issues(issues)
            .with_stat("max_depth", Value::from(max_depth))
            .with_stat("functions", Value::from(function_count)))
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
