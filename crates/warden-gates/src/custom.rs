//! Closure-backed gate for embedders.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use warden_core::{Gate, GateContext, GateMeta, GateOutcome, Result};

/// Future returned by a custom gate handler.
type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Boxed handler invoked per execution.
type GateHandler = dyn Fn(String, GateContext) -> BoxFuture<Result<GateOutcome>> + Send + Sync;

/// A gate whose check logic is supplied as an async closure.
///
/// Lets embedders hook arbitrary verification into a run without a new gate
/// type; the closure receives an owned copy of the code and context.
pub struct CustomGate {
    /// Shared gate metadata.
    meta: GateMeta,
    /// The check itself.
    handler: Arc<GateHandler>,
}

impl CustomGate {
    /// Creates a custom gate from an async closure.
    pub fn new<F, Fut>(name: &str, handler: F) -> Self
    where
        F: Fn(String, GateContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<GateOutcome>> + Send + 'static,
    {
        Self {
            meta: GateMeta::new(name),
            handler: Arc::new(move |code, context| Box::pin(handler(code, context))),
        }
    }

    /// Replaces the gate metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: GateMeta) -> Self {
        self.meta = meta;
        self
    }
}

#[async_trait]
impl Gate for CustomGate {
    async fn execute(&self, code: &str, context: &GateContext) -> Result<GateOutcome> {
        (self.handler)(code.to_owned(), context.clone()).await
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
    use warden_core::{GateIssue, GateStatus, IssueSeverity};

    #[tokio::test]
    async fn test_handler_drives_outcome() {
        let gate = CustomGate::new("no-unsafe", |code, _context| async move {
            let issues = if code.contains("unsafe") {
                vec![GateIssue::new(
                    1,
                    1,
                    IssueSeverity::Error,
                    "unsafe block",
                    "no-unsafe",
                )]
            } else {
                Vec::new()
            };
            Ok(GateOutcome::with_status(
                if issues.is_empty() {
                    GateStatus::Pass
                } else {
                    GateStatus::Fail
                },
                issues,
            ))
        });

        let clean = gate.execute("fn main() {}", &GateContext::new()).await;
        assert!(matches!(clean, Ok(outcome) if outcome.status == GateStatus::Pass));

        let dirty = gate.execute("unsafe { risky() }", &GateContext::new()).await;
        assert!(matches!(dirty, Ok(outcome) if outcome.status == GateStatus::Fail));
    }

    #[tokio::test]
    async fn test_context_reaches_handler() {
        let gate = CustomGate::new("language-aware", |_code, context| async move {
            let outcome = GateOutcome::pass().with_detail(
                "language",
                context.language.unwrap_or_default().into(),
            );
            Ok(outcome)
        });

        let context = GateContext::new().with_language("rust");
        let result = gate.execute("code", &context).await;
        let Ok(outcome) = result else {
            panic!("custom gate failed");
        };
        assert_eq!(
            outcome.details.get("language").and_then(|value| value.as_str()),
            Some("rust")
        );
    }
}
