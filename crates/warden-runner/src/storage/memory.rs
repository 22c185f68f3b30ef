//! In-memory result storage.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use warden_core::{GateResult, Result, ResultStorage, RunSummary, StoreReceipt};

/// Keeps results and summaries in process memory, keyed by task id.
///
/// Counts every store call so tests can assert that a code path never
/// touched storage.
#[derive(Default)]
pub struct MemoryStorage {
    /// Persisted gate results per task id.
    results: Mutex<HashMap<String, Vec<GateResult>>>,
    /// Persisted summaries per task id.
    summaries: Mutex<HashMap<String, Vec<RunSummary>>>,
    /// Total number of store calls across both record kinds.
    store_calls: AtomicUsize,
}

impl MemoryStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the results persisted under a task id, in store order.
    pub fn results_for(&self, task_id: &str) -> Vec<GateResult> {
        self.results
            .lock()
            .map(|guard| guard.get(task_id).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Returns the summaries persisted under a task id, in store order.
    pub fn summaries_for(&self, task_id: &str) -> Vec<RunSummary> {
        self.summaries
            .lock()
            .map(|guard| guard.get(task_id).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Total number of store calls made against this backend.
    pub fn store_call_count(&self) -> usize {
        self.store_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResultStorage for MemoryStorage {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn storage_type(&self) -> &str {
        "memory"
    }

    fn supports_cloud(&self) -> bool {
        false
    }

    async fn store_quality_result(
        &self,
        task_id: &str,
        _gate_name: &str,
        result: &GateResult,
    ) -> Result<StoreReceipt> {
        self.store_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.results.lock() {
            guard
                .entry(task_id.to_owned())
                .or_default()
                .push(result.clone());
        }
        Ok(StoreReceipt {
            id: Uuid::new_v4().to_string(),
        })
    }

    async fn store_run_summary(&self, task_id: &str, summary: &RunSummary) -> Result<StoreReceipt> {
        self.store_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.summaries.lock() {
            guard
                .entry(task_id.to_owned())
                .or_default()
                .push(summary.clone());
        }
        Ok(StoreReceipt {
            id: Uuid::new_v4().to_string(),
        })
    }
}
