//! File-per-record JSON persistence.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::to_string_pretty;
use tokio::fs::{create_dir_all, read_dir, write};
use uuid::Uuid;

use warden_core::{Error, GateResult, Result, ResultStorage, RunSummary, StoreReceipt};

/// Persists each record as a pretty-printed JSON file under
/// `<root>/<task_id>/`.
///
/// Result files are named `<gate>-<uuid>.json`, summaries
/// `summary-<uuid>.json`, so repeated runs under the same task id never
/// overwrite each other.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    /// Directory all task subdirectories live under.
    root: PathBuf,
}

impl JsonFileStorage {
    /// Creates a storage rooted at the given directory. The directory is
    /// created on [`ResultStorage::initialize`].
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Directory records for a task id are written into.
    pub fn task_dir(&self, task_id: &str) -> PathBuf {
        self.root.join(task_id)
    }

    /// Serializes and writes one record, returning the receipt id.
    async fn write_record<T: serde::Serialize>(
        &self,
        task_id: &str,
        file_stem: &str,
        record: &T,
    ) -> Result<StoreReceipt> {
        let dir = self.task_dir(task_id);
        create_dir_all(&dir)
            .await
            .map_err(|err| Error::Storage(format!("failed to create {}: {err}", dir.display())))?;

        let id = format!("{file_stem}-{}", Uuid::new_v4());
        let path = dir.join(format!("{id}.json"));
        let contents = to_string_pretty(record)
            .map_err(|err| Error::Storage(format!("failed to serialize record: {err}")))?;
        write(&path, contents)
            .await
            .map_err(|err| Error::Storage(format!("failed to write {}: {err}", path.display())))?;

        Ok(StoreReceipt { id })
    }
}

#[async_trait]
impl ResultStorage for JsonFileStorage {
    async fn initialize(&self) -> Result<()> {
        create_dir_all(&self.root).await.map_err(|err| {
            Error::Storage(format!(
                "failed to create storage root {}: {err}",
                self.root.display()
            ))
        })
    }

    fn storage_type(&self) -> &str {
        "json-file"
    }

    fn supports_cloud(&self) -> bool {
        false
    }

    async fn store_quality_result(
        &self,
        task_id: &str,
        gate_name: &str,
        result: &GateResult,
    ) -> Result<StoreReceipt> {
        self.write_record(task_id, gate_name, result).await
    }

    async fn store_run_summary(&self, task_id: &str, summary: &RunSummary) -> Result<StoreReceipt> {
        self.write_record(task_id, "summary", summary).await
    }
}

/// Lists the record files under a task directory, for tooling and tests.
///
/// # Errors
/// Returns an error if the directory cannot be read.
pub async fn record_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut entries = read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::from_str;
    use tokio::fs::read_to_string;
    use warden_core::{GateOutcome, GateStatus};

    #[tokio::test]
    async fn test_result_round_trips_through_file() {
        let Ok(temp) = tempfile::tempdir() else {
            return;
        };
        let storage = JsonFileStorage::new(temp.path());
        let initialized = storage.initialize().await;
        assert!(matches!(initialized, Ok(())));

        let outcome = GateOutcome::with_status(GateStatus::Fail, Vec::new());
        let result = GateResult::from_outcome("security", outcome, 12, 2);
        let receipt = storage
            .store_quality_result("task-9", "security", &result)
            .await;
        assert!(matches!(receipt, Ok(_)));

        let files = record_files(&storage.task_dir("task-9"))
            .await
            .unwrap_or_default();
        assert_eq!(files.len(), 1);

        let contents = read_to_string(&files[0]).await.unwrap_or_default();
        let parsed: GateResult = match from_str(&contents) {
            Ok(parsed) => parsed,
            Err(error) => panic!("stored record did not parse: {error}"),
        };
        assert_eq!(parsed.gate, "security");
        assert_eq!(parsed.status, GateStatus::Fail);
        assert_eq!(parsed.attempts, 2);
    }
}
