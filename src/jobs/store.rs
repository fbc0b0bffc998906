//! Job correlation store.
//!
//! The only shared mutable state in the proxy. Writes are whole-record
//! replacements keyed by job id; there is no read-modify-write path.

use crate::models::JobOutcome;
use crate::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Atomically insert or replace the record for `outcome.job_id`.
    ///
    /// `received_at` is stamped while the write is held, so the record that
    /// survives a race is also the one with the latest timestamp. Returns the
    /// record as stored.
    async fn put(&self, outcome: JobOutcome) -> Result<JobOutcome>;

    async fn get(&self, job_id: &str) -> Result<Option<JobOutcome>>;

    async fn len(&self) -> Result<usize>;
}

/// Process-lifetime store. Contents are lost on restart and not shared
/// between instances.
#[derive(Default)]
pub struct MemoryJobStore {
    records: RwLock<HashMap<String, JobOutcome>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn put(&self, mut outcome: JobOutcome) -> Result<JobOutcome> {
        let mut records = self.records.write().await;
        outcome.received_at = Utc::now();
        records.insert(outcome.job_id.clone(), outcome.clone());
        Ok(outcome)
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobOutcome>> {
        Ok(self.records.read().await.get(job_id).cloned())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobState;
    use chrono::Duration;
    use serde_json::json;
    use std::sync::Arc;

    fn outcome(job_id: &str, refs: &[&str]) -> JobOutcome {
        JobOutcome {
            job_id: job_id.to_string(),
            state: JobState::Completed,
            result_references: refs.iter().map(|r| r.to_string()).collect(),
            raw_payload: json!({}),
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_missing_record_is_none() {
        let store = MemoryJobStore::new();
        assert!(store.get("unknown").await.unwrap().is_none());
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemoryJobStore::new();
        store.put(outcome("t-1", &["https://out/1.png"])).await.unwrap();

        let found = store.get("t-1").await.unwrap().unwrap();
        assert_eq!(found.result_references, vec!["https://out/1.png"]);
        assert_eq!(found.state, JobState::Completed);
    }

    #[tokio::test]
    async fn test_put_replaces_existing_record() {
        let store = MemoryJobStore::new();
        store.put(outcome("t-1", &["old"])).await.unwrap();
        store.put(outcome("t-1", &["new"])).await.unwrap();

        assert_eq!(store.len().await.unwrap(), 1);
        let found = store.get("t-1").await.unwrap().unwrap();
        assert_eq!(found.result_references, vec!["new"]);
    }

    #[tokio::test]
    async fn test_put_stamps_received_at_at_write_time() {
        let store = MemoryJobStore::new();
        let mut stale = outcome("t-1", &["a"]);
        stale.received_at = Utc::now() - Duration::hours(1);

        let before = Utc::now();
        let stored = store.put(stale).await.unwrap();

        assert!(stored.received_at >= before);
        assert_eq!(store.get("t-1").await.unwrap().unwrap(), stored);
    }

    #[tokio::test]
    async fn test_concurrent_writers_leave_latest_timestamp() {
        let store = Arc::new(MemoryJobStore::new());

        let writers: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let url = format!("https://out/{}.png", i);
                    store.put(outcome("race", &[url.as_str()])).await.unwrap()
                })
            })
            .collect();

        let mut latest = None;
        for writer in writers {
            let stored = writer.await.unwrap();
            latest = latest.max(Some(stored.received_at));
        }

        let found = store.get("race").await.unwrap().unwrap();
        assert_eq!(Some(found.received_at), latest);
    }

    #[tokio::test]
    async fn test_concurrent_writers_leave_one_whole_record() {
        let store = Arc::new(MemoryJobStore::new());

        let writers: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let url = format!("https://out/{}.png", i);
                    store
                        .put(outcome("race", &[url.as_str(), url.as_str()]))
                        .await
                        .unwrap();
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }

        let found = store.get("race").await.unwrap().unwrap();
        assert_eq!(found.result_references.len(), 2);
        assert_eq!(found.result_references[0], found.result_references[1]);
        assert_eq!(store.len().await.unwrap(), 1);
    }
}
