//! Read-only status queries over the job store.

use super::store::JobStore;
use crate::models::JobStatus;
use crate::{Error, Result};
use std::sync::Arc;

#[derive(Clone)]
pub struct StatusPoller {
    store: Arc<dyn JobStore>,
}

impl StatusPoller {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Report the job's current state without blocking. An id with no
    /// stored record is pending; the store cannot express failure.
    pub async fn poll(&self, job_id: Option<&str>) -> Result<JobStatus> {
        let job_id = job_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::InvalidRequest("Missing taskId".to_string()))?;

        match self.store.get(job_id).await? {
            Some(info) => Ok(JobStatus::Done { info }),
            None => {
                tracing::debug!("Job {} has no outcome yet", job_id);
                Ok(JobStatus::Pending)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{CallbackReceiver, MemoryJobStore};
    use crate::models::JobState;
    use serde_json::json;

    #[tokio::test]
    async fn test_unknown_id_is_pending() {
        let poller = StatusPoller::new(Arc::new(MemoryJobStore::new()));
        let status = poller.poll(Some("never-submitted")).await.unwrap();
        assert_eq!(status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_missing_id_is_invalid_request() {
        let poller = StatusPoller::new(Arc::new(MemoryJobStore::new()));
        assert!(matches!(
            poller.poll(None).await.unwrap_err(),
            Error::InvalidRequest(_)
        ));
        assert!(matches!(
            poller.poll(Some("  ")).await.unwrap_err(),
            Error::InvalidRequest(_)
        ));
    }

    #[tokio::test]
    async fn test_poll_before_and_after_callback() {
        let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
        let poller = StatusPoller::new(store.clone());
        let receiver = CallbackReceiver::new(store.clone());

        assert_eq!(poller.poll(Some("t-1")).await.unwrap(), JobStatus::Pending);

        receiver
            .receive_value(json!({
                "data": { "taskId": "t-1", "resultJson": "{\"resultUrls\":[\"https://out/1.png\"]}" }
            }))
            .await
            .unwrap();

        match poller.poll(Some("t-1")).await.unwrap() {
            JobStatus::Done { info } => {
                assert_eq!(info.state, JobState::Completed);
                assert_eq!(info.result_references, vec!["https://out/1.png"]);
            }
            JobStatus::Pending => panic!("expected done after callback"),
        }
    }

    #[tokio::test]
    async fn test_poll_does_not_create_records() {
        let store = Arc::new(MemoryJobStore::new());
        let poller = StatusPoller::new(store.clone());

        poller.poll(Some("t-1")).await.unwrap();
        poller.poll(Some("t-2")).await.unwrap();

        assert_eq!(store.len().await.unwrap(), 0);
    }
}
