use super::{ImageProvider, Production, TryOnInput};
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Clone, Copy, PartialEq, Eq)]
enum MockMode {
    Synchronous,
    JobBased,
}

/// Test double for either provider style.
///
/// The synchronous flavour returns a fixed image; the job flavour mints a
/// fresh job id per call, like a real job API.
#[derive(Clone)]
pub struct MockImageProvider {
    mode: MockMode,
    image: Vec<u8>,
    failure: Arc<Mutex<Option<(u16, String)>>>,
    inputs: Arc<Mutex<Vec<TryOnInput>>>,
}

impl MockImageProvider {
    pub fn synchronous(image: Vec<u8>) -> Self {
        Self {
            mode: MockMode::Synchronous,
            image,
            failure: Arc::new(Mutex::new(None)),
            inputs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn job_based() -> Self {
        Self {
            mode: MockMode::JobBased,
            ..Self::synchronous(Vec::new())
        }
    }

    /// Make every call fail as if upstream answered with `status`.
    pub fn with_failure(self, status: u16, details: String) -> Self {
        *self.failure.lock().unwrap() = Some((status, details));
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.inputs.lock().unwrap().len()
    }

    pub fn get_inputs(&self) -> Vec<TryOnInput> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageProvider for MockImageProvider {
    fn name(&self) -> &str {
        match self.mode {
            MockMode::Synchronous => "mock-sync",
            MockMode::JobBased => "mock-jobs",
        }
    }

    async fn produce(&self, input: &TryOnInput) -> Result<Production> {
        self.inputs.lock().unwrap().push(input.clone());

        if let Some((status, details)) = self.failure.lock().unwrap().clone() {
            return Err(match self.mode {
                MockMode::Synchronous => Error::UpstreamProvider { status, details },
                MockMode::JobBased => Error::JobSubmission {
                    status,
                    details: json!(details),
                },
            });
        }

        Ok(match self.mode {
            MockMode::Synchronous => Production::Completed {
                image: self.image.clone(),
            },
            MockMode::JobBased => {
                let job_id = Uuid::new_v4().to_string();
                let raw = json!({ "code": 200, "data": { "taskId": job_id } });
                Production::Submitted { job_id, raw }
            }
        })
    }
}
