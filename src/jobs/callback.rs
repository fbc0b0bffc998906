//! Callback receiver for provider job-completion notifications.

use super::fields;
use super::store::JobStore;
use crate::models::{JobOutcome, JobState};
use crate::{Error, Result};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

/// Normalizes provider callbacks and upserts them into the job store.
#[derive(Clone)]
pub struct CallbackReceiver {
    store: Arc<dyn JobStore>,
}

impl CallbackReceiver {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Ingest a raw callback body and return the record that was stored.
    ///
    /// Redelivery of the same payload overwrites the record with equal
    /// values; only `received_at`, stamped by the store, moves.
    pub async fn receive(&self, body: &[u8]) -> Result<JobOutcome> {
        let payload = parse_payload(body)?;
        self.receive_value(payload).await
    }

    pub async fn receive_value(&self, payload: Value) -> Result<JobOutcome> {
        let job_id = fields::job_id(&payload).ok_or_else(|| {
            tracing::error!(
                "Callback without a job id; result cannot be correlated: {}",
                payload
            );
            Error::UnidentifiedCallback
        })?;

        let description = result_description(&payload);
        let result_references = description
            .as_ref()
            .map(fields::result_references)
            .unwrap_or_default();

        if result_references.is_empty() {
            tracing::warn!("Callback for job {} carries no result references", job_id);
        }

        let outcome = JobOutcome {
            job_id,
            state: JobState::Completed,
            result_references,
            raw_payload: payload,
            received_at: Utc::now(),
        };

        let outcome = self.store.put(outcome).await?;
        tracing::info!(
            job_id = %outcome.job_id,
            results = outcome.result_references.len(),
            "Stored job outcome from callback"
        );

        Ok(outcome)
    }
}

/// Parse a callback body that may be a JSON object or a JSON string holding
/// one.
pub fn parse_payload(body: &[u8]) -> Result<Value> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| Error::MalformedCallback(format!("body is not JSON: {}", e)))?;

    let value = match value {
        Value::String(encoded) => serde_json::from_str(&encoded).map_err(|e| {
            Error::MalformedCallback(format!("string body does not encode JSON: {}", e))
        })?,
        other => other,
    };

    if !value.is_object() {
        return Err(Error::MalformedCallback(
            "expected a JSON object".to_string(),
        ));
    }
    Ok(value)
}

/// The nested result description, decoded when delivered as a string. An
/// undecodable string is kept as an opaque value.
fn result_description(payload: &Value) -> Option<Value> {
    let raw = fields::lookup(payload, fields::RESULT_DESCRIPTION)?;
    match raw {
        Value::String(encoded) => match serde_json::from_str(encoded) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Result description is not JSON, keeping it opaque: {}", e);
                Some(raw.clone())
            }
        },
        other => Some(other.clone()),
    }
}
