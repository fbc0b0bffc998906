//! Error handling and custom error types
//!
//! Provides unified error handling across the proxy using thiserror. Every
//! endpoint converts these into a structured JSON body at its boundary.

use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request body too large: {0}")]
    PayloadTooLarge(String),

    #[error("Invalid image reference: {0}")]
    InvalidReference(String),

    #[error("Failed to fetch product image URL (status {status})")]
    UpstreamFetch { status: u16, details: Option<String> },

    #[error("Upstream error from image provider (status {status})")]
    UpstreamProvider { status: u16, details: String },

    #[error("Job submission rejected by provider (status {status})")]
    JobSubmission { status: u16, details: Value },

    #[error("Malformed provider response: {0}")]
    MalformedProviderResponse(String),

    #[error("Malformed callback payload: {0}")]
    MalformedCallback(String),

    #[error("Callback payload carries no recognizable job identifier")]
    UnidentifiedCallback,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] dotenvy::Error),
}

impl Error {
    /// HTTP status this error is surfaced with.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidRequest(_) | Error::InvalidReference(_) | Error::MalformedCallback(_) => {
                400
            }
            Error::PayloadTooLarge(_) => 413,
            Error::UnidentifiedCallback => 422,
            Error::UpstreamFetch { .. }
            | Error::UpstreamProvider { .. }
            | Error::JobSubmission { .. }
            | Error::MalformedProviderResponse(_)
            | Error::Http(_) => 502,
            Error::Config(_) | Error::Io(_) | Error::Serialization(_) | Error::EnvVar(_) => 500,
        }
    }

    /// Structured `{ error, status?, details? }` body. Upstream bodies are
    /// forwarded verbatim.
    pub fn to_body(&self) -> Value {
        match self {
            Error::UpstreamFetch { status, details } => json!({
                "error": self.to_string(),
                "status": status,
                "details": details,
            }),
            Error::UpstreamProvider { status, details } => json!({
                "error": self.to_string(),
                "status": status,
                "details": details,
            }),
            Error::JobSubmission { status, details } => json!({
                "error": self.to_string(),
                "status": status,
                "details": details,
            }),
            _ => json!({ "error": self.to_string() }),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
