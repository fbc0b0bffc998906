//! Image provider integration
//!
//! Two provider styles sit behind one capability: a synchronous face-swap
//! endpoint that answers with the finished image, and a job-based endpoint
//! that answers with a job id and reports the result later via callback.

pub mod client;
pub mod huggingface;
pub mod kie;
pub mod mock;

pub use client::ProviderHttpClient;
pub use huggingface::HuggingFaceSwapClient;
pub use kie::KieJobClient;
pub use mock::MockImageProvider;

use crate::Result;
use async_trait::async_trait;
use serde_json::Value;

/// The product side of a try-on request.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetImage {
    /// Base64 image data.
    Encoded(String),
    /// Absolute http(s) location the provider may fetch itself.
    Url(String),
}

#[derive(Debug, Clone)]
pub struct TryOnInput {
    /// Base64 user (face) image.
    pub source_image: String,
    pub target: TargetImage,
    pub meta: Option<Value>,
}

/// What a provider hands back for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Production {
    /// The finished image, returned in the same exchange.
    Completed { image: Vec<u8> },
    /// An in-flight job; completion arrives through the callback receiver.
    Submitted { job_id: String, raw: Value },
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    async fn produce(&self, input: &TryOnInput) -> Result<Production>;
}
