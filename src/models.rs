//! Data models and structures
//!
//! Defines the inbound and outbound JSON bodies of the try-on endpoints, the
//! job outcome record kept by the correlation store, and the environment
//! configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A product image reference as supplied by the storefront.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductImage {
    pub inline: Option<String>,
    pub url: Option<String>,
}

impl ProductImage {
    pub fn is_empty(&self) -> bool {
        self.inline.is_none() && self.url.is_none()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub image: Option<String>,
    pub product_image: Option<String>,
    pub product_image_url: Option<String>,
}

impl SwapRequest {
    pub fn product(&self) -> ProductImage {
        ProductImage {
            inline: non_empty(&self.product_image),
            url: non_empty(&self.product_image_url),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub image: Option<String>,
    pub source_image: Option<String>,
    pub product_image: Option<String>,
    pub product_image_url: Option<String>,
    pub product_id: Option<Value>,
    pub meta: Option<Value>,
}

impl SubmitRequest {
    /// The user image, accepting either field name.
    pub fn source(&self) -> Option<String> {
        non_empty(&self.image).or_else(|| non_empty(&self.source_image))
    }

    pub fn product(&self) -> ProductImage {
        ProductImage {
            inline: non_empty(&self.product_image),
            url: non_empty(&self.product_image_url),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollRequest {
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwapResponse {
    pub swapped: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub task_id: String,
    pub raw: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallbackAck {
    pub ok: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Completed,
}

/// Outcome of one asynchronous job, written by the callback receiver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobOutcome {
    pub job_id: String,
    pub state: JobState,
    #[serde(rename = "resultUrls")]
    pub result_references: Vec<String>,
    /// The provider's callback payload, kept for diagnostics.
    #[serde(rename = "details")]
    pub raw_payload: Value,
    pub received_at: DateTime<Utc>,
}

/// Poll response: `{"status":"pending"}` or `{"status":"done","info":{..}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Done { info: JobOutcome },
}

impl JobStatus {
    pub fn state(&self) -> JobState {
        match self {
            JobStatus::Pending => JobState::Pending,
            JobStatus::Done { info } => info.state,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// Configuration
const DEFAULT_HF_ROUTER_URL: &str = "https://router.huggingface.co/hf-inference";
const DEFAULT_HF_MODEL: &str = "face-swapper/FaceSwap";
const DEFAULT_KIE_BASE_URL: &str = "https://api.kie.ai";
const DEFAULT_KIE_MODEL: &str = "google/nano-banana";
const DEFAULT_KIE_OUTPUT_FORMAT: &str = "png";

#[derive(Debug, Clone)]
pub struct Config {
    pub hf_api_key: Option<String>,
    pub hf_router_url: String,
    pub hf_model: String,
    pub kie_api_key: Option<String>,
    pub kie_base_url: String,
    pub kie_model: String,
    pub kie_callback_url: Option<String>,
    pub kie_output_format: String,
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let kie_callback_url = var("KIE_CALLBACK_URL");
        if let Some(url) = &kie_callback_url {
            let parsed = reqwest::Url::parse(url).map_err(|e| {
                crate::Error::Config(format!("KIE_CALLBACK_URL is not a valid URL: {}", e))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(crate::Error::Config(format!(
                    "KIE_CALLBACK_URL must be http(s), got '{}'",
                    parsed.scheme()
                )));
            }
        }

        Ok(Self {
            hf_api_key: var("HF_API_KEY"),
            hf_router_url: var("HF_ROUTER_URL")
                .unwrap_or_else(|| DEFAULT_HF_ROUTER_URL.to_string()),
            hf_model: var("HF_MODEL").unwrap_or_else(|| DEFAULT_HF_MODEL.to_string()),
            kie_api_key: var("KIE_API_KEY"),
            kie_base_url: var("KIE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_KIE_BASE_URL.to_string()),
            kie_model: var("KIE_MODEL").unwrap_or_else(|| DEFAULT_KIE_MODEL.to_string()),
            kie_callback_url,
            kie_output_format: var("KIE_OUTPUT_FORMAT")
                .unwrap_or_else(|| DEFAULT_KIE_OUTPUT_FORMAT.to_string()),
        })
    }
}
