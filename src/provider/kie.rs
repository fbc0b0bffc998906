use super::client::ProviderHttpClient;
use super::{ImageProvider, Production, TargetImage, TryOnInput};
use crate::jobs::fields;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

const CREATE_TASK_PATH: &str = "/api/v1/jobs/createTask";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTaskRequest<'a> {
    model: &'a str,
    call_back_url: &'a str,
    input: CreateTaskInput<'a>,
}

#[derive(Debug, Serialize)]
struct CreateTaskInput<'a> {
    output_format: &'a str,
    image_base64: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_image_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_image_base64: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<&'a Value>,
}

/// Submit half of the Kie job API. Completion is reported to
/// `callback_url` and picked up by the callback receiver.
pub struct KieJobClient {
    http: ProviderHttpClient,
    model: String,
    callback_url: String,
    output_format: String,
}

impl KieJobClient {
    pub fn new(api_key: String, base_url: String, model: String, callback_url: String) -> Self {
        Self::new_with_client(api_key, base_url, model, callback_url, reqwest::Client::new())
    }

    pub fn new_with_client(
        api_key: String,
        base_url: String,
        model: String,
        callback_url: String,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: ProviderHttpClient::new_with_client("kie", api_key, base_url, client),
            model,
            callback_url,
            output_format: "png".to_string(),
        }
    }

    pub fn with_output_format(mut self, output_format: String) -> Self {
        self.output_format = output_format;
        self
    }
}

#[async_trait]
impl ImageProvider for KieJobClient {
    fn name(&self) -> &str {
        self.http.provider()
    }

    async fn produce(&self, input: &TryOnInput) -> Result<Production> {
        let (product_image_url, product_image_base64) = match &input.target {
            TargetImage::Url(url) => (Some(url.as_str()), None),
            TargetImage::Encoded(data) => (None, Some(data.as_str())),
        };

        let request = CreateTaskRequest {
            model: &self.model,
            call_back_url: &self.callback_url,
            input: CreateTaskInput {
                output_format: &self.output_format,
                image_base64: &input.source_image,
                product_image_url,
                product_image_base64,
                meta: input.meta.as_ref(),
            },
        };

        let response = self.http.post(CREATE_TASK_PATH, &request).await?;
        let status = response.status();
        let text = response.text().await?;
        let parsed = serde_json::from_str::<Value>(&text);

        if !status.is_success() {
            tracing::error!("Kie createTask error (status {}): {}", status, text);
            return Err(Error::JobSubmission {
                status: status.as_u16(),
                details: parsed.unwrap_or(Value::String(text)),
            });
        }

        let raw = parsed.map_err(|e| {
            tracing::error!("Kie createTask returned invalid JSON: {}\nBody: {}", e, text);
            Error::MalformedProviderResponse(format!("Invalid JSON from Kie: {}", e))
        })?;

        let job_id = fields::job_id(&raw).ok_or_else(|| {
            tracing::error!("Kie createTask response has no task id: {}", raw);
            Error::MalformedProviderResponse("No task id in Kie createTask response".to_string())
        })?;

        tracing::info!(job_id = %job_id, "Submitted Kie job");
        Ok(Production::Submitted { job_id, raw })
    }
}
