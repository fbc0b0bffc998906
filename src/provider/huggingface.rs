use super::client::ProviderHttpClient;
use super::{ImageProvider, Production, TargetImage, TryOnInput};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SwapRequest<'a> {
    model: &'a str,
    inputs: SwapInputs<'a>,
}

#[derive(Debug, Serialize)]
struct SwapInputs<'a> {
    source_img: &'a str,
    target_img: &'a str,
}

/// Synchronous face swap through the Hugging Face inference router.
///
/// One attempt per call; the binary response body is the swapped image.
pub struct HuggingFaceSwapClient {
    http: ProviderHttpClient,
    model: String,
}

impl HuggingFaceSwapClient {
    pub fn new(api_key: String, router_url: String, model: String) -> Self {
        Self::new_with_client(api_key, router_url, model, reqwest::Client::new())
    }

    pub fn new_with_client(
        api_key: String,
        router_url: String,
        model: String,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: ProviderHttpClient::new_with_client("huggingface", api_key, router_url, client),
            model,
        }
    }
}

#[async_trait]
impl ImageProvider for HuggingFaceSwapClient {
    fn name(&self) -> &str {
        self.http.provider()
    }

    async fn produce(&self, input: &TryOnInput) -> Result<Production> {
        let target = match &input.target {
            TargetImage::Encoded(data) => data,
            TargetImage::Url(_) => {
                return Err(Error::InvalidRequest(
                    "synchronous swap needs resolved product image data".to_string(),
                ))
            }
        };

        let request = SwapRequest {
            model: &self.model,
            inputs: SwapInputs {
                source_img: &input.source_image,
                target_img: target,
            },
        };

        let response = self.http.post("", &request).await?;

        if !response.status().is_success() {
            let status = response.status();
            let details = response
                .text()
                .await
                .unwrap_or_else(|_| "[no body]".to_string());
            tracing::error!("Hugging Face router error (status {}): {}", status, details);
            return Err(Error::UpstreamProvider {
                status: status.as_u16(),
                details,
            });
        }

        let image = response.bytes().await?.to_vec();
        tracing::info!("Hugging Face returned swapped image ({} bytes)", image.len());

        Ok(Production::Completed { image })
    }
}
