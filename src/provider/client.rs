use crate::Result;
use reqwest::{Client, Response};
use serde::Serialize;

/// Bearer-authenticated JSON poster shared by the provider adapters.
///
/// Status handling is left to the caller since each adapter maps upstream
/// failures to its own error.
pub struct ProviderHttpClient {
    client: Client,
    api_key: String,
    base_url: String,
    provider: &'static str,
}

impl ProviderHttpClient {
    pub fn new(provider: &'static str, api_key: String, base_url: String) -> Self {
        Self::new_with_client(provider, api_key, base_url, Client::new())
    }

    pub fn new_with_client(
        provider: &'static str,
        api_key: String,
        base_url: String,
        client: Client,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            provider,
        }
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    /// POST `request` as JSON to `{base_url}{path}`.
    pub async fn post<Req: Serialize + ?Sized>(
        &self,
        path: &str,
        request: &Req,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("Sending request to {} at {}", self.provider, url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to {}: {}", self.provider, e);
                e
            })?;

        Ok(response)
    }
}
