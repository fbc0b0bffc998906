use super::{encode, ImageResolver};
use crate::models::ProductImage;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};

/// Fetches remote product images over HTTP.
pub struct HttpImageResolver {
    client: Client,
    protocol_relative_scheme: &'static str,
}

impl HttpImageResolver {
    pub fn new() -> Self {
        Self::new_with_client(Client::new())
    }

    pub fn new_with_client(client: Client) -> Self {
        Self {
            client,
            protocol_relative_scheme: "https",
        }
    }

    #[cfg(test)]
    fn with_protocol_relative_scheme(mut self, scheme: &'static str) -> Self {
        self.protocol_relative_scheme = scheme;
        self
    }

    async fn fetch(&self, url: Url) -> Result<Vec<u8>> {
        tracing::debug!("Fetching product image from {}", url);

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            tracing::error!("Failed to send product image request to {}: {}", url, e);
            e
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let details = response.text().await.ok();
            tracing::error!(
                "Failed to fetch product image {} (status {}): {:?}",
                url,
                status,
                details
            );
            return Err(Error::UpstreamFetch {
                status: status.as_u16(),
                details,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

impl Default for HttpImageResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageResolver for HttpImageResolver {
    async fn resolve(&self, image: &ProductImage) -> Result<String> {
        if let Some(inline) = &image.inline {
            return Ok(inline.clone());
        }

        let raw = image.url.as_deref().ok_or_else(|| {
            Error::InvalidRequest("Provide either productImage or productImageUrl".to_string())
        })?;
        let url = normalize_with_scheme(raw, self.protocol_relative_scheme)?;
        let bytes = self.fetch(url).await?;
        tracing::debug!("Fetched product image ({} bytes)", bytes.len());

        Ok(encode(&bytes))
    }
}

/// Validate a remote image location.
///
/// `//host/path` is upgraded to `https://host/path`. Path-relative locations
/// are rejected since there is no origin to complete them against.
pub fn normalize_remote_url(raw: &str) -> Result<Url> {
    normalize_with_scheme(raw, "https")
}

fn normalize_with_scheme(raw: &str, scheme: &str) -> Result<Url> {
    let trimmed = raw.trim();

    let candidate = if trimmed.starts_with("//") {
        format!("{}:{}", scheme, trimmed)
    } else if trimmed.starts_with('/') {
        return Err(Error::InvalidReference(format!(
            "productImageUrl is relative ({}). Provide a full https:// URL.",
            trimmed
        )));
    } else {
        trimmed.to_string()
    };

    let url = Url::parse(&candidate)
        .map_err(|e| Error::InvalidReference(format!("'{}' is not a URL: {}", trimmed, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::InvalidReference(format!(
            "Unsupported URL scheme '{}' in '{}'",
            other, trimmed
        ))),
    }
}
