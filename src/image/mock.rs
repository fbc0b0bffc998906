use super::ImageResolver;
use crate::models::ProductImage;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Resolver that returns inline data as-is and a canned value for URLs.
#[derive(Clone)]
pub struct MockImageResolver {
    url_response: Arc<Mutex<Option<String>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockImageResolver {
    pub fn new() -> Self {
        Self {
            url_response: Arc::new(Mutex::new(None)),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_url_response(self, encoded: String) -> Self {
        *self.url_response.lock().unwrap() = Some(encoded);
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockImageResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageResolver for MockImageResolver {
    async fn resolve(&self, image: &ProductImage) -> Result<String> {
        *self.call_count.lock().unwrap() += 1;

        if let Some(inline) = &image.inline {
            return Ok(inline.clone());
        }
        match (&image.url, self.url_response.lock().unwrap().clone()) {
            (Some(_), Some(encoded)) => Ok(encoded),
            (Some(url), None) => Err(Error::UpstreamFetch {
                status: 404,
                details: Some(format!("mock has no image for {}", url)),
            }),
            (None, _) => Err(Error::InvalidRequest("no product image".to_string())),
        }
    }
}
