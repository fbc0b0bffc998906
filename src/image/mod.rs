//! Product image resolution
//!
//! Turns a product image reference (inline base64 or a remote URL) into the
//! base64 form the providers consume, so adapters never see where it came from.

pub mod mock;
pub mod resolver;

pub use mock::MockImageResolver;
pub use resolver::{normalize_remote_url, HttpImageResolver};

use crate::models::ProductImage;
use crate::Result;
use async_trait::async_trait;
use base64::Engine as _;

#[async_trait]
pub trait ImageResolver: Send + Sync {
    /// Resolve a product reference to base64. Inline data wins over a URL.
    async fn resolve(&self, image: &ProductImage) -> Result<String>;
}

/// Standard base64 used for every image crossing the proxy.
pub fn encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
