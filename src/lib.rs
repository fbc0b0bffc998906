//! Virtual try-on proxy for storefronts
//!
//! Combines a shopper's face image with a product image through an external
//! image provider. Synchronous providers answer inline; job-based providers
//! answer with a job id, call back when done, and are observed by polling.

pub mod app;
pub mod error;
pub mod image;
pub mod jobs;
pub mod models;
pub mod provider;
pub mod server;

pub use error::{Error, Result};
