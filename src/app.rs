//! Request orchestration for the synchronous and job-based try-on flows.

use crate::image::{self, normalize_remote_url, HttpImageResolver, ImageResolver};
use crate::jobs::{CallbackReceiver, JobStore, MemoryJobStore, StatusPoller};
use crate::models::{
    CallbackAck, Config, JobStatus, PollRequest, SubmitRequest, SubmitResponse, SwapRequest,
    SwapResponse,
};
use crate::provider::{
    HuggingFaceSwapClient, ImageProvider, KieJobClient, Production, TargetImage, TryOnInput,
};
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// A provider that may be missing because its credentials were not configured.
#[derive(Clone)]
pub struct ProviderSlot {
    provider: Option<Arc<dyn ImageProvider>>,
    missing: String,
}

impl ProviderSlot {
    pub fn configured(provider: Arc<dyn ImageProvider>) -> Self {
        Self {
            provider: Some(provider),
            missing: String::new(),
        }
    }

    /// A slot that fails every request with a configuration error naming
    /// `missing`.
    pub fn unconfigured(missing: impl Into<String>) -> Self {
        Self {
            provider: None,
            missing: missing.into(),
        }
    }

    fn get(&self) -> Result<&Arc<dyn ImageProvider>> {
        self.provider
            .as_ref()
            .ok_or_else(|| {
                Error::Config(format!("{} not set in environment variables", self.missing))
            })
    }
}

/// Coordinates image resolution, provider calls and job correlation.
#[derive(Clone)]
pub struct App {
    resolver: Arc<dyn ImageResolver>,
    swap_provider: ProviderSlot,
    job_provider: ProviderSlot,
    callbacks: CallbackReceiver,
    poller: StatusPoller,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub resolver: Arc<dyn ImageResolver>,
    pub swap_provider: ProviderSlot,
    pub job_provider: ProviderSlot,
    pub store: Arc<dyn JobStore>,
}

impl App {
    /// Build an app from concrete service dependencies.
    pub fn with_services(services: AppServices) -> Self {
        Self {
            resolver: services.resolver,
            swap_provider: services.swap_provider,
            job_provider: services.job_provider,
            callbacks: CallbackReceiver::new(services.store.clone()),
            poller: StatusPoller::new(services.store),
        }
    }

    /// Wire production clients from configuration, sharing one HTTP
    /// connection pool.
    pub fn new(config: &Config) -> Self {
        let http_client = reqwest::Client::new();

        let swap_provider = match &config.hf_api_key {
            Some(api_key) => {
                info!("Swap provider: Hugging Face (model: {})", config.hf_model);
                ProviderSlot::configured(Arc::new(HuggingFaceSwapClient::new_with_client(
                    api_key.clone(),
                    config.hf_router_url.clone(),
                    config.hf_model.clone(),
                    http_client.clone(),
                )))
            }
            None => {
                warn!("HF_API_KEY not set; /api/face-swap will fail");
                ProviderSlot::unconfigured("HF_API_KEY")
            }
        };

        let job_provider = match (&config.kie_api_key, &config.kie_callback_url) {
            (Some(api_key), Some(callback_url)) => {
                info!(
                    "Job provider: Kie (model: {}, callback: {})",
                    config.kie_model, callback_url
                );
                ProviderSlot::configured(Arc::new(
                    KieJobClient::new_with_client(
                        api_key.clone(),
                        config.kie_base_url.clone(),
                        config.kie_model.clone(),
                        callback_url.clone(),
                        http_client.clone(),
                    )
                    .with_output_format(config.kie_output_format.clone()),
                ))
            }
            (None, _) => {
                warn!("KIE_API_KEY not set; /api/kie-create will fail");
                ProviderSlot::unconfigured("KIE_API_KEY")
            }
            (Some(_), None) => {
                warn!("KIE_CALLBACK_URL not set; /api/kie-create will fail");
                ProviderSlot::unconfigured("KIE_CALLBACK_URL")
            }
        };

        Self::with_services(AppServices {
            resolver: Arc::new(HttpImageResolver::new_with_client(http_client)),
            swap_provider,
            job_provider,
            store: Arc::new(MemoryJobStore::new()),
        })
    }

    /// Synchronous try-on: resolve the product image, swap, return base64.
    pub async fn swap(&self, request: SwapRequest) -> Result<SwapResponse> {
        let product = request.product();
        let source = request
            .image
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let source = match source {
            Some(source) if !product.is_empty() => source.to_string(),
            _ => {
                return Err(Error::InvalidRequest(
                    "Provide \"image\" (user base64) and either \"productImage\" (base64) or \"productImageUrl\" (full https URL).".to_string(),
                ))
            }
        };

        let provider = self.swap_provider.get()?;
        let target = self.resolver.resolve(&product).await?;

        let input = TryOnInput {
            source_image: source,
            target: TargetImage::Encoded(target),
            meta: None,
        };

        match provider.produce(&input).await? {
            Production::Completed { image } => Ok(SwapResponse {
                swapped: image::encode(&image),
            }),
            Production::Submitted { job_id, .. } => Err(Error::MalformedProviderResponse(format!(
                "{} queued job {} instead of returning an image",
                provider.name(),
                job_id
            ))),
        }
    }

    /// Job-based try-on: submit and return the job id immediately. No job
    /// record exists until the provider calls back.
    pub async fn submit(&self, request: SubmitRequest) -> Result<SubmitResponse> {
        let product = request.product();
        let target = match (product.inline, product.url) {
            (Some(inline), _) => Some(TargetImage::Encoded(inline)),
            (None, Some(url)) => Some(TargetImage::Url(url)),
            (None, None) => None,
        };
        let (source, target) = match (request.source(), target) {
            (Some(source), Some(target)) => (source, target),
            _ => {
                return Err(Error::InvalidRequest(
                    "Missing image or productImage/productImageUrl".to_string(),
                ))
            }
        };

        let target = match target {
            TargetImage::Url(url) => TargetImage::Url(normalize_remote_url(&url)?.to_string()),
            encoded => encoded,
        };
        let meta = submission_meta(request.meta, request.product_id)?;

        let provider = self.job_provider.get()?;

        let input = TryOnInput {
            source_image: source,
            target,
            meta,
        };

        match provider.produce(&input).await? {
            Production::Submitted { job_id, raw } => {
                info!(job_id = %job_id, provider = provider.name(), "Job submitted");
                Ok(SubmitResponse {
                    task_id: job_id,
                    raw,
                })
            }
            Production::Completed { .. } => Err(Error::MalformedProviderResponse(format!(
                "{} returned an image where a job id was expected",
                provider.name()
            ))),
        }
    }

    /// Ingest a provider callback body.
    pub async fn callback(&self, body: &[u8]) -> Result<CallbackAck> {
        self.callbacks.receive(body).await?;
        Ok(CallbackAck { ok: true })
    }

    pub async fn status(&self, request: PollRequest) -> Result<JobStatus> {
        self.poller.poll(request.task_id.as_deref()).await
    }
}

/// Merge `productId` into the caller's meta object. Meta must be an object.
fn submission_meta(meta: Option<Value>, product_id: Option<Value>) -> Result<Option<Value>> {
    let mut map = match meta {
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(Error::InvalidRequest(format!(
                "meta must be a JSON object, got {}",
                other
            )))
        }
        None if product_id.is_none() => return Ok(None),
        None => Map::new(),
    };
    if let Some(product_id) = product_id {
        map.insert("productId".to_string(), product_id);
    }
    Ok(Some(Value::Object(map)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::MockImageResolver;
    use crate::models::JobState;
    use crate::provider::MockImageProvider;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct Harness {
        app: App,
        resolver: MockImageResolver,
        swap: MockImageProvider,
        jobs: MockImageProvider,
    }

    fn harness() -> Harness {
        let resolver = MockImageResolver::new().with_url_response("cmVtb3Rl".to_string());
        let swap = MockImageProvider::synchronous(vec![1, 2, 3]);
        let jobs = MockImageProvider::job_based();
        let app = App::with_services(AppServices {
            resolver: Arc::new(resolver.clone()),
            swap_provider: ProviderSlot::configured(Arc::new(swap.clone())),
            job_provider: ProviderSlot::configured(Arc::new(jobs.clone())),
            store: Arc::new(MemoryJobStore::new()),
        });
        Harness {
            app,
            resolver,
            swap,
            jobs,
        }
    }

    #[tokio::test]
    async fn test_swap_returns_base64_of_provider_bytes() {
        let h = harness();
        let response = h
            .app
            .swap(SwapRequest {
                image: Some("ZmFjZQ==".to_string()),
                product_image: Some("cHJvZHVjdA==".to_string()),
                product_image_url: None,
            })
            .await
            .unwrap();

        assert_eq!(response.swapped, image::encode(&[1, 2, 3]));
        let inputs = h.swap.get_inputs();
        assert_eq!(inputs[0].target, TargetImage::Encoded("cHJvZHVjdA==".to_string()));
    }

    #[tokio::test]
    async fn test_swap_resolves_remote_product() {
        let h = harness();
        h.app
            .swap(SwapRequest {
                image: Some("ZmFjZQ==".to_string()),
                product_image: None,
                product_image_url: Some("https://cdn.example/p.png".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(h.resolver.get_call_count(), 1);
        assert_eq!(
            h.swap.get_inputs()[0].target,
            TargetImage::Encoded("cmVtb3Rl".to_string())
        );
    }

    #[tokio::test]
    async fn test_swap_without_images_makes_no_calls() {
        let h = harness();
        let err = h.app.swap(SwapRequest::default()).await.unwrap_err();

        assert!(matches!(err, Error::InvalidRequest(_)));
        assert_eq!(h.resolver.get_call_count(), 0);
        assert_eq!(h.swap.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_swap_requires_user_image() {
        let h = harness();
        let err = h
            .app
            .swap(SwapRequest {
                image: None,
                product_image: Some("cA==".to_string()),
                product_image_url: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert_eq!(h.swap.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_provider_is_config_error() {
        let h = harness();
        let app = App {
            swap_provider: ProviderSlot::unconfigured("HF_API_KEY"),
            ..h.app
        };
        let err = app
            .swap(SwapRequest {
                image: Some("a".to_string()),
                product_image: Some("b".to_string()),
                product_image_url: None,
            })
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("HF_API_KEY"));
    }

    #[tokio::test]
    async fn test_submit_twice_yields_distinct_ids() {
        let h = harness();
        let request = SubmitRequest {
            source_image: Some("ZmFjZQ==".to_string()),
            product_image_url: Some("https://cdn.example/p.png".to_string()),
            ..Default::default()
        };

        let first = h.app.submit(request.clone()).await.unwrap();
        let second = h.app.submit(request).await.unwrap();

        assert_ne!(first.task_id, second.task_id);
        assert_eq!(h.jobs.get_call_count(), 2);
    }

    #[tokio::test]
    async fn test_submit_normalizes_url_and_folds_product_id() {
        let h = harness();
        h.app
            .submit(SubmitRequest {
                image: Some("ZmFjZQ==".to_string()),
                product_image_url: Some("//cdn.example/p.png".to_string()),
                product_id: Some(json!(123)),
                ..Default::default()
            })
            .await
            .unwrap();

        let inputs = h.jobs.get_inputs();
        let input = &inputs[0];
        assert_eq!(
            input.target,
            TargetImage::Url("https://cdn.example/p.png".to_string())
        );
        assert_eq!(input.meta, Some(json!({ "productId": 123 })));
        assert_eq!(h.resolver.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_submit_rejects_relative_url_before_calling_provider() {
        let h = harness();
        let err = h
            .app
            .submit(SubmitRequest {
                image: Some("ZmFjZQ==".to_string()),
                product_image_url: Some("/p.png".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidReference(_)));
        assert_eq!(h.jobs.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_submit_callback_poll_flow() {
        let h = harness();
        let submitted = h
            .app
            .submit(SubmitRequest {
                image: Some("ZmFjZQ==".to_string()),
                product_image: Some("cA==".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let poll = PollRequest {
            task_id: Some(submitted.task_id.clone()),
        };
        assert_eq!(h.app.status(poll.clone()).await.unwrap(), JobStatus::Pending);

        let callback = json!({
            "data": {
                "taskId": submitted.task_id,
                "resultJson": "{\"resultUrls\":[\"https://out/1.png\"]}"
            }
        });
        let ack = h
            .app
            .callback(callback.to_string().as_bytes())
            .await
            .unwrap();
        assert!(ack.ok);

        let status = h.app.status(poll).await.unwrap();
        assert_eq!(status.state(), JobState::Completed);
        match status {
            JobStatus::Done { info } => {
                assert_eq!(info.result_references, vec!["https://out/1.png"])
            }
            JobStatus::Pending => panic!("expected done"),
        }
    }

    #[test]
    fn test_submission_meta_merging() {
        assert_eq!(submission_meta(None, None).unwrap(), None);
        assert_eq!(
            submission_meta(Some(json!({ "variant": "red" })), Some(json!("p-1"))).unwrap(),
            Some(json!({ "variant": "red", "productId": "p-1" }))
        );
        assert_eq!(
            submission_meta(None, Some(json!(5))).unwrap(),
            Some(json!({ "productId": 5 }))
        );
        assert_eq!(
            submission_meta(Some(json!({ "a": 1 })), None).unwrap(),
            Some(json!({ "a": 1 }))
        );
    }

    #[test]
    fn test_submission_meta_rejects_non_object() {
        assert!(matches!(
            submission_meta(Some(json!("note")), Some(json!(5))),
            Err(Error::InvalidRequest(_))
        ));
        assert!(matches!(
            submission_meta(Some(json!([1, 2])), None),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_with_non_object_meta_makes_no_provider_call() {
        let h = harness();
        let err = h
            .app
            .submit(SubmitRequest {
                image: Some("ZmFjZQ==".to_string()),
                product_image: Some("cA==".to_string()),
                meta: Some(json!("note")),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidRequest(_)));
        assert_eq!(h.jobs.get_call_count(), 0);
    }
}
