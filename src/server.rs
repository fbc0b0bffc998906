//! HTTP surface for the storefront and the job provider's callbacks.

use crate::app::App;
use crate::models::{PollRequest, SubmitRequest, SwapRequest};
use crate::{Error, Result};
use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Request bodies carry base64 images, which are a third larger than the
/// files they encode.
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!("Request failed ({}): {}", status, self);
        } else {
            tracing::warn!("Request rejected ({}): {}", status, self);
        }
        (status, Json(self.to_body())).into_response()
    }
}

impl From<BytesRejection> for Error {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Error::PayloadTooLarge(rejection.body_text())
        } else {
            Error::InvalidRequest(rejection.body_text())
        }
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::InvalidRequest(rejection.body_text())
    }
}

pub struct Server;

impl Server {
    /// Build the router. Pre-flight requests are answered by the CORS layer
    /// before any handler runs.
    pub fn router(app: App) -> Router {
        Self::router_with_body_limit(app, MAX_BODY_BYTES)
    }

    pub fn router_with_body_limit(app: App, max_body_bytes: usize) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

        Router::new()
            .route("/api/face-swap", post(face_swap))
            .route("/api/kie-create", post(kie_create))
            .route("/api/kie-callback", post(kie_callback))
            .route("/api/kie-status", get(kie_status).post(kie_status))
            .route("/health", get(health_check))
            .layer(DefaultBodyLimit::max(max_body_bytes))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(app)
    }

    pub async fn start(app: App, addr: SocketAddr) -> Result<()> {
        let router = Self::router(app);

        tracing::info!("Try-on proxy listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}

/// Decode a request body that may be a JSON object, a JSON string holding
/// one, or empty.
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| Error::InvalidRequest(format!("Body is not valid JSON: {}", e)))?;
    let value = match value {
        Value::String(encoded) => serde_json::from_str(&encoded)
            .map_err(|e| Error::InvalidRequest(format!("Body is not valid JSON: {}", e)))?,
        other => other,
    };

    serde_json::from_value(value)
        .map_err(|e| Error::InvalidRequest(format!("Unexpected body shape: {}", e)))
}

async fn health_check() -> &'static str {
    "ok"
}

// Extractor rejections are converted into `Error` so they render as JSON.
type RawBody = std::result::Result<Bytes, BytesRejection>;

async fn face_swap(State(app): State<App>, body: RawBody) -> Result<impl IntoResponse> {
    let request: SwapRequest = parse_body(&body?)?;
    Ok(Json(app.swap(request).await?))
}

async fn kie_create(State(app): State<App>, body: RawBody) -> Result<impl IntoResponse> {
    let request: SubmitRequest = parse_body(&body?)?;
    Ok(Json(app.submit(request).await?))
}

async fn kie_callback(State(app): State<App>, body: RawBody) -> Result<impl IntoResponse> {
    let body = body?;
    tracing::info!(body_len = body.len(), "Job callback received");
    Ok(Json(app.callback(&body).await?))
}

async fn kie_status(
    State(app): State<App>,
    query: std::result::Result<Query<PollRequest>, QueryRejection>,
    body: RawBody,
) -> Result<impl IntoResponse> {
    let Query(query) = query?;
    let request = match query.task_id {
        Some(_) => query,
        None => parse_body(&body?)?,
    };
    Ok(Json(app.status(request).await?))
}
