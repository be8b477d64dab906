//! HTTP gateway for Promptgate.
//!
//! Exposes an OpenAI-compatible `POST /v1/chat/completions` endpoint. Each
//! request carries its full gateway configuration in the
//! `x-promptgate-config` header: provider routing, retry policy, and the
//! guardrail pipeline. The response embeds `hook_results` describing what
//! every guardrail saw and did.
//!
//! Built on Axum.

pub mod chat;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::info;

use promptgate_config::{ServerConfig, MEMORY_RETRIEVAL_TYPE};
use promptgate_pipeline::MutatorRegistry;
use promptgate_retrieval::memory_retrieval_constructor;

/// Header carrying the per-request gateway configuration as JSON.
pub const CONFIG_HEADER: &str = "x-promptgate-config";

/// Response header carrying hook results for streamed responses, where the
/// body is occupied by the SSE stream.
pub const HOOK_RESULTS_HEADER: &str = "x-promptgate-hook-results";

/// Shared application state. One per process; everything per-request is
/// derived from the config header instead.
pub struct GatewayState {
    /// Connection pool shared by guardrail-side HTTP clients
    pub http: reqwest::Client,

    /// Known guardrail constructors, keyed by type tag
    pub registry: MutatorRegistry,

    /// Timeout applied to upstream provider calls
    pub upstream_timeout: Duration,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    /// Build the default state: shared HTTP pool plus the built-in
    /// guardrail types.
    pub fn new(upstream_timeout: Duration) -> Self {
        let http = reqwest::Client::new();
        let mut registry = MutatorRegistry::new();
        registry.register(MEMORY_RETRIEVAL_TYPE, memory_retrieval_constructor(http.clone()));
        Self { http, registry, upstream_timeout }
    }
}

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::any())
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderName::from_static(CONFIG_HEADER),
        ])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/chat/completions", post(chat::chat_handler))
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB body limit
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server and serve until shutdown.
pub async fn start(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(GatewayState::new(Duration::from_secs(
        config.upstream_timeout_secs,
    )));

    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Error body for every non-2xx response:
/// `{"error": {"kind": "...", "message": "..."}}`.
#[derive(Serialize)]
pub(crate) struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    kind: &'static str,
    message: String,
}

impl ErrorBody {
    pub(crate) fn new(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail { kind, message: message.into() },
        }
    }
}

pub(crate) type ApiError = (StatusCode, Json<ErrorBody>);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_router() -> Router {
        build_router(Arc::new(GatewayState::new(Duration::from_secs(5))))
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = test_router();

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let app = test_router();

        let req = Request::builder()
            .uri("/v2/nothing")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
