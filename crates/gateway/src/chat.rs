//! The chat completions endpoint.
//!
//! `POST /v1/chat/completions` with an OpenAI-shaped body and the gateway
//! configuration in the `x-promptgate-config` header. The handler runs the
//! input guardrail pipeline, forwards to the configured provider under the
//! retry policy, runs output guardrails, and returns the provider response
//! with `hook_results` attached.
//!
//! Streaming responses re-emit provider deltas as an SSE stream ending in
//! `data: [DONE]`; their hook results travel in the
//! `x-promptgate-hook-results` response header instead of the body, and
//! output guardrails are skipped (there is no complete response to mutate).

use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use std::convert::Infallible;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{error, info};

use promptgate_config::GatewayConfig;
use promptgate_core::error::{ConfigError, MutatorError, ProviderError};
use promptgate_core::hook::{HookResult, HookResults};
use promptgate_core::message::ChatRequest;
use promptgate_core::mutator::RequestContext;
use promptgate_core::provider::{ChatResponse, Provider, StreamChunk};
use promptgate_pipeline::{aggregate, MutationPipeline};
use promptgate_providers::{OpenAiCompatProvider, RetryController, RetryPolicy};

use crate::{ApiError, ErrorBody, SharedState, CONFIG_HEADER, HOOK_RESULTS_HEADER};

pub async fn chat_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let raw = headers
        .get(CONFIG_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            config_error(ConfigError::InvalidHeader(format!(
                "missing {CONFIG_HEADER} header"
            )))
        })?;
    let config = GatewayConfig::from_header(raw).map_err(config_error)?;

    info!(
        provider = %config.provider,
        model = %request.model,
        stream = request.stream,
        guardrails = config.input_guardrails.len(),
        "chat completion request"
    );

    let pipeline = MutationPipeline::build(&state.registry, &config).map_err(config_error)?;

    let mut ctx = RequestContext::new(request);
    let before = pipeline.run_input(&mut ctx).await.map_err(mutator_error)?;

    let provider = OpenAiCompatProvider::from_request_config(
        &config.provider,
        &config.api_key,
        config.custom_host.as_deref(),
        state.upstream_timeout,
    )
    .map_err(provider_error)?;

    let mut policy = RetryPolicy::new(config.retry.attempts);
    if let Some(schedule) = &config.retry.backoff_ms {
        policy = policy.with_backoff_ms(schedule.clone());
    }

    if ctx.request.stream {
        return stream_response(&provider, &policy, ctx.request.clone(), before).await;
    }

    let request = ctx.request.clone();
    let response = RetryController::execute(&policy, || provider.complete(request.clone()))
        .await
        .map_err(provider_error)?;

    // Output guardrails see the complete assistant message
    let after = if pipeline.has_output_mutators() {
        ctx.response = Some(response.message.clone());
        pipeline.run_output(&mut ctx).await.map_err(mutator_error)?
    } else {
        Vec::new()
    };
    let message = ctx.response.unwrap_or(response.message.clone());

    let hook_results = aggregate(before, after);
    let body = completion_body(
        &ChatResponse { message, model: response.model, usage: response.usage },
        &hook_results,
    );
    Ok(Json(body).into_response())
}

/// Initiate the provider stream under the retry policy, then re-encode its
/// chunks as OpenAI-shaped SSE frames. Retries stop once the stream is
/// handed over: a mid-stream failure surfaces as an error frame, never as a
/// silent restart.
async fn stream_response(
    provider: &OpenAiCompatProvider,
    policy: &RetryPolicy,
    request: ChatRequest,
    before: Vec<HookResult>,
) -> Result<Response, ApiError> {
    let model = request.model.clone();
    let rx = RetryController::execute(policy, || provider.stream(request.clone()))
        .await
        .map_err(provider_error)?;

    let id = completion_id();
    let created = chrono::Utc::now().timestamp();

    let stream = ReceiverStream::new(rx).map(move |chunk| {
        let frame = match chunk {
            Ok(StreamChunk { done: true, .. }) => "[DONE]".to_string(),
            Ok(StreamChunk { content, .. }) => serde_json::json!({
                "id": id.as_str(),
                "object": "chat.completion.chunk",
                "created": created,
                "model": model.as_str(),
                "choices": [{
                    "index": 0,
                    "delta": { "content": content.unwrap_or_default() },
                    "finish_reason": null,
                }],
            })
            .to_string(),
            Err(e) => {
                error!(error = %e, "stream cut off");
                serde_json::json!({
                    "error": { "kind": "stream", "message": e.to_string() },
                })
                .to_string()
            }
        };
        Ok::<_, Infallible>(SseEvent::default().data(frame))
    });

    let hook_results = aggregate(before, Vec::new());
    let mut response = Sse::new(stream).keep_alive(KeepAlive::default()).into_response();
    match HeaderValue::from_str(&hook_results_header_value(&hook_results)) {
        Ok(value) => {
            response.headers_mut().insert(HOOK_RESULTS_HEADER, value);
        }
        Err(e) => error!(error = %e, "hook results header could not be encoded"),
    }
    Ok(response)
}

/// Serialize hook results to JSON that is always a legal header value:
/// non-ASCII characters become `\uXXXX` escapes (serde_json already escapes
/// control characters). Check data and error strings can carry arbitrary
/// upstream text, so plain serialization is not header-safe.
fn hook_results_header_value(hook_results: &HookResults) -> String {
    let raw = serde_json::to_string(hook_results).unwrap_or_else(|_| "{}".into());
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    out
}

fn completion_id() -> String {
    format!("chatcmpl-{}", uuid::Uuid::new_v4().simple())
}

/// OpenAI-shaped completion body with `hook_results` attached.
fn completion_body(response: &ChatResponse, hook_results: &HookResults) -> serde_json::Value {
    serde_json::json!({
        "id": completion_id(),
        "object": "chat.completion",
        "created": chrono::Utc::now().timestamp(),
        "model": response.model,
        "choices": [{
            "index": 0,
            "message": response.message,
            "finish_reason": "stop",
        }],
        "usage": response.usage,
        "hook_results": hook_results,
    })
}

fn config_error(e: ConfigError) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody::new("config", e.to_string())),
    )
}

/// Only critical mutator failures reach here; fail-open ones become failed
/// check entries inside the pipeline.
fn mutator_error(e: MutatorError) -> ApiError {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorBody::new("guardrail", e.to_string())),
    )
}

fn provider_error(e: ProviderError) -> ApiError {
    let status = match &e {
        ProviderError::Auth(_) => StatusCode::UNAUTHORIZED,
        ProviderError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        ProviderError::NotConfigured(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
    };
    (status, Json(ErrorBody::new("provider", e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_router, GatewayState};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use promptgate_core::message::{Message, Role};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_router() -> axum::Router {
        build_router(Arc::new(GatewayState::new(Duration::from_secs(5))))
    }

    fn chat_body() -> String {
        serde_json::json!({
            "model": "gpt-4o",
            "messages": [{ "role": "user", "content": "hello" }],
        })
        .to_string()
    }

    async fn post_chat(config_header: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/v1/chat/completions")
            .header("content-type", "application/json");
        if let Some(header) = config_header {
            builder = builder.header(CONFIG_HEADER, header);
        }
        let response = test_router()
            .oneshot(builder.body(Body::from(chat_body())).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn missing_config_header_is_rejected() {
        let (status, body) = post_chat(None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "config");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains(CONFIG_HEADER));
    }

    #[tokio::test]
    async fn malformed_config_header_is_rejected() {
        let (status, body) = post_chat(Some("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "config");
    }

    #[tokio::test]
    async fn unknown_guardrail_type_is_rejected_before_any_call() {
        let config = serde_json::json!({
            "provider": "openai",
            "api_key": "sk-test",
            "input_guardrails": [
                { "id": "g1", "type": "no-such-mutator", "no-such-mutator": {} }
            ],
        })
        .to_string();
        let (status, body) = post_chat(Some(&config)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("no-such-mutator"));
    }

    #[tokio::test]
    async fn unknown_provider_without_custom_host_is_rejected() {
        let config = serde_json::json!({
            "provider": "mystery-llm",
            "api_key": "sk-test",
        })
        .to_string();
        let (status, body) = post_chat(Some(&config)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "provider");
    }

    #[tokio::test]
    async fn zero_retry_attempts_is_rejected() {
        let config = serde_json::json!({
            "provider": "openai",
            "api_key": "sk-test",
            "retry": { "attempts": 0 },
        })
        .to_string();
        let (status, _) = post_chat(Some(&config)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn completion_body_carries_hook_results() {
        let response = ChatResponse {
            message: Message { role: Role::Assistant, content: "hi".into() },
            model: "gpt-4o".into(),
            usage: None,
        };
        let hook_results = aggregate(
            vec![promptgate_core::hook::HookResult::new(
                "g1",
                promptgate_core::hook::HookCheck::new(
                    "memory-retrieval",
                    serde_json::json!({}),
                    true,
                ),
            )],
            Vec::new(),
        );

        let body = completion_body(&response, &hook_results);
        assert_eq!(body["object"], "chat.completion");
        assert_eq!(body["choices"][0]["message"]["content"], "hi");
        assert_eq!(
            body["hook_results"]["before_request_hooks"][0]["id"],
            "g1"
        );
        assert_eq!(
            body["hook_results"]["before_request_hooks"][0]["checks"][0]["transformed"],
            true
        );
        assert!(body["id"].as_str().unwrap().starts_with("chatcmpl-"));
    }

    #[test]
    fn hook_results_header_survives_non_ascii_error_text() {
        // A fail-open check can embed arbitrary upstream text in its error
        let hook_results = aggregate(
            vec![HookResult::new(
                "g1",
                promptgate_core::hook::HookCheck::failed(
                    "memory-retrieval",
                    "vector_store",
                    "upstream said: \u{00e9}chec de la requ\u{00ea}te \u{1F6A8}",
                ),
            )],
            Vec::new(),
        );

        let encoded = hook_results_header_value(&hook_results);
        assert!(encoded.is_ascii());
        axum::http::HeaderValue::from_str(&encoded).unwrap();

        // Escaping preserves the JSON content exactly
        let round_trip: HookResults = serde_json::from_str(&encoded).unwrap();
        assert_eq!(
            round_trip.before_request_hooks[0].checks[0].error.as_deref(),
            Some("upstream said: \u{00e9}chec de la requ\u{00ea}te \u{1F6A8}"),
        );
    }

    #[test]
    fn provider_errors_map_to_expected_statuses() {
        let cases = [
            (ProviderError::Auth("bad key".into()), StatusCode::UNAUTHORIZED),
            (
                ProviderError::RateLimited { retry_after_secs: 1 },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                ProviderError::NotConfigured("nope".into()),
                StatusCode::BAD_REQUEST,
            ),
            (ProviderError::Network("reset".into()), StatusCode::BAD_GATEWAY),
            (
                ProviderError::Api { status_code: 500, message: "boom".into() },
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, expected) in cases {
            let (status, _) = provider_error(err);
            assert_eq!(status, expected);
        }
    }
}
