//! OpenAI-compatible provider implementation.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, and any endpoint exposing
//! the OpenAI `/chat/completions` + `/embeddings` wire format. Per-request
//! routing comes from the caller's gateway config: a known provider name
//! selects a default base URL, `custom_host` overrides it.

use async_trait::async_trait;
use futures::StreamExt;
use promptgate_core::error::ProviderError;
use promptgate_core::message::{ChatRequest, Message, Role};
use promptgate_core::provider::{ChatResponse, Provider, StreamChunk, Usage};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::sse::{SseFrame, StreamReassembler};

/// An OpenAI-compatible LLM provider.
#[derive(Debug)]
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a provider against an explicit base URL.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Resolve a provider by name from the per-request config.
    ///
    /// `custom_host` wins over the name's default base URL; an unknown name
    /// without a custom host is a configuration error.
    pub fn from_request_config(
        provider: &str,
        api_key: &str,
        custom_host: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let base_url = match custom_host {
            Some(host) => host.to_string(),
            None => default_base_url(provider)
                .ok_or_else(|| {
                    ProviderError::NotConfigured(format!(
                        "Unknown provider '{provider}' and no custom_host given"
                    ))
                })?
                .to_string(),
        };
        Self::new(provider, base_url, api_key, timeout)
    }

    fn request_body(request: &ChatRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": request.messages,
            "stream": stream,
        });
        if let Some(temperature) = request.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        body
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
        accept_sse: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}{path}", self.base_url);
        let mut req = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if accept_sse {
            req = req.header("Accept", "text/event-stream");
        }

        let response = req.json(body).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(e.to_string())
            } else {
                ProviderError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        match status {
            200 => Ok(response),
            429 => Err(ProviderError::RateLimited { retry_after_secs: 5 }),
            401 | 403 => Err(ProviderError::Auth(
                "Invalid API key or insufficient permissions".into(),
            )),
            _ => {
                let message = response.text().await.unwrap_or_default();
                warn!(status, body = %message, "Provider returned error");
                Err(ProviderError::Api { status_code: status, message })
            }
        }
    }
}

/// Default base URL for a known provider name.
pub fn default_base_url(provider: &str) -> Option<&'static str> {
    match provider {
        "openai" => Some("https://api.openai.com/v1"),
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "ollama" => Some("http://localhost:11434/v1"),
        _ => None,
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let body = Self::request_body(&request, false);
        let response = self.post("/chat/completions", &body, false).await?;

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::Api {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice = api_response.choices.into_iter().next().ok_or_else(|| {
            ProviderError::Api { status_code: 200, message: "No choices in response".into() }
        })?;

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ChatResponse {
            message: Message {
                role: Role::Assistant,
                content: choice.message.content.unwrap_or_default(),
            },
            model: api_response.model,
            usage,
        })
    }

    async fn stream(
        &self,
        request: ChatRequest,
    ) -> Result<
        tokio::sync::mpsc::Receiver<Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        debug!(provider = %self.name, model = %request.model, "Sending streaming request");

        let body = Self::request_body(&request, true);
        let response = self.post("/chat/completions", &body, true).await?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);

        // Read the SSE byte stream and forward reassembled deltas. If the
        // receiver is dropped the sends fail and the task exits, releasing
        // the connection.
        let byte_stream = response
            .bytes_stream()
            .map(|r| r.map(|b| b.to_vec()).map_err(|e| ProviderError::Stream(e.to_string())));
        tokio::spawn(forward_sse(byte_stream, tx));

        Ok(rx)
    }

    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, ProviderError> {
        debug!(provider = %self.name, model = %model, "Sending embedding request");

        let body = serde_json::json!({
            "model": model,
            "input": text,
            "encoding_format": "float",
        });
        let response = self.post("/embeddings", &body, false).await?;

        let api_resp: EmbeddingApiResponse =
            response.json().await.map_err(|e| ProviderError::Api {
                status_code: 200,
                message: format!("Failed to parse embedding response: {e}"),
            })?;

        api_resp
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ProviderError::Api {
                status_code: 200,
                message: "No embedding in response".into(),
            })
    }
}

/// Forward reassembled SSE frames from a byte stream into the channel.
///
/// Ends with `Ok(StreamChunk::done())` only when the `[DONE]` sentinel
/// arrived; a connection error or EOF before it ends with
/// `Err(ProviderError::Stream)` so callers can tell "completed" from
/// "cut off".
async fn forward_sse<S>(
    mut byte_stream: S,
    tx: tokio::sync::mpsc::Sender<Result<StreamChunk, ProviderError>>,
) where
    S: futures::Stream<Item = Result<Vec<u8>, ProviderError>> + Unpin + Send,
{
    let mut reassembler = StreamReassembler::new();

    while let Some(chunk_result) = byte_stream.next().await {
        let bytes = match chunk_result {
            Ok(b) => b,
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                return;
            }
        };

        for frame in reassembler.push(&bytes) {
            match frame {
                SseFrame::Delta(chunk) => {
                    if tx.send(Ok(chunk)).await.is_err() {
                        return; // receiver dropped
                    }
                }
                SseFrame::Done => {
                    let _ = tx.send(Ok(StreamChunk::done())).await;
                    return;
                }
            }
        }
    }

    if !reassembler.is_done() {
        let _ = tx
            .send(Err(ProviderError::Stream(
                "connection closed before terminal sentinel".into(),
            )))
            .await;
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}
