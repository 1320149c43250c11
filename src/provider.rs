//! Model Provider Abstraction
//!
//! Streaming chat completion clients for the generation backend. OpenAI, Ollama and
//! custom local servers share the OpenAI-compatible wire format; Anthropic has its own.
//! Both stream over server-sent events and are decoded into plain text chunks.

use crate::error::PipelineError;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

pub mod profile;
pub mod sse;

pub use profile::{ProviderConfig, ProviderType};
use sse::SseDecoder;

/// Model provider connection details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModelProvider {
    OpenAI {
        model: String,
        api_key: String,
        base_url: Option<String>, // For custom endpoints (e.g., Azure OpenAI)
    },
    Anthropic {
        model: String,
        api_key: String,
    },
    Ollama {
        model: String,
        base_url: Option<String>, // Default: http://localhost:11434
    },
    LocalCustom {
        model: String,
        endpoint: String, // Full endpoint URL (e.g., http://localhost:8080/v1)
        api_key: Option<String>,
    },
}

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Completion options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub temperature: Option<f32>, // 0.0-2.0, default: 1.0
    pub max_tokens: Option<u32>,  // Maximum tokens to generate
    pub top_p: Option<f32>,       // Nucleus sampling
    pub stop: Option<Vec<String>>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: Some(1.0),
            max_tokens: None,
            top_p: None,
            stop: None,
        }
    }
}

/// Streaming completion type
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<String, PipelineError>> + Send>>;

/// Model provider client trait
#[async_trait]
pub trait ModelProviderClient: Send + Sync {
    /// Generate a streaming completion
    async fn stream(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionStream, PipelineError>;

    /// Get the provider name
    fn provider_name(&self) -> &str;

    /// Get the model name
    fn model_name(&self) -> &str;
}

// OpenAI-compatible request structures
#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

// Helper function to convert MessageRole to string
fn role_to_string(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    }
}

// Helper function to map HTTP errors to PipelineError
fn map_http_error(error: reqwest::Error) -> PipelineError {
    if let Some(status) = error.status() {
        map_status(status.as_u16(), &error.to_string())
    } else if error.is_timeout() {
        PipelineError::ProviderRequestFailed(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        PipelineError::ProviderRequestFailed(format!("Connection error: {}", error))
    } else {
        PipelineError::ProviderError(format!("HTTP error: {}", error))
    }
}

fn map_status(status: u16, detail: &str) -> PipelineError {
    match status {
        401 | 403 => PipelineError::ProviderAuthFailed(format!("Authentication failed: {}", detail)),
        429 => PipelineError::ProviderRateLimit(format!("Rate limit exceeded: {}", detail)),
        404 => PipelineError::ProviderModelNotFound(format!("Model not found: {}", detail)),
        _ => PipelineError::ProviderRequestFailed(format!(
            "Request failed with status {}: {}",
            status, detail
        )),
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, PipelineError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(map_status(status, &error_text))
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

fn build_provider_http_client(request_timeout: Duration) -> Result<Client, PipelineError> {
    Client::builder()
        .no_proxy()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .timeout(request_timeout)
        .build()
        .map_err(|e| PipelineError::ProviderError(format!("Failed to create HTTP client: {}", e)))
}

/// What one server-sent event payload means for the text stream.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SseItem {
    Text(String),
    Skip,
    Done,
    Failed(String),
}

/// OpenAI-compatible `chat.completion.chunk` payloads.
pub(crate) fn openai_item(payload: &str) -> SseItem {
    if payload.trim() == "[DONE]" {
        return SseItem::Done;
    }
    let value: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(e) => return SseItem::Failed(format!("Failed to parse stream payload: {}", e)),
    };
    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return SseItem::Failed(message);
    }
    value
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(|text| SseItem::Text(text.to_string()))
        .unwrap_or(SseItem::Skip)
}

/// Anthropic Messages API stream payloads.
pub(crate) fn anthropic_item(payload: &str) -> SseItem {
    let value: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(e) => return SseItem::Failed(format!("Failed to parse stream payload: {}", e)),
    };
    match value.get("type").and_then(Value::as_str) {
        Some("content_block_delta") => value
            .pointer("/delta/text")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(|text| SseItem::Text(text.to_string()))
            .unwrap_or(SseItem::Skip),
        Some("message_stop") => SseItem::Done,
        Some("error") => SseItem::Failed(
            value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown provider error")
                .to_string(),
        ),
        _ => SseItem::Skip,
    }
}

struct SseState<S> {
    bytes: Pin<Box<S>>,
    decoder: SseDecoder,
    queued: VecDeque<Result<String, PipelineError>>,
    finished: bool,
}

impl<S> SseState<S> {
    fn enqueue(&mut self, item: SseItem) {
        if self.finished {
            return;
        }
        match item {
            SseItem::Text(text) => self.queued.push_back(Ok(text)),
            SseItem::Skip => {}
            SseItem::Done => self.finished = true,
            SseItem::Failed(message) => {
                self.queued
                    .push_back(Err(PipelineError::ProviderError(message)));
                self.finished = true;
            }
        }
    }
}

/// Turn a response byte stream into text chunks using `extract` per SSE payload.
pub(crate) fn sse_text_stream<S, B>(bytes: S, extract: fn(&str) -> SseItem) -> CompletionStream
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = SseState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::new(),
        queued: VecDeque::new(),
        finished: false,
    };

    Box::pin(futures::stream::unfold(state, move |mut state| async move {
        loop {
            if let Some(item) = state.queued.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    for payload in state.decoder.push(chunk.as_ref()) {
                        state.enqueue(extract(&payload));
                    }
                }
                Some(Err(e)) => {
                    state.queued.push_back(Err(map_http_error(e)));
                    state.finished = true;
                }
                None => {
                    if let Some(payload) = state.decoder.finish() {
                        state.enqueue(extract(&payload));
                    }
                    state.finished = true;
                }
            }
        }
    }))
}

/// OpenAI-compatible streaming client (OpenAI, Ollama, custom local servers)
pub struct OpenAICompatibleClient {
    client: Client,
    provider_name: &'static str,
    model: String,
    api_key: Option<String>,
    chat_url: String,
}

impl OpenAICompatibleClient {
    pub fn openai(
        model: String,
        api_key: String,
        base_url: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let base_url = base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        Ok(Self {
            client: build_provider_http_client(request_timeout)?,
            provider_name: "openai",
            model,
            api_key: Some(api_key),
            chat_url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        })
    }

    pub fn ollama(
        model: String,
        base_url: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let base_url = base_url.unwrap_or_else(|| "http://localhost:11434".to_string());
        Ok(Self {
            client: build_provider_http_client(request_timeout)?,
            provider_name: "ollama",
            model,
            api_key: None,
            chat_url: format!("{}/v1/chat/completions", base_url.trim_end_matches('/')),
        })
    }

    pub fn local(
        model: String,
        endpoint: String,
        api_key: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            client: build_provider_http_client(request_timeout)?,
            provider_name: "local",
            model,
            api_key,
            chat_url: format!("{}/chat/completions", endpoint.trim_end_matches('/')),
        })
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }
}

#[async_trait]
impl ModelProviderClient for OpenAICompatibleClient {
    async fn stream(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionStream, PipelineError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: messages
                .into_iter()
                .map(|msg| OpenAIMessage {
                    role: role_to_string(msg.role).to_string(),
                    content: msg.content,
                })
                .collect(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            top_p: options.top_p,
            stop: options.stop,
            stream: true,
        };

        let mut request_builder = self
            .client
            .post(&self.chat_url)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream");
        if let Some(api_key) = &self.api_key {
            request_builder = request_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request_builder
            .json(&request)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = ensure_success(response).await?;

        Ok(sse_text_stream(response.bytes_stream(), openai_item))
    }

    fn provider_name(&self) -> &str {
        self.provider_name
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Anthropic Messages API streaming client
pub struct AnthropicClient {
    client: Client,
    model: String,
    api_key: String,
}

impl AnthropicClient {
    const MESSAGES_URL: &'static str = "https://api.anthropic.com/v1/messages";

    pub fn new(model: String, api_key: String, request_timeout: Duration) -> Result<Self, PipelineError> {
        Ok(Self {
            client: build_provider_http_client(request_timeout)?,
            model,
            api_key,
        })
    }
}

#[async_trait]
impl ModelProviderClient for AnthropicClient {
    async fn stream(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionStream, PipelineError> {
        let system_message = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let conversation: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| json!({ "role": role_to_string(m.role), "content": m.content }))
            .collect();

        let mut request_body = json!({
            "model": self.model,
            "max_tokens": options.max_tokens.unwrap_or(1024),
            "messages": conversation,
            "stream": true,
        });
        if !system_message.is_empty() {
            request_body["system"] = json!(system_message);
        }
        if let Some(temp) = options.temperature {
            request_body["temperature"] = json!(temp.min(1.0));
        }
        if let Some(stop) = options.stop {
            request_body["stop_sequences"] = json!(stop);
        }

        let response = self
            .client
            .post(Self::MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = ensure_success(response).await?;

        Ok(sse_text_stream(response.bytes_stream(), anthropic_item))
    }

    fn provider_name(&self) -> &str {
        "anthropic"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Provider factory for creating provider clients
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_client(
        provider: &ModelProvider,
        request_timeout: Duration,
    ) -> Result<Box<dyn ModelProviderClient>, PipelineError> {
        match provider {
            ModelProvider::OpenAI {
                model,
                api_key,
                base_url,
            } => Ok(Box::new(OpenAICompatibleClient::openai(
                model.clone(),
                api_key.clone(),
                base_url.clone(),
                request_timeout,
            )?)),
            ModelProvider::Anthropic { model, api_key } => Ok(Box::new(AnthropicClient::new(
                model.clone(),
                api_key.clone(),
                request_timeout,
            )?)),
            ModelProvider::Ollama { model, base_url } => Ok(Box::new(
                OpenAICompatibleClient::ollama(model.clone(), base_url.clone(), request_timeout)?,
            )),
            ModelProvider::LocalCustom {
                model,
                endpoint,
                api_key,
            } => Ok(Box::new(OpenAICompatibleClient::local(
                model.clone(),
                endpoint.clone(),
                api_key.clone(),
                request_timeout,
            )?)),
        }
    }
}

// Mock provider for testing
#[cfg(test)]
pub struct MockProvider {
    chunks: Vec<Result<String, PipelineError>>,
    requests: std::sync::Arc<std::sync::Mutex<Vec<(Vec<ChatMessage>, CompletionOptions)>>>,
}

#[cfg(test)]
impl MockProvider {
    pub fn new(chunks: Vec<Result<String, PipelineError>>) -> Self {
        Self {
            chunks,
            requests: Default::default(),
        }
    }

    pub fn requests(&self) -> Vec<(Vec<ChatMessage>, CompletionOptions)> {
        self.requests.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl ModelProviderClient for MockProvider {
    async fn stream(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionStream, PipelineError> {
        self.requests.lock().unwrap().push((messages, options));
        Ok(Box::pin(futures::stream::iter(self.chunks.clone())))
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}
