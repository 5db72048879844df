//! OpenAI-Compatible LLM Provider
//!
//! Implementation of `LlmProvider` for any endpoint speaking the
//! `/chat/completions` wire format: OpenAI itself, OpenRouter, LM Studio,
//! or Ollama's compatibility layer. The base URL and bearer key are
//! configurable, so the same provider covers hosted and local backends.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use stepwise_core::{
    error::{AgentError, Result},
    message::Message,
    provider::{
        Completion, CompletionStream, FinishReason, GenerationOptions, LlmProvider, ModelInfo,
        ProviderInfo, StreamChunk, TokenUsage,
    },
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// OpenAI-compatible provider configuration
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// API base URL, e.g. `https://api.openai.com/v1` or
    /// `https://openrouter.ai/api/v1`
    pub base_url: String,

    /// Bearer token; local endpoints usually need none
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl OpenAiConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into()),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// OpenAI-compatible LLM provider
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    /// Create a provider against a base URL
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self::from_config(OpenAiConfig {
            base_url: base_url.into(),
            api_key,
            ..Default::default()
        })
    }

    /// Create from configuration
    pub fn from_config(config: OpenAiConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self { client, config }
    }

    /// Create from `OPENAI_BASE_URL` / `OPENAI_API_KEY`
    pub fn from_env() -> Self {
        Self::from_config(OpenAiConfig::from_env())
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        let mut builder = self.client.post(url);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        let mut builder = self.client.get(url);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }

    fn build_request(
        messages: &[Message],
        options: &GenerationOptions,
        stream: bool,
    ) -> ChatRequest {
        ChatRequest {
            model: options.model.clone(),
            messages: messages.iter().map(WireMessage::from).collect(),
            temperature: options.temperature,
            top_p: options.top_p,
            max_tokens: options.max_tokens,
            stop: if options.stop_sequences.is_empty() {
                None
            } else {
                Some(options.stop_sequences.clone())
            },
            response_format: options.json_output.then(|| ResponseFormat {
                kind: "json_object",
            }),
            stream,
        }
    }

    async fn send(&self, request: &ChatRequest) -> Result<reqwest::Response> {
        let response = self
            .request("chat/completions")
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, &body));
        }

        Ok(response)
    }
}

/// Classify transport-level failures
fn map_transport_error(e: reqwest::Error) -> AgentError {
    if e.is_timeout() || e.is_connect() {
        AgentError::ProviderUnavailable(e.to_string())
    } else {
        AgentError::Provider(e.to_string())
    }
}

/// Classify HTTP error statuses into the agent error taxonomy
fn map_status_error(status: StatusCode, body: &str) -> AgentError {
    let detail = format!("HTTP {status}: {body}");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Auth(detail),
        StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited(detail),
        s if s.is_server_error() => AgentError::ProviderUnavailable(detail),
        _ => AgentError::Provider(detail),
    }
}

fn map_finish_reason(reason: Option<&str>) -> Option<FinishReason> {
    match reason {
        Some("stop") => Some(FinishReason::Stop),
        Some("length") => Some(FinishReason::Length),
        Some("content_filter") => Some(FinishReason::ContentFilter),
        _ => None,
    }
}

/// Parse one SSE `data:` payload from a streaming response.
///
/// Returns `None` for payloads that carry no delta (keepalives, role-only
/// first chunks).
fn parse_stream_data(data: &str) -> Option<Result<StreamChunk>> {
    if data == "[DONE]" {
        return Some(Ok(StreamChunk {
            delta: String::new(),
            done: true,
            usage: None,
        }));
    }

    match serde_json::from_str::<StreamResponse>(data) {
        Ok(parsed) => {
            let delta = parsed
                .choices
                .first()
                .and_then(|c| c.delta.content.clone())
                .unwrap_or_default();
            if delta.is_empty() {
                None
            } else {
                Some(Ok(StreamChunk {
                    delta,
                    done: false,
                    usage: None,
                }))
            }
        }
        Err(e) => Some(Err(AgentError::Parse(format!(
            "bad stream payload: {e}"
        )))),
    }
}

// ── Wire types ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

impl From<&Message> for WireMessage {
    fn from(m: &Message) -> Self {
        // Tool observations are folded into user messages; the plain
        // completions API ties the tool role to its own function-call ids.
        let role = match m.role {
            stepwise_core::Role::System => "system",
            stepwise_core::Role::Assistant => "assistant",
            stepwise_core::Role::User | stepwise_core::Role::Tool => "user",
        };
        Self {
            role: role.into(),
            content: m.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<WireModel>,
}

#[derive(Debug, Deserialize)]
struct WireModel {
    id: String,
}

// ── Trait implementation ────────────────────────────────────────────────

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn info(&self) -> Result<ProviderInfo> {
        let models = self.list_models().await.unwrap_or_default();

        Ok(ProviderInfo {
            name: "OpenAI-compatible".into(),
            models,
            supports_streaming: true,
            supports_json_output: true,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        match self.get("models").send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                tracing::warn!("health check failed for {}: {}", self.config.base_url, e);
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let request = Self::build_request(messages, options, false);
        let response = self.send(&request).await?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Parse(format!("bad completion body: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("no choices in completion".into()))?;

        Ok(Completion {
            content: choice.message.content,
            model: parsed.model.unwrap_or_else(|| options.model.clone()),
            usage: parsed.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: map_finish_reason(choice.finish_reason.as_deref()),
        })
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<CompletionStream> {
        let request = Self::build_request(messages, options, true);
        let response = self.send(&request).await?;

        let bytes = response
            .bytes_stream()
            .map(|item| item.map(|b| b.to_vec()).map_err(map_transport_error));

        struct SseState<S> {
            bytes: S,
            buffer: String,
            pending: std::collections::VecDeque<Result<StreamChunk>>,
            finished: bool,
        }

        let state = SseState {
            bytes: Box::pin(bytes),
            buffer: String::new(),
            pending: std::collections::VecDeque::new(),
            finished: false,
        };

        let stream = futures::stream::unfold(state, |mut st| async move {
            loop {
                if let Some(item) = st.pending.pop_front() {
                    if matches!(item, Ok(StreamChunk { done: true, .. })) {
                        st.finished = true;
                    }
                    return Some((item, st));
                }
                if st.finished {
                    return None;
                }

                match st.bytes.next().await {
                    Some(Ok(chunk)) => {
                        st.buffer.push_str(&String::from_utf8_lossy(&chunk));
                        while let Some(pos) = st.buffer.find('\n') {
                            let line: String = st.buffer.drain(..=pos).collect();
                            let line = line.trim();
                            if let Some(data) = line.strip_prefix("data:") {
                                if let Some(item) = parse_stream_data(data.trim()) {
                                    st.pending.push_back(item);
                                }
                            }
                        }
                    }
                    Some(Err(e)) => {
                        st.finished = true;
                        return Some((Err(e), st));
                    }
                    None => {
                        // Upstream closed without [DONE]; synthesize the end.
                        st.finished = true;
                        return Some((
                            Ok(StreamChunk {
                                delta: String::new(),
                                done: true,
                                usage: None,
                            }),
                            st,
                        ));
                    }
                }
            }
        });

        Ok(Box::pin(stream))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self
            .get("models")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, &body));
        }

        let parsed: ModelsResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Parse(format!("bad models body: {e}")))?;

        Ok(parsed
            .data
            .into_iter()
            .map(|m| ModelInfo {
                id: m.id.clone(),
                name: m.id,
                context_length: None,
            })
            .collect())
    }
}
