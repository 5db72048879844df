//! Ollama Embedder
//!
//! `Embedder` implementation over Ollama's `/api/embeddings` endpoint,
//! feeding the retrieval pipeline.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use stepwise_core::{
    error::{AgentError, Result},
    retrieval::Embedder,
};

const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Embedding collaborator backed by a local Ollama instance
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    /// Create against an explicit endpoint, e.g. `http://localhost:11434`
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// Create from `OLLAMA_HOST`/`OLLAMA_PORT`, defaulting to localhost
    pub fn from_env() -> Self {
        let host = std::env::var("OLLAMA_HOST").unwrap_or_else(|_| "http://localhost".into());
        let port = std::env::var("OLLAMA_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(11434);
        let model =
            std::env::var("STEPWISE_EMBED_MODEL").unwrap_or_else(|_| DEFAULT_EMBED_MODEL.into());

        Self::new(format!("{host}:{port}"), model)
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(url)
            .json(&EmbeddingsRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    AgentError::ProviderUnavailable(e.to_string())
                } else {
                    AgentError::Provider(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Provider(format!("HTTP {status}: {body}")));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Parse(format!("bad embeddings body: {e}")))?;

        if parsed.embedding.is_empty() {
            return Err(AgentError::Provider("empty embedding returned".into()));
        }

        Ok(parsed.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let request = EmbeddingsRequest {
            model: "nomic-embed-text",
            prompt: "hello",
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["model"], "nomic-embed-text");
        assert_eq!(body["prompt"], "hello");
    }

    #[test]
    fn test_defaults() {
        let embedder = OllamaEmbedder::new("http://localhost:11434", DEFAULT_EMBED_MODEL);
        assert_eq!(embedder.model(), "nomic-embed-text");
    }
}
