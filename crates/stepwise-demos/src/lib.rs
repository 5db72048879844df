//! # stepwise-demos
//!
//! Shared pieces for the demo binaries: the mock weather tool and
//! environment-driven provider selection.
//!
//! The weather data is static on purpose; the demos exercise the loop
//! driver, not a weather API. Swap `WeatherTool` for a real client by
//! implementing the same `Tool` trait.

use std::sync::Arc;

use async_trait::async_trait;

use stepwise_core::error::{AgentError, Result};
use stepwise_core::provider::LlmProvider;
use stepwise_core::tool::{ParameterSchema, Tool, ToolSchema};
use stepwise_runtime::{OllamaProvider, OpenAiProvider};

/// Mock weather lookup with a fixed city table
pub struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_weather".into(),
            description: "Returns the weather for a given location.".into(),
            parameters: vec![ParameterSchema {
                name: "location".into(),
                param_type: "string".into(),
                description: "City name, e.g. 'Dhaka'".into(),
                required: true,
            }],
        }
    }

    async fn invoke(&self, args: &[serde_json::Value]) -> Result<String> {
        let location = args
            .first()
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        if location.trim().is_empty() {
            return Err(AgentError::ToolExecution(
                "Location is required to get the weather.".into(),
            ));
        }

        Ok(match location.to_lowercase().as_str() {
            "kurigram" => "10°C".into(),
            "dhaka" => "15°C".into(),
            "rangpur" => "20°C".into(),
            _ => format!("The weather in {location} is currently unavailable."),
        })
    }
}

/// Pick a chat provider from the environment.
///
/// `STEPWISE_PROVIDER=ollama|openai` forces a backend; otherwise the
/// presence of `OPENAI_API_KEY` selects the OpenAI-compatible path.
/// Returns the provider and a model id (`STEPWISE_MODEL` override, or the
/// backend's default).
pub fn provider_from_env() -> (Arc<dyn LlmProvider>, String) {
    let forced = std::env::var("STEPWISE_PROVIDER").ok();
    let use_openai = match forced.as_deref() {
        Some("openai") => true,
        Some("ollama") => false,
        Some(other) => {
            tracing::warn!(provider = other, "unknown STEPWISE_PROVIDER, using ollama");
            false
        }
        None => std::env::var("OPENAI_API_KEY").is_ok(),
    };

    if use_openai {
        let provider = OpenAiProvider::from_env();
        tracing::info!(base_url = provider.base_url(), "using OpenAI-compatible provider");
        let model = std::env::var("STEPWISE_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        (Arc::new(provider), model)
    } else {
        let provider = OllamaProvider::from_env();
        tracing::info!(endpoint = provider.endpoint(), "using Ollama provider");
        let model = std::env::var("STEPWISE_MODEL").unwrap_or_else(|_| "llama3.2".into());
        (Arc::new(provider), model)
    }
}
