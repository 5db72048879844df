//! # stepwise-runtime
//!
//! Concrete external collaborators for the stepwise agent system.
//!
//! ## Providers
//!
//! - **Ollama** (default feature): local LLM inference via Ollama
//! - **OpenAI-compatible**: any `/chat/completions` endpoint
//!   (OpenAI, OpenRouter, LM Studio, ...)
//!
//! ## Embedders
//!
//! - **Ollama embeddings**: `/api/embeddings` for the retrieval pipeline
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stepwise_runtime::OllamaProvider;
//!
//! let provider = OllamaProvider::new("http://localhost", 11434);
//! let agent = AgentBuilder::new()
//!     .provider(Arc::new(provider))
//!     .build()?;
//! ```

pub mod embeddings;
#[cfg(feature = "ollama")]
pub mod ollama;
pub mod openai;

pub use embeddings::OllamaEmbedder;
#[cfg(feature = "ollama")]
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

// Re-export core types for convenience
pub use stepwise_core::{
    Agent, AgentBuilder, AgentError, LlmProvider, Message, Result, Role, RunOutcome, Step, Tool,
    ToolRegistry, Transcript,
};
