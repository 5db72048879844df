//! # stepwise-core
//!
//! A stepped tool-calling agent loop with a provider-agnostic LLM abstraction.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Agent                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  Step Loop  │  │    Tools    │  │   LlmProvider       │  │
//! │  │   Driver    │──│   Registry  │──│   (Strategy)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The model speaks a JSON step protocol (`START`, `PLAN`, `ACT`, `OBSERVE`,
//! `OUTPUT`). The driver appends each reply to an append-only transcript,
//! executes requested tools, feeds observations back, and stops on `OUTPUT`
//! or when the iteration budget runs out.
//!
//! The `LlmProvider` trait enables swapping between Ollama, OpenAI-compatible
//! endpoints, or any other backend without changing agent logic.

pub mod driver;
pub mod error;
pub mod message;
pub mod parser;
pub mod prompt;
pub mod provider;
pub mod retrieval;
pub mod step;
pub mod tool;

pub use driver::{Agent, AgentBuilder, AgentConfig, RunOutcome};
pub use error::{AgentError, Result};
pub use message::{Message, Role, Transcript};
pub use prompt::PromptTemplate;
pub use provider::LlmProvider;
pub use step::{Step, ToolCall};
pub use tool::{ParameterSchema, Tool, ToolRegistry, ToolSchema};
