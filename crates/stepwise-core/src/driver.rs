//! Loop Driver
//!
//! Orchestrates a bounded number of round-trips with a chat model. Each
//! reply must be one JSON step; `ACT` steps are dispatched to the tool
//! registry and their observations fed back, `OUTPUT` ends the run. A run
//! always terminates with either a final answer or an explicit
//! out-of-budget outcome.

use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::message::{Message, Transcript};
use crate::provider::{GenerationOptions, LlmProvider};
use crate::step::Step;
use crate::tool::{Tool, ToolRegistry};

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// System prompt template
    pub system_prompt: String,

    /// Maximum model round-trips before giving up
    pub max_iterations: usize,

    /// Generation options
    pub generation: GenerationOptions,

    /// Whether to append tool descriptions to the system prompt
    pub inject_tool_descriptions: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_iterations: 10,
            generation: GenerationOptions::default(),
            inject_tool_descriptions: true,
        }
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a helpful assistant with START, PLAN, ACT, OBSERVE, and OUTPUT states.
You must always respond with exactly one JSON object and nothing else (no Markdown, no extra text).

Example JSON sequence:
{"type": "START", "content": "User has asked for the weather in Kurigram."}
{"type": "PLAN", "content": "I will use the get_weather tool to find the weather in Kurigram."}
{"type": "ACT", "content": {"tool": "get_weather", "args": ["Kurigram"]}}
{"type": "OBSERVE", "content": "10°C"}
{"type": "OUTPUT", "content": "The weather in Kurigram is 10°C."}"#;

/// Terminal result of one run.
///
/// Budget exhaustion is a value, not an error: the caller always gets a
/// terminal outcome, and upstream failures alone surface as `Err`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The model produced an `OUTPUT` step; carries its content.
    Answer(String),
    /// The iteration ceiling was reached without an `OUTPUT` step.
    OutOfBudget { iterations: usize },
}

impl RunOutcome {
    /// The final answer, if the run produced one
    pub fn answer(&self) -> Option<&str> {
        match self {
            RunOutcome::Answer(text) => Some(text),
            RunOutcome::OutOfBudget { .. } => None,
        }
    }
}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self::new(provider, tools, AgentConfig::default())
    }

    /// Build the full system prompt including tool descriptions
    fn build_system_prompt(&self) -> String {
        let mut prompt = self.config.system_prompt.clone();

        if self.config.inject_tool_descriptions && !self.tools.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&self.tools.prompt_section());
        }

        prompt
    }

    /// Seed a transcript for a task: system instructions plus the user message.
    pub fn transcript_for(&self, task: &str) -> Transcript {
        let mut transcript = Transcript::with_system_prompt(self.build_system_prompt());
        transcript.push(Message::user(task));
        transcript
    }

    /// Run the loop over a seeded transcript.
    ///
    /// The transcript must already carry a system message (see
    /// [`Agent::transcript_for`]); it grows monotonically for the duration
    /// of the run. A reply that fails to parse as a step is retried, and
    /// the retry consumes an iteration slot, so a run performs at most
    /// `max_iterations` model round-trips.
    pub async fn run(&self, transcript: &mut Transcript) -> Result<RunOutcome> {
        if !transcript.has_system_prompt() {
            return Err(AgentError::Config(
                "transcript must start with a system message".into(),
            ));
        }

        for iteration in 1..=self.config.max_iterations {
            tracing::debug!(iteration, max = self.config.max_iterations, "model round-trip");

            let completion = self
                .provider
                .complete(transcript.messages(), &self.config.generation)
                .await?;

            transcript.push(Message::assistant(&completion.content));

            let step = match Step::parse(&completion.content) {
                Ok(step) => step,
                Err(e) => {
                    tracing::warn!(error = %e, "malformed step from model, retrying");
                    continue;
                }
            };

            match step {
                Step::Output(answer) => {
                    tracing::info!(iteration, "final answer produced");
                    return Ok(RunOutcome::Answer(answer));
                }
                Step::Act(call) => {
                    tracing::debug!(tool = %call.tool, "executing tool");

                    let observation = match self.tools.invoke(&call).await {
                        Ok(output) => output,
                        Err(AgentError::ToolNotFound(name)) => {
                            tracing::warn!(tool = %name, "unknown tool requested");
                            format!("Unknown tool: {name}")
                        }
                        Err(e) => {
                            tracing::warn!(tool = %call.tool, error = %e, "tool failed");
                            format!("Error: {e}")
                        }
                    };

                    let wire = serde_json::to_string(&Step::Observe(observation))?;
                    transcript.push(Message::tool(wire, Some(call.tool)));
                }
                other => {
                    // START/PLAN/OBSERVE from the model carry no action.
                    tracing::debug!(step = %other, "intermediate step");
                }
            }
        }

        tracing::warn!(
            iterations = self.config.max_iterations,
            "iteration ceiling reached without an answer"
        );
        Ok(RunOutcome::OutOfBudget {
            iterations: self.config.max_iterations,
        })
    }

    /// Run with a simple task string (creates a fresh transcript)
    pub async fn ask(&self, task: &str) -> Result<RunOutcome> {
        let mut transcript = self.transcript_for(task);
        self.run(&mut transcript).await
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: Vec<Arc<dyn Tool>>,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: Vec::new(),
            config: AgentConfig::default(),
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    pub fn json_output(mut self, enabled: bool) -> Self {
        self.config.generation.json_output = enabled;
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    /// Build the agent; registers all tools, surfacing schema conflicts.
    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        let mut registry = ToolRegistry::new();
        for tool in self.tools {
            registry.register_boxed(tool)?;
        }

        Ok(Agent::new(provider, Arc::new(registry), self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::provider::{Completion, CompletionStream, ModelInfo, ProviderInfo};
    use crate::tool::{ParameterSchema, ToolSchema};

    /// Provider that replays a fixed list of replies and counts requests.
    struct ScriptedProvider {
        replies: Mutex<VecDeque<String>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|s| (*s).to_string()).collect()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn info(&self) -> Result<ProviderInfo> {
            Ok(ProviderInfo {
                name: "Scripted".into(),
                models: vec![],
                supports_streaming: false,
                supports_json_output: true,
            })
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(
            &self,
            _messages: &[Message],
            options: &GenerationOptions,
        ) -> Result<Completion> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted provider ran out of replies");
            Ok(Completion {
                content: reply,
                model: options.model.clone(),
                usage: None,
                finish_reason: None,
            })
        }

        async fn complete_stream(
            &self,
            _messages: &[Message],
            _options: &GenerationOptions,
        ) -> Result<CompletionStream> {
            Err(AgentError::Provider("scripted provider does not stream".into()))
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            Ok(vec![])
        }
    }

    /// Weather lookup mirroring the canonical demo tool.
    struct StubWeatherTool;

    #[async_trait]
    impl Tool for StubWeatherTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "get_weather".into(),
                description: "Returns the weather for a given location.".into(),
                parameters: vec![ParameterSchema {
                    name: "location".into(),
                    param_type: "string".into(),
                    description: "City name".into(),
                    required: true,
                }],
            }
        }

        async fn invoke(&self, args: &[serde_json::Value]) -> Result<String> {
            let location = args[0].as_str().unwrap_or_default();
            if location.trim().is_empty() {
                return Err(AgentError::ToolExecution(
                    "Location is required to get the weather.".into(),
                ));
            }
            match location.to_lowercase().as_str() {
                "dhaka" => Ok("15°C".into()),
                other => Ok(format!("The weather in {other} is currently unavailable.")),
            }
        }
    }

    fn agent(provider: Arc<ScriptedProvider>, max_iterations: usize) -> Agent {
        AgentBuilder::new()
            .provider(provider)
            .tool(StubWeatherTool)
            .max_iterations(max_iterations)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_output_returns_content_and_stops() {
        let provider = ScriptedProvider::new(&[
            r#"{"type": "START", "content": "Thinking."}"#,
            r#"{"type": "OUTPUT", "content": "All done."}"#,
        ]);
        let agent = agent(provider.clone(), 10);

        let outcome = agent.ask("say done").await.unwrap();
        assert_eq!(outcome, RunOutcome::Answer("All done.".into()));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_weather_scenario_observation_verbatim() {
        let provider = ScriptedProvider::new(&[
            r#"{"type": "ACT", "content": {"tool": "get_weather", "args": ["dhaka"]}}"#,
            r#"{"type": "OUTPUT", "content": "The weather in Dhaka is 15°C."}"#,
        ]);
        let agent = agent(provider.clone(), 10);

        let mut transcript = agent.transcript_for("What's the weather in Dhaka?");
        let outcome = agent.run(&mut transcript).await.unwrap();

        assert_eq!(outcome.answer(), Some("The weather in Dhaka is 15°C."));

        // system, user, ACT reply, observation, OUTPUT reply
        assert_eq!(transcript.len(), 5);
        let observation = &transcript.messages()[3];
        assert_eq!(observation.role, crate::message::Role::Tool);
        assert_eq!(observation.name.as_deref(), Some("get_weather"));
        assert_eq!(
            Step::parse(&observation.content).unwrap(),
            Step::Observe("15°C".into())
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_continues_with_observation() {
        let provider = ScriptedProvider::new(&[
            r#"{"type": "ACT", "content": {"tool": "get_forecast", "args": ["dhaka"]}}"#,
            r#"{"type": "OUTPUT", "content": "Cannot help."}"#,
        ]);
        let agent = agent(provider.clone(), 10);

        let mut transcript = agent.transcript_for("forecast please");
        let outcome = agent.run(&mut transcript).await.unwrap();

        assert_eq!(outcome.answer(), Some("Cannot help."));
        let observation = Step::parse(&transcript.messages()[3].content).unwrap();
        assert_eq!(observation, Step::Observe("Unknown tool: get_forecast".into()));
    }

    #[tokio::test]
    async fn test_failing_tool_never_terminates_run() {
        let provider = ScriptedProvider::new(&[
            r#"{"type": "ACT", "content": {"tool": "get_weather", "args": [""]}}"#,
            r#"{"type": "OUTPUT", "content": "I need a location."}"#,
        ]);
        let agent = agent(provider.clone(), 10);

        let mut transcript = agent.transcript_for("weather in?");
        let outcome = agent.run(&mut transcript).await.unwrap();

        assert_eq!(outcome.answer(), Some("I need a location."));
        let Step::Observe(content) = Step::parse(&transcript.messages()[3].content).unwrap() else {
            panic!("expected observation");
        };
        assert!(content.starts_with("Error:"));
        assert!(content.contains("Location is required to get the weather."));
    }

    #[tokio::test]
    async fn test_budget_exhaustion_issues_no_further_requests() {
        let provider = ScriptedProvider::new(&[
            r#"{"type": "PLAN", "content": "Still planning."}"#,
            r#"{"type": "PLAN", "content": "Still planning."}"#,
            r#"{"type": "PLAN", "content": "Still planning."}"#,
        ]);
        let agent = agent(provider.clone(), 3);

        let outcome = agent.ask("never answer").await.unwrap();
        assert_eq!(outcome, RunOutcome::OutOfBudget { iterations: 3 });
        assert_eq!(outcome.answer(), None);
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_malformed_reply_grows_transcript_without_acting() {
        let provider = ScriptedProvider::new(&[
            "The weather is nice, I think?",
            r#"{"type": "OUTPUT", "content": "Recovered."}"#,
        ]);
        let agent = agent(provider.clone(), 10);

        let mut transcript = agent.transcript_for("hi");
        let outcome = agent.run(&mut transcript).await.unwrap();

        assert_eq!(outcome.answer(), Some("Recovered."));
        // Malformed reply was still appended; no observation was produced.
        assert_eq!(transcript.len(), 4);
        assert_eq!(transcript.messages()[2].content, "The weather is nice, I think?");
    }

    #[tokio::test]
    async fn test_malformed_reply_consumes_an_iteration_slot() {
        let provider = ScriptedProvider::new(&["garbage"]);
        let agent = agent(provider.clone(), 1);

        let outcome = agent.ask("hi").await.unwrap();
        assert_eq!(outcome, RunOutcome::OutOfBudget { iterations: 1 });
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_run_requires_seeded_transcript() {
        let provider = ScriptedProvider::new(&[]);
        let agent = agent(provider, 1);

        let mut transcript = Transcript::new();
        transcript.push(Message::user("no system prompt"));
        let err = agent.run(&mut transcript).await.unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        // Empty script would panic on complete; use a failing provider instead.
        struct DownProvider;

        #[async_trait]
        impl LlmProvider for DownProvider {
            async fn info(&self) -> Result<ProviderInfo> {
                Err(AgentError::ProviderUnavailable("down".into()))
            }
            async fn health_check(&self) -> Result<bool> {
                Ok(false)
            }
            async fn complete(
                &self,
                _messages: &[Message],
                _options: &GenerationOptions,
            ) -> Result<Completion> {
                Err(AgentError::ProviderUnavailable("connection refused".into()))
            }
            async fn complete_stream(
                &self,
                _messages: &[Message],
                _options: &GenerationOptions,
            ) -> Result<CompletionStream> {
                Err(AgentError::ProviderUnavailable("connection refused".into()))
            }
            async fn list_models(&self) -> Result<Vec<ModelInfo>> {
                Ok(vec![])
            }
        }

        let agent = AgentBuilder::new()
            .provider(Arc::new(DownProvider))
            .build()
            .unwrap();
        let err = agent.ask("hi").await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_system_prompt_includes_tool_section() {
        let provider = ScriptedProvider::new(&[]);
        let agent = agent(provider, 1);

        let transcript = agent.transcript_for("hi");
        let system = &transcript.messages()[0].content;
        assert!(system.contains("START, PLAN, ACT, OBSERVE, and OUTPUT"));
        assert!(system.contains("get_weather(location: string)"));
        assert_eq!(transcript.messages()[1].content, "hi");
    }

    #[test]
    fn test_builder_requires_provider() {
        assert!(AgentBuilder::new().build().is_err());
    }

    #[test]
    fn test_builder_rejects_duplicate_tools() {
        let provider = ScriptedProvider::new(&[]);
        let result = AgentBuilder::new()
            .provider(provider)
            .tool(StubWeatherTool)
            .tool(StubWeatherTool)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_outcome_accessor() {
        assert_eq!(RunOutcome::Answer("x".into()).answer(), Some("x"));
        assert_eq!(RunOutcome::OutOfBudget { iterations: 10 }.answer(), None);
    }
}
