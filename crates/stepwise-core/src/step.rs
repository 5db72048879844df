//! Step Protocol
//!
//! The JSON wire protocol the model speaks inside the loop. Every reply is
//! one tagged step object, e.g.:
//!
//! ```text
//! {"type": "START",   "content": "User has asked for the weather in Dhaka."}
//! {"type": "PLAN",    "content": "I will use the get_weather tool."}
//! {"type": "ACT",     "content": {"tool": "get_weather", "args": ["dhaka"]}}
//! {"type": "OBSERVE", "content": "15°C"}
//! {"type": "OUTPUT",  "content": "The weather in Dhaka is 15°C."}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::parser::strip_code_fences;

/// A tool invocation requested by the model.
///
/// Arguments are positional: the order matches the tool's declared
/// parameter list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier
    pub tool: String,

    /// Ordered argument list
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
}

/// One step of the agent protocol.
///
/// Closed set: anything the model sends that does not deserialize into one
/// of these variants is a parse error, retried by the driver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "UPPERCASE")]
pub enum Step {
    /// The model restates the task
    Start(String),
    /// The model announces its approach
    Plan(String),
    /// The model requests a tool invocation
    Act(ToolCall),
    /// A tool result (synthesized by the driver, or echoed by the model)
    Observe(String),
    /// The final answer; terminates the run
    Output(String),
}

impl Step {
    /// Parse a raw model reply into a step.
    ///
    /// Markdown code fences are stripped first; models constrained to JSON
    /// output still wrap replies in ```json fences occasionally.
    pub fn parse(raw: &str) -> Result<Self> {
        let clean = strip_code_fences(raw);
        serde_json::from_str(&clean).map_err(|e| {
            let snippet: String = clean.chars().take(120).collect();
            AgentError::Parse(format!("{e} in model reply: {snippet:?}"))
        })
    }

    /// Tag name of this step, as it appears on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Start(_) => "START",
            Step::Plan(_) => "PLAN",
            Step::Act(_) => "ACT",
            Step::Observe(_) => "OBSERVE",
            Step::Output(_) => "OUTPUT",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind())
    }
}
