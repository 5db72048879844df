//! Conversation Messages
//!
//! Standard message format exchanged with LLM providers, plus the
//! append-only transcript the loop driver threads through a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a message sender
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
    /// Tool observation (folded into a provider-compatible role at the wire)
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A single message in a transcript
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Text content
    pub content: String,

    /// Originating tool name, for `Role::Tool` messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a tool observation message
    pub fn tool(content: impl Into<String>, tool_name: Option<String>) -> Self {
        let mut msg = Self::new(Role::Tool, content);
        msg.name = tool_name;
        msg
    }
}

/// Ordered message history for one run.
///
/// Append-only: messages are never removed or edited once pushed. The
/// transcript lives exactly as long as the run that owns it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        let mut transcript = Self::new();
        transcript.push(Message::system(prompt));
        transcript
    }

    /// Append a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Whether the transcript starts with a system message
    pub fn has_system_prompt(&self) -> bool {
        self.messages.first().map(|m| &m.role) == Some(&Role::System)
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Iterate over messages in order
    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
    }

    #[test]
    fn test_tool_message_carries_name() {
        let msg = Message::tool("15°C", Some("get_weather".into()));
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.name.as_deref(), Some("get_weather"));
    }

    #[test]
    fn test_transcript_grows_monotonically() {
        let mut transcript = Transcript::with_system_prompt("You are helpful.");
        transcript.push(Message::user("Hi"));
        transcript.push(Message::assistant("Hello!"));

        assert_eq!(transcript.len(), 3);
        assert!(transcript.has_system_prompt());
        assert!(transcript.last().unwrap().role == Role::Assistant);

        let before: Vec<String> = transcript.iter().map(|m| m.content.clone()).collect();
        transcript.push(Message::user("More"));
        let after: Vec<String> = transcript.iter().map(|m| m.content.clone()).collect();
        assert_eq!(&after[..3], &before[..]);
    }
}
