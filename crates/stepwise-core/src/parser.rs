//! Output Parsers
//!
//! Shape raw completion text into usable values: trimmed strings,
//! comma-separated lists, or typed JSON via serde. Parsers that need the
//! model's cooperation expose format instructions for prompt injection.

use serde::de::DeserializeOwned;
use std::marker::PhantomData;

use crate::error::{AgentError, Result};

/// Remove Markdown code fences from a model reply.
///
/// Models asked for raw JSON still wrap it in ```json fences often enough
/// that every JSON-consuming path strips them first.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// Turn raw completion text into a typed value
pub trait OutputParser {
    type Output;

    /// Parse the completion text
    fn parse(&self, raw: &str) -> Result<Self::Output>;

    /// Instructions to inject into the prompt so the model produces
    /// parseable output
    fn format_instructions(&self) -> Option<String> {
        None
    }
}

/// Returns the trimmed completion text unchanged
#[derive(Clone, Copy, Debug, Default)]
pub struct StringOutputParser;

impl OutputParser for StringOutputParser {
    type Output = String;

    fn parse(&self, raw: &str) -> Result<String> {
        Ok(raw.trim().to_string())
    }
}

/// Splits the completion on commas into trimmed items
#[derive(Clone, Copy, Debug, Default)]
pub struct CommaSeparatedListParser;

impl OutputParser for CommaSeparatedListParser {
    type Output = Vec<String>;

    fn parse(&self, raw: &str) -> Result<Vec<String>> {
        Ok(raw
            .trim()
            .split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect())
    }

    fn format_instructions(&self) -> Option<String> {
        Some("Respond with a comma-separated list and nothing else.".into())
    }
}

/// Deserializes the completion as JSON into `T`, stripping code fences
pub struct JsonOutputParser<T> {
    shape: Option<String>,
    _marker: PhantomData<T>,
}

impl<T> Default for JsonOutputParser<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> JsonOutputParser<T> {
    pub fn new() -> Self {
        Self {
            shape: None,
            _marker: PhantomData,
        }
    }

    /// Describe the expected JSON shape, surfaced via format instructions
    pub fn with_shape(shape: impl Into<String>) -> Self {
        Self {
            shape: Some(shape.into()),
            _marker: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> OutputParser for JsonOutputParser<T> {
    type Output = T;

    fn parse(&self, raw: &str) -> Result<T> {
        let clean = strip_code_fences(raw);
        serde_json::from_str(&clean).map_err(|e| {
            let snippet: String = clean.chars().take(120).collect();
            AgentError::Parse(format!("{e} in completion: {snippet:?}"))
        })
    }

    fn format_instructions(&self) -> Option<String> {
        let mut instructions =
            String::from("Respond with a single JSON object and nothing else.");
        if let Some(shape) = &self.shape {
            instructions.push_str("\nUse exactly this shape:\n");
            instructions.push_str(shape);
        }
        Some(instructions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  plain  "), "plain");
    }

    #[test]
    fn test_string_parser_trims() {
        let parsed = StringOutputParser.parse("  The answer.  \n").unwrap();
        assert_eq!(parsed, "The answer.");
    }

    #[test]
    fn test_comma_separated_parser() {
        let parsed = CommaSeparatedListParser
            .parse("quick, clever,  sly ,")
            .unwrap();
        assert_eq!(parsed, vec!["quick", "clever", "sly"]);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Names {
        names: Vec<String>,
    }

    #[test]
    fn test_json_parser_with_fences() {
        let parser: JsonOutputParser<Names> = JsonOutputParser::new();
        let parsed = parser
            .parse("```json\n{\"names\": [\"Ayaan\", \"Rayan\", \"Zayan\"]}\n```")
            .unwrap();
        assert_eq!(
            parsed,
            Names {
                names: vec!["Ayaan".into(), "Rayan".into(), "Zayan".into()]
            }
        );
    }

    #[test]
    fn test_json_parser_error_carries_snippet() {
        let parser: JsonOutputParser<Names> = JsonOutputParser::new();
        let err = parser.parse("not json at all").unwrap_err();
        assert!(matches!(err, AgentError::Parse(msg) if msg.contains("not json at all")));
    }

    #[test]
    fn test_json_format_instructions_include_shape() {
        let parser: JsonOutputParser<Names> =
            JsonOutputParser::with_shape(r#"{"names": ["string"]}"#);
        let instructions = parser.format_instructions().unwrap();
        assert!(instructions.contains(r#"{"names": ["string"]}"#));
    }
}
