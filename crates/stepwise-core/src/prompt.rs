//! Prompt Templates
//!
//! Message sequences with `{placeholder}` substitution, rendered against a
//! variable list. `{{` and `}}` escape literal braces; an unbound or
//! unterminated placeholder is an error.

use crate::error::{AgentError, Result};
use crate::message::{Message, Role};

/// Substitute `{name}` placeholders in a single template string.
pub fn format_template(template: &str, vars: &[(&str, &str)]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => name.push(ch),
                        None => {
                            return Err(AgentError::Template(format!(
                                "unterminated placeholder: {{{name}"
                            )));
                        }
                    }
                }
                let value = vars
                    .iter()
                    .find(|(k, _)| *k == name)
                    .map(|(_, v)| *v)
                    .ok_or_else(|| {
                        AgentError::Template(format!("unbound placeholder: {name}"))
                    })?;
                out.push_str(value);
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

/// A reusable prompt: role-tagged template messages.
///
/// ```rust,ignore
/// let prompt = PromptTemplate::from_messages(vec![
///     (Role::System, "You are a world class technical documentation writer."),
///     (Role::User, "{input}"),
/// ]);
/// let messages = prompt.render(&[("input", "What is a transcript?")])?;
/// ```
#[derive(Clone, Debug)]
pub struct PromptTemplate {
    segments: Vec<(Role, String)>,
}

impl PromptTemplate {
    /// Template with a single user message
    pub fn from_template(template: impl Into<String>) -> Self {
        Self {
            segments: vec![(Role::User, template.into())],
        }
    }

    /// Template from role-tagged message templates
    pub fn from_messages<S: Into<String>>(messages: Vec<(Role, S)>) -> Self {
        Self {
            segments: messages.into_iter().map(|(r, s)| (r, s.into())).collect(),
        }
    }

    /// Render every segment against the variable list
    pub fn render(&self, vars: &[(&str, &str)]) -> Result<Vec<Message>> {
        self.segments
            .iter()
            .map(|(role, template)| {
                Ok(Message::new(role.clone(), format_template(template, vars)?))
            })
            .collect()
    }
}
