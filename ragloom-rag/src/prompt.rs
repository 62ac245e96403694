//! Prompt templates with `{name}` placeholders.

use std::collections::HashMap;

use ragloom_model::Message;

use crate::error::{RagError, Result};

/// System instruction used when none is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an intelligent question-answering assistant. \
Answer the question using the context provided below. If the context does not contain the \
relevant information, say clearly that you do not know and do not make up an answer.";

/// User turn combining the formatted context with the question.
pub const DEFAULT_USER_TEMPLATE: &str = "Context:\n{context_str}\n---\nQuestion: {query}";

/// A string with `{name}` placeholders. `{{` and `}}` render literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self { template: template.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Substitute every placeholder from `vars`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Template`] for a placeholder with no value or an
    /// unclosed `{`.
    pub fn render(&self, vars: &HashMap<&str, &str>) -> Result<String> {
        let mut out = String::with_capacity(self.template.len());
        let mut chars = self.template.chars().peekable();

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
                                return Err(RagError::Template(format!(
                                    "unclosed placeholder '{{{name}'"
                                )));
                            }
                        }
                    }
                    let value = vars.get(name.trim()).ok_or_else(|| {
                        RagError::Template(format!("missing value for placeholder '{name}'"))
                    })?;
                    out.push_str(value);
                }
                other => out.push(other),
            }
        }
        Ok(out)
    }
}

/// Renders a system instruction, prior turns and a templated user turn into
/// chat messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPrompt {
    system: PromptTemplate,
    user: PromptTemplate,
}

impl Default for ChatPrompt {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT, DEFAULT_USER_TEMPLATE)
    }
}

impl ChatPrompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self { system: PromptTemplate::new(system), user: PromptTemplate::new(user) }
    }

    /// Keep the default user turn and replace the system instruction.
    pub fn with_system(system: impl Into<String>) -> Self {
        Self::new(system, DEFAULT_USER_TEMPLATE)
    }

    pub fn format(&self, vars: &HashMap<&str, &str>) -> Result<Vec<Message>> {
        self.format_with_history(vars, &[])
    }

    /// Like [`format`](Self::format), with `history` placed between the
    /// system instruction and the new user turn.
    pub fn format_with_history(
        &self,
        vars: &HashMap<&str, &str>,
        history: &[Message],
    ) -> Result<Vec<Message>> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.system.render(vars)?));
        messages.extend_from_slice(history);
        messages.push(Message::user(self.user.render(vars)?));
        Ok(messages)
    }
}
