//! # Parsing Utils
//!
//! Extracts the text body from an inbound envelope and splits prefixed
//! command invocations into a name and positional arguments.

use crate::domain::types::{Envelope, MessageContent};

/// A prefixed invocation: lower-cased command name plus raw arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<String>,
}

/// Text carried by the envelope, or `""` when there is none.
pub fn extract_body(envelope: &Envelope) -> &str {
    let text = match &envelope.message {
        Some(MessageContent::Conversation { text }) => Some(text.as_str()),
        Some(MessageContent::ExtendedText { text }) => Some(text.as_str()),
        Some(MessageContent::Image { caption }) => caption.as_deref(),
        Some(MessageContent::Video { caption }) => caption.as_deref(),
        Some(MessageContent::Other) | None => None,
    };
    text.unwrap_or("")
}

/// `None` unless `body` starts with `prefix` (case-sensitive).
pub fn parse_command(body: &str, prefix: &str) -> Option<ParsedCommand> {
    let rest = body.strip_prefix(prefix)?;
    let mut tokens = rest.split_whitespace();
    let name = tokens.next().unwrap_or("").to_lowercase();
    let args = tokens.map(str::to_string).collect();
    Some(ParsedCommand { name, args })
}
