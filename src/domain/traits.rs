//! # Domain Traits
//!
//! Abstract interfaces for the messaging session and for command handlers.
//! Allows for pluggable implementations in the Infrastructure and Interface layers.

use anyhow::Result;
use async_trait::async_trait;

use crate::application::context::InvocationContext;
use crate::domain::types::{GroupMetadata, MessageKey};

/// Per-send options.
#[derive(Debug, Clone, Copy, Default)]
pub struct SendOptions<'a> {
    /// Message the reply quotes.
    pub quoted: Option<&'a MessageKey>,
}

impl<'a> SendOptions<'a> {
    pub fn quoting(key: &'a MessageKey) -> Self {
        Self { quoted: Some(key) }
    }
}

/// Abstract interface for a messaging session (e.g. a WhatsApp Web sidecar).
#[async_trait]
pub trait Session: Send + Sync {
    /// Send a text message to a chat, returning the new message id.
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        options: SendOptions<'_>,
    ) -> Result<String>;

    /// Fetch the participant list (with admin roles) of a group chat.
    async fn group_metadata(&self, chat_id: &str) -> Result<GroupMetadata>;

    /// Remove participants from a group chat.
    async fn remove_participants(&self, chat_id: &str, participants: &[String]) -> Result<()>;

    /// Identifier of the logged-in account, possibly carrying a device suffix.
    fn own_id(&self) -> Option<String>;
}

/// The execute operation of a command.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(&self, ctx: &InvocationContext<'_>) -> Result<()>;
}
