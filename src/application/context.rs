//! # Invocation Context
//!
//! Per-message facts about the sender (group membership, admin and owner
//! status) handed to the permission gate and to the command being executed.

use anyhow::{Context, Result};
use std::collections::HashSet;

use crate::application::parsing::ParsedCommand;
use crate::application::registry::CommandRegistry;
use crate::domain::config::AppConfig;
use crate::domain::traits::{SendOptions, Session};
use crate::domain::types::{Envelope, GroupMetadata, bare_user, normalize_jid};

pub struct InvocationContext<'a> {
    pub session: &'a dyn Session,
    pub message: &'a Envelope,
    pub config: &'a AppConfig,
    pub registry: &'a CommandRegistry,
    /// Name or alias the command was invoked with, lower-cased.
    pub command: String,
    pub args: Vec<String>,
    pub chat_id: String,
    /// Participant for group chats, the chat id for direct chats.
    pub sender: String,
    pub is_group: bool,
    pub group: Option<GroupMetadata>,
    /// Normalised ids of every group admin. Empty outside groups.
    pub group_admins: HashSet<String>,
    pub is_admin: bool,
    pub is_bot_admin: bool,
    pub is_owner: bool,
}

impl<'a> InvocationContext<'a> {
    /// Fetches group metadata (groups only, once) and derives the sender facts.
    pub async fn build(
        session: &'a dyn Session,
        message: &'a Envelope,
        config: &'a AppConfig,
        registry: &'a CommandRegistry,
        parsed: ParsedCommand,
    ) -> Result<Self> {
        let chat_id = message.chat_id().to_string();
        let is_group = message.is_group();
        let group = if is_group {
            Some(
                session
                    .group_metadata(&chat_id)
                    .await
                    .with_context(|| format!("Failed to fetch group metadata for {chat_id}"))?,
            )
        } else {
            None
        };

        let facts = SenderFacts::derive(
            message,
            session.own_id().as_deref(),
            &config.bot.owner_number,
            group.as_ref(),
        );

        Ok(Self {
            session,
            message,
            config,
            registry,
            command: parsed.name,
            args: parsed.args,
            chat_id,
            sender: message.sender().to_string(),
            is_group,
            group,
            group_admins: facts.admins,
            is_admin: facts.is_admin,
            is_bot_admin: facts.is_bot_admin,
            is_owner: facts.is_owner,
        })
    }

    /// Send text to the originating chat, quoting the triggering message.
    pub async fn reply(&self, text: &str) -> Result<String> {
        self.session
            .send_message(&self.chat_id, text, SendOptions::quoting(&self.message.key))
            .await
    }

    pub fn prefix(&self) -> &str {
        &self.config.bot.prefix
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct SenderFacts {
    admins: HashSet<String>,
    is_admin: bool,
    is_bot_admin: bool,
    is_owner: bool,
}

impl SenderFacts {
    fn derive(
        message: &Envelope,
        own_id: Option<&str>,
        owner_number: &str,
        group: Option<&GroupMetadata>,
    ) -> Self {
        let sender = message.sender();
        let admins: HashSet<String> = group
            .map(|g| g.admins().map(|p| normalize_jid(&p.id)).collect())
            .unwrap_or_default();
        let is_admin = !admins.is_empty() && admins.contains(&normalize_jid(sender));
        let is_bot_admin = own_id
            .map(|id| admins.contains(&normalize_jid(id)))
            .unwrap_or(false);
        let is_owner = !owner_number.is_empty() && bare_user(sender) == owner_number;
        Self {
            admins,
            is_admin,
            is_bot_admin,
            is_owner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockSession, direct_message, group_message, group_with_admins};

    fn parsed(name: &str) -> ParsedCommand {
        ParsedCommand {
            name: name.to_string(),
            args: vec!["x".to_string()],
        }
    }

    #[tokio::test]
    async fn test_direct_chat_skips_metadata() {
        let session = MockSession::new("999:5@s.whatsapp.net");
        let config = AppConfig::for_tests("!", "111");
        let registry = CommandRegistry::empty();
        let msg = direct_message("111@s.whatsapp.net", "!ping x");

        let ctx = InvocationContext::build(&session, &msg, &config, &registry, parsed("ping"))
            .await
            .unwrap();

        assert!(!ctx.is_group);
        assert!(ctx.group.is_none());
        assert!(ctx.group_admins.is_empty());
        assert!(!ctx.is_admin);
        assert!(!ctx.is_bot_admin);
        assert!(ctx.is_owner);
        assert_eq!(ctx.sender, "111@s.whatsapp.net");
        assert_eq!(ctx.args, vec!["x"]);
        assert_eq!(session.metadata_calls(), 0);
    }

    #[tokio::test]
    async fn test_group_chat_uses_participant_as_sender() {
        let session = MockSession::new("999:5@s.whatsapp.net")
            .with_group(group_with_admins("42@g.us", &["222@s.whatsapp.net", "999@s.whatsapp.net"], &["333@s.whatsapp.net"]));
        let config = AppConfig::for_tests("!", "333");
        let registry = CommandRegistry::empty();
        let msg = group_message("42@g.us", "222:7@s.whatsapp.net", "!kick");

        let ctx = InvocationContext::build(&session, &msg, &config, &registry, parsed("kick"))
            .await
            .unwrap();

        assert!(ctx.is_group);
        assert_eq!(ctx.sender, "222:7@s.whatsapp.net");
        assert!(ctx.is_admin);
        assert!(ctx.is_bot_admin);
        assert!(!ctx.is_owner);
        assert_eq!(ctx.group_admins.len(), 2);
        assert_eq!(session.metadata_calls(), 1);
    }

    #[tokio::test]
    async fn test_group_member_is_not_admin() {
        let session = MockSession::new("999@s.whatsapp.net")
            .with_group(group_with_admins("42@g.us", &["222@s.whatsapp.net"], &["333@s.whatsapp.net"]));
        let config = AppConfig::for_tests("!", "333");
        let registry = CommandRegistry::empty();
        let msg = group_message("42@g.us", "333@s.whatsapp.net", "!kick");

        let ctx = InvocationContext::build(&session, &msg, &config, &registry, parsed("kick"))
            .await
            .unwrap();

        assert!(!ctx.is_admin);
        assert!(!ctx.is_bot_admin);
        assert!(ctx.is_owner);
    }

    #[tokio::test]
    async fn test_metadata_failure_propagates() {
        let session = MockSession::new("999@s.whatsapp.net");
        let config = AppConfig::for_tests("!", "333");
        let registry = CommandRegistry::empty();
        let msg = group_message("404@g.us", "333@s.whatsapp.net", "!kick");

        let result =
            InvocationContext::build(&session, &msg, &config, &registry, parsed("kick")).await;

        assert!(result.is_err());
    }

    #[test]
    fn test_empty_owner_number_matches_nobody() {
        let msg = direct_message("@s.whatsapp.net", "!x");
        let facts = SenderFacts::derive(&msg, None, "", None);
        assert!(!facts.is_owner);
    }
}
