//! # Dispatcher
//!
//! Routes incoming messages to the registered command handlers.
//! Parses the prefixed body, looks the command up, builds the invocation
//! context, applies the permission gate and runs the handler. Every failure
//! is contained to the message that caused it.

use anyhow::{Context, Result, anyhow};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::application::context::InvocationContext;
use crate::application::parsing::{ParsedCommand, extract_body, parse_command};
use crate::application::permissions::{Denial, Standing, authorize};
use crate::application::registry::CommandRegistry;
use crate::domain::command::CommandDescriptor;
use crate::domain::config::AppConfig;
use crate::domain::traits::{SendOptions, Session};
use crate::domain::types::{Envelope, UpsertKind};
use crate::strings::{logs, messages};

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    NotCommand,
    UnknownCommand(String),
    Denied(Denial),
    Executed,
    Failed,
}

pub struct Dispatcher {
    config: Arc<AppConfig>,
    registry: Arc<CommandRegistry>,
    session: Arc<dyn Session>,
}

impl Dispatcher {
    pub fn new(
        config: Arc<AppConfig>,
        registry: Arc<CommandRegistry>,
        session: Arc<dyn Session>,
    ) -> Self {
        Self {
            config,
            registry,
            session,
        }
    }

    /// Spawns one task per live message that did not come from the bot itself.
    /// History replays (`append`) are skipped.
    pub fn handle_upsert(
        self: &Arc<Self>,
        kind: UpsertKind,
        messages: Vec<Envelope>,
    ) -> Vec<JoinHandle<DispatchOutcome>> {
        if kind != UpsertKind::Notify {
            return Vec::new();
        }
        messages
            .into_iter()
            .filter(|m| !m.key.from_me)
            .map(|message| {
                let dispatcher = Arc::clone(self);
                tokio::spawn(async move { dispatcher.handle(&message).await })
            })
            .collect()
    }

    pub async fn handle(&self, envelope: &Envelope) -> DispatchOutcome {
        let body = extract_body(envelope);
        let Some(parsed) = parse_command(body, &self.config.bot.prefix) else {
            return DispatchOutcome::NotCommand;
        };

        let Some(command) = self.registry.lookup(&parsed.name) else {
            tracing::debug!("{}", logs::unknown_command(&parsed.name, envelope.chat_id()));
            return DispatchOutcome::UnknownCommand(parsed.name);
        };

        tracing::debug!(
            "{}",
            logs::dispatching(&command.name, &parsed.args, envelope.chat_id(), envelope.sender())
        );

        match self.run(&command, envelope, parsed).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    "{}",
                    logs::dispatch_failed(&command.name, envelope.chat_id(), &format!("{e:#}"))
                );
                self.send_error_notice(envelope).await;
                DispatchOutcome::Failed
            }
        }
    }

    async fn run(
        &self,
        command: &CommandDescriptor,
        envelope: &Envelope,
        parsed: ParsedCommand,
    ) -> Result<DispatchOutcome> {
        let ctx = InvocationContext::build(
            self.session.as_ref(),
            envelope,
            &self.config,
            &self.registry,
            parsed,
        )
        .await?;

        if let Err(denial) = authorize(&command.restrictions, Standing::from(&ctx)) {
            tracing::info!(
                "{}",
                logs::command_denied(&ctx.command, &ctx.sender, &format!("{denial:?}"))
            );
            ctx.reply(denial.message())
                .await
                .context("Failed to send denial")?;
            return Ok(DispatchOutcome::Denied(denial));
        }

        match AssertUnwindSafe(command.handler.execute(&ctx))
            .catch_unwind()
            .await
        {
            Ok(result) => result?,
            Err(_) => return Err(anyhow!("command '{}' panicked", command.name)),
        }
        Ok(DispatchOutcome::Executed)
    }

    async fn send_error_notice(&self, envelope: &Envelope) {
        if let Err(e) = self
            .session
            .send_message(
                envelope.chat_id(),
                messages::COMMAND_FAILED,
                SendOptions::quoting(&envelope.key),
            )
            .await
        {
            tracing::error!("{}", logs::error_notice_failed(envelope.chat_id(), &format!("{e:#}")));
        }
    }
}
