//! # Miscellaneous Commands
//!
//! Handles `ping` and the owner-only `status`.

use crate::application::context::InvocationContext;
use crate::domain::command::{CommandModule, Restrictions};
use crate::domain::traits::CommandHandler;
use crate::strings::messages;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Instant;

pub fn ping() -> CommandModule {
    CommandModule::new("ping", Ping)
        .aliases(&["p"])
        .description("Check that the bot is alive")
}

pub fn status(started: Instant) -> CommandModule {
    CommandModule::new("status", Status { started })
        .description("Uptime and loaded commands")
        .restricted(Restrictions::none().owner_only())
}

struct Ping;

#[async_trait]
impl CommandHandler for Ping {
    async fn execute(&self, ctx: &InvocationContext<'_>) -> Result<()> {
        ctx.reply(messages::PONG).await?;
        Ok(())
    }
}

struct Status {
    started: Instant,
}

#[async_trait]
impl CommandHandler for Status {
    async fn execute(&self, ctx: &InvocationContext<'_>) -> Result<()> {
        let text = messages::status(
            &ctx.config.bot.name,
            &format_uptime(self.started.elapsed().as_secs()),
            ctx.registry.commands().count(),
        );
        ctx.reply(&text).await?;
        Ok(())
    }
}

fn format_uptime(secs: u64) -> String {
    let (days, rem) = (secs / 86_400, secs % 86_400);
    let (hours, rem) = (rem / 3_600, rem % 3_600);
    let (minutes, seconds) = (rem / 60, rem % 60);
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else {
        format!("{minutes}m {seconds}s")
    }
}
