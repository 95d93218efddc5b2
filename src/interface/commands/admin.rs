//! # Moderation Commands
//!
//! Handles `kick`: removes the listed members from the current group.
//! Admins and the bot itself are never removed.

use crate::application::context::InvocationContext;
use crate::domain::command::{CommandModule, Restrictions};
use crate::domain::traits::CommandHandler;
use crate::domain::types::{USER_SERVER, normalize_jid};
use crate::strings::messages;
use anyhow::Result;
use async_trait::async_trait;

pub fn kick() -> CommandModule {
    CommandModule::new("kick", Kick)
        .aliases(&["remove"])
        .description("Remove members from the group")
        .restricted(Restrictions::none().group_only().admin_only().bot_admin())
}

struct Kick;

#[async_trait]
impl CommandHandler for Kick {
    async fn execute(&self, ctx: &InvocationContext<'_>) -> Result<()> {
        if ctx.args.is_empty() {
            ctx.reply(messages::KICK_USAGE).await?;
            return Ok(());
        }

        let own = ctx.session.own_id().map(|id| normalize_jid(&id));
        let members: Vec<String> = ctx
            .group
            .iter()
            .flat_map(|g| g.participants.iter())
            .map(|p| normalize_jid(&p.id))
            .collect();

        let mut targets: Vec<String> = Vec::new();
        for jid in ctx.args.iter().filter_map(|a| target_jid(a)) {
            let protected = ctx.group_admins.contains(&jid) || own.as_deref() == Some(jid.as_str());
            if !protected && members.contains(&jid) && !targets.contains(&jid) {
                targets.push(jid);
            }
        }

        if targets.is_empty() {
            ctx.reply(messages::KICK_NOTHING).await?;
            return Ok(());
        }

        ctx.session.remove_participants(&ctx.chat_id, &targets).await?;
        ctx.reply(&messages::kicked(targets.len())).await?;
        Ok(())
    }
}

/// `@966500000000`, `+966 500…` or a full id, as a user identifier.
fn target_jid(arg: &str) -> Option<String> {
    if arg.contains('@') && !arg.starts_with('@') {
        return Some(normalize_jid(arg));
    }
    let digits: String = arg.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        None
    } else {
        Some(format!("{digits}@{USER_SERVER}"))
    }
}
