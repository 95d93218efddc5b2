//! # Group Info Command
//!
//! Handles `groupinfo`: subject, member and admin counts of the current group.

use crate::application::context::InvocationContext;
use crate::domain::command::{CommandModule, Restrictions};
use crate::domain::traits::CommandHandler;
use crate::strings::messages;
use anyhow::{Result, anyhow};
use async_trait::async_trait;

pub fn module() -> CommandModule {
    CommandModule::new("groupinfo", GroupInfo)
        .aliases(&["ginfo"])
        .description("Show details about this group")
        .restricted(Restrictions::none().group_only())
}

struct GroupInfo;

#[async_trait]
impl CommandHandler for GroupInfo {
    async fn execute(&self, ctx: &InvocationContext<'_>) -> Result<()> {
        let group = ctx
            .group
            .as_ref()
            .ok_or_else(|| anyhow!("group metadata missing for {}", ctx.chat_id))?;
        let text = messages::group_info(
            &group.subject,
            group.participants.len(),
            ctx.group_admins.len(),
            group.desc.as_deref().unwrap_or(""),
        );
        ctx.reply(text.trim_end()).await?;
        Ok(())
    }
}
