//! # Help Command
//!
//! Handles `menu` (alias `help`).
//! Lists every loaded command with its aliases and description.

use crate::application::context::InvocationContext;
use crate::domain::command::CommandModule;
use crate::domain::traits::CommandHandler;
use crate::strings::help;
use anyhow::Result;
use async_trait::async_trait;

pub fn module() -> CommandModule {
    CommandModule::new("menu", Menu)
        .aliases(&["help"])
        .description("List available commands")
}

struct Menu;

#[async_trait]
impl CommandHandler for Menu {
    async fn execute(&self, ctx: &InvocationContext<'_>) -> Result<()> {
        let lines: Vec<String> = ctx
            .registry
            .commands()
            .map(|c| help::menu_line(ctx.prefix(), &c.name, &c.aliases, &c.description))
            .collect();
        let text = if lines.is_empty() {
            help::MENU_EMPTY.to_string()
        } else {
            format!("{}{}", help::menu_header(&ctx.config.bot.name), lines.join("\n"))
        };
        ctx.reply(&text).await?;
        Ok(())
    }
}
