//! # Messages
//!
//! User-facing replies sent by the dispatch pipeline and the built-in commands.

pub const GROUP_ONLY: &str = "🚫 This command only works in groups.";
pub const ADMIN_ONLY: &str = "🚫 This command is for group admins only.";
pub const OWNER_ONLY: &str = "🚫 This command is for the bot owner only.";
pub const BOT_ADMIN_REQUIRED: &str = "🚫 The bot must be a group admin to do that.";
pub const COMMAND_FAILED: &str = "❌ An error occurred while executing the command.";

pub const PONG: &str = "🏓 Pong!";
pub const KICK_USAGE: &str = "Usage: mention or list the numbers to remove.";
pub const KICK_NOTHING: &str = "Nobody to remove (admins and the bot are skipped).";

pub fn kicked(count: usize) -> String {
    format!("👋 Removed {count} participant(s).")
}

pub fn group_info(subject: &str, members: usize, admins: usize, desc: &str) -> String {
    format!("*{subject}*\nMembers: {members}\nAdmins: {admins}\n\n{desc}")
}

pub fn status(bot: &str, uptime: &str, commands: usize) -> String {
    format!("*{bot}* is running\nUptime: {uptime}\nCommands: {commands}")
}
