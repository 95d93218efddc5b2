//! # Help Text
//!
//! Formatting of the command menu.

pub fn menu_header(bot: &str) -> String {
    format!("*{bot}* commands:\n")
}

pub fn menu_line(prefix: &str, name: &str, aliases: &[String], description: &str) -> String {
    let mut line = format!("• {prefix}{name}");
    if !aliases.is_empty() {
        line.push_str(&format!(" ({})", aliases.join(", ")));
    }
    if !description.is_empty() {
        line.push_str(&format!(" - {description}"));
    }
    line
}

pub const MENU_EMPTY: &str = "No commands are loaded.";
