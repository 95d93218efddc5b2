//! # Configuration
//!
//! Manages the loading and parsing of the application's configuration file (`config.yaml`).
//! Defines the structs for the bot identity, command sources, session bridge and logging.

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main application configuration structure.
/// Matches the layout of `data/config.yaml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub bot: BotConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Identity of the bot and the prefix it answers to.
#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    #[serde(default = "default_bot_name")]
    pub name: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Phone number of the operator. Stored as digits only.
    #[serde(default)]
    pub owner_number: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CommandsConfig {
    /// Directory scanned for command manifests.
    #[serde(default = "default_commands_dir")]
    pub dir: PathBuf,
    /// Register the compiled-in commands.
    #[serde(default = "default_true")]
    pub builtins: bool,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            dir: default_commands_dir(),
            builtins: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Sidecar process speaking the bridge protocol. When absent the bridge
    /// runs over this process' stdin/stdout.
    #[serde(default)]
    pub sidecar: Option<SidecarConfig>,
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval_secs: u64,
    #[serde(default = "default_pairing_delay")]
    pub pairing_delay_secs: u64,
    /// Messages kept per chat in the message store.
    #[serde(default = "default_store_capacity")]
    pub store_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sidecar: None,
            store_path: default_store_path(),
            snapshot_interval_secs: default_snapshot_interval(),
            pairing_delay_secs: default_pairing_delay(),
            store_capacity: default_store_capacity(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SidecarConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_log_file")]
    pub file: String,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            file: default_log_file(),
            filter: default_log_filter(),
        }
    }
}

fn default_bot_name() -> String {
    "ManusBot".to_string()
}
fn default_prefix() -> String {
    "!".to_string()
}
fn default_true() -> bool {
    true
}
fn default_commands_dir() -> PathBuf {
    PathBuf::from("data/commands")
}
fn default_store_path() -> PathBuf {
    PathBuf::from("data/session/store.json")
}
fn default_snapshot_interval() -> u64 {
    10
}
fn default_pairing_delay() -> u64 {
    3
}
fn default_store_capacity() -> usize {
    200
}
fn default_log_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_log_file() -> String {
    "session.log".to_string()
}
fn default_log_filter() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Reads, parses and validates the configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut config: AppConfig = serde_yaml::from_str(content)?;
        config.normalize()?;
        Ok(config)
    }

    fn normalize(&mut self) -> Result<()> {
        if self.bot.prefix.is_empty() {
            bail!("bot.prefix must not be empty");
        }
        let non_digits = Regex::new(r"[^0-9]")?;
        self.bot.owner_number = non_digits
            .replace_all(&self.bot.owner_number, "")
            .into_owned();
        Ok(())
    }
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests(prefix: &str, owner: &str) -> Self {
        Self {
            bot: BotConfig {
                name: "TestBot".to_string(),
                prefix: prefix.to_string(),
                owner_number: owner.to_string(),
            },
            commands: CommandsConfig::default(),
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
