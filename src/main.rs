//! # Main Entry Point
//!
//! Initializes the bot:
//! - Domain: Configuration, Types, Traits
//! - Application: Registry, Parser, Context, Permissions, Dispatcher, Store
//! - Infrastructure: Sidecar session bridge
//! - Interface: Built-in commands and command manifests
//!

mod application;
mod domain;
mod infrastructure;
mod interface;
mod strings;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

use crate::application::dispatcher::Dispatcher;
use crate::application::registry::{CommandRegistry, CommandSource};
use crate::application::store::MessageStore;
use crate::domain::config::AppConfig;
use crate::infrastructure::bridge::{BridgeExit, BridgeRunner, BridgeSession};
use crate::infrastructure::sidecar;
use crate::interface::commands::BuiltinSource;
use crate::interface::manifests::ManifestDirSource;
use crate::strings::logs;

#[derive(Debug, Parser)]
#[command(name = "dispatchbot", version, about = "Prefix-command bot for WhatsApp")]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "data/config.yaml")]
    config: PathBuf,

    /// Override `commands.dir` from the configuration.
    #[arg(long)]
    commands_dir: Option<PathBuf>,

    /// Only log to the session log file.
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Mode {
    /// Connect and answer commands (default).
    Run,
    /// Load the commands, print them and exit.
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let started = Instant::now();

    // 1. Load Configuration
    let mut config = AppConfig::load(&cli.config)?;
    if let Some(dir) = &cli.commands_dir {
        config.commands.dir = dir.clone();
    }
    let config = Arc::new(config);

    // 2. Logging Setup
    let _guard = init_logging(&config, cli.quiet)?;
    tracing::info!("{}", logs::SESSION_STARTING);
    if config.bot.owner_number.is_empty() {
        tracing::warn!("{}", logs::OWNER_NUMBER_UNSET);
    }

    // 3. Command Registry
    let builtins = BuiltinSource::new(started);
    let manifests = ManifestDirSource::new(&config.commands.dir);
    let mut sources: Vec<&dyn CommandSource> = Vec::new();
    if config.commands.builtins {
        sources.push(&builtins);
    }
    sources.push(&manifests);
    let registry = Arc::new(CommandRegistry::load(&sources));
    if registry.is_empty() {
        tracing::warn!("{}", logs::NO_COMMANDS);
    }

    if let Some(Mode::Check) = cli.mode {
        print_commands(&config, &registry);
        return Ok(());
    }

    // 4. Message Store
    let store = Arc::new(MessageStore::load(
        &config.session.store_path,
        config.session.store_capacity,
    ));
    let snapshots =
        store.spawn_snapshots(Duration::from_secs(config.session.snapshot_interval_secs.max(1)));

    // 5. Session Bridge
    let (reader, writer, _child): (
        Box<dyn AsyncRead + Send + Unpin>,
        Box<dyn AsyncWrite + Send + Unpin>,
        Option<tokio::process::Child>,
    ) = match &config.session.sidecar {
        Some(sidecar_config) => {
            let process = sidecar::spawn(sidecar_config)?;
            (
                Box::new(process.stdout),
                Box::new(process.stdin),
                Some(process.child),
            )
        }
        None => (
            Box::new(tokio::io::stdin()),
            Box::new(tokio::io::stdout()),
            None,
        ),
    };

    let session = Arc::new(BridgeSession::new(writer));
    let dispatcher = Arc::new(Dispatcher::new(
        config.clone(),
        registry.clone(),
        session.clone(),
    ));
    let runner = BridgeRunner {
        session,
        dispatcher,
        store: store.clone(),
        pairing_phone: Some(config.bot.owner_number.clone()),
        pairing_delay: Duration::from_secs(config.session.pairing_delay_secs),
    };

    // 6. Event Loop
    tokio::select! {
        result = runner.run(BufReader::new(reader)) => {
            match result {
                Ok(BridgeExit::LoggedOut) => tracing::error!("{}", logs::LOGGED_OUT),
                Ok(BridgeExit::Closed) => {}
                Err(e) => tracing::error!("{}", logs::bridge_failed(&format!("{e:#}"))),
            }
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                tracing::error!("{}", logs::signal_failed(&e.to_string()));
            }
        }
    }

    tracing::info!("{}", logs::SHUTDOWN);
    snapshots.abort();
    let store_path = config.session.store_path.display().to_string();
    match store.snapshot().await {
        Ok(()) => tracing::info!("{}", logs::store_saved(&store_path, store.len().await)),
        Err(e) => tracing::warn!("{}", logs::store_snapshot_failed(&store_path, &format!("{e:#}"))),
    }

    Ok(())
}

/// File layer (always) plus a console layer on stderr. stdout may carry the
/// bridge protocol, so it is never used for logs.
fn init_logging(
    config: &AppConfig,
    quiet: bool,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let log_dir = &config.logging.dir;
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create {}", log_dir.display()))?;
    }

    // Clear previous session log
    let log_path = log_dir.join(&config.logging.file);
    if log_path.exists() {
        let _ = fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, &config.logging.file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.filter));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);

    let console_layer = if quiet {
        None
    } else {
        Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(guard)
}

fn print_commands(config: &AppConfig, registry: &CommandRegistry) {
    let flag = |on: bool, name: &'static str| if on { name } else { "" };
    for command in registry.commands() {
        let r = command.restrictions;
        let tags: Vec<&str> = [
            flag(r.group_only, "group"),
            flag(r.admin_only, "admin"),
            flag(r.owner_only, "owner"),
            flag(r.bot_admin, "bot-admin"),
        ]
        .into_iter()
        .filter(|t| !t.is_empty())
        .collect();
        println!(
            "{}{:<12} aliases=[{}] restrictions=[{}]",
            config.bot.prefix,
            command.name,
            command.aliases.join(", "),
            tags.join(", ")
        );
    }
    println!("{} commands, {} names and aliases", registry.commands().count(), registry.len());
}
