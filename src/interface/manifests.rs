//! # Command Manifests
//!
//! Scripted reply commands described by YAML files in the commands directory.
//!
//! ```yaml
//! name: rules
//! aliases: [r]
//! group_only: true
//! description: Group rules
//! reply: "Hi {sender}, the rules of {bot} are ..."
//! ```
//!
//! `reply` is the command's execute operation; a manifest without it (or
//! without a name) is rejected by the registry.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::context::InvocationContext;
use crate::application::registry::{Candidate, CommandSource};
use crate::domain::command::{CommandModule, Restrictions};
use crate::domain::traits::CommandHandler;
use crate::domain::types::bare_user;

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    description: String,
    #[serde(flatten)]
    restrictions: Restrictions,
    #[serde(default)]
    reply: Option<String>,
}

impl From<Manifest> for CommandModule {
    fn from(manifest: Manifest) -> Self {
        CommandModule {
            name: manifest.name,
            aliases: manifest.aliases,
            description: manifest.description,
            restrictions: manifest.restrictions,
            handler: manifest
                .reply
                .map(|template| Arc::new(ReplyCommand { template }) as Arc<dyn CommandHandler>),
        }
    }
}

/// Sends a fixed template with `{args}`, `{sender}`, `{bot}` and `{prefix}` filled in.
pub struct ReplyCommand {
    template: String,
}

impl ReplyCommand {
    fn render(&self, ctx: &InvocationContext<'_>) -> String {
        self.template
            .replace("{args}", &ctx.args.join(" "))
            .replace("{sender}", bare_user(&ctx.sender))
            .replace("{bot}", &ctx.config.bot.name)
            .replace("{prefix}", ctx.prefix())
    }
}

#[async_trait]
impl CommandHandler for ReplyCommand {
    async fn execute(&self, ctx: &InvocationContext<'_>) -> Result<()> {
        ctx.reply(&self.render(ctx)).await?;
        Ok(())
    }
}

/// Scans a directory for `*.yaml` / `*.yml` manifests.
pub struct ManifestDirSource {
    dir: PathBuf,
}

impl ManifestDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn load_file(path: &Path) -> Result<CommandModule> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let manifest: Manifest = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(manifest.into())
    }
}

fn is_manifest(path: &Path) -> bool {
    path.is_file()
        && matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        )
}

impl CommandSource for ManifestDirSource {
    fn label(&self) -> String {
        self.dir.display().to_string()
    }

    fn discover(&self) -> Result<Vec<Candidate>> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list {}", self.dir.display()))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_manifest(path))
            .collect();
        paths.sort();

        Ok(paths
            .into_iter()
            .map(|path| {
                let origin = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                match Self::load_file(&path) {
                    Ok(module) => Candidate::loaded(origin, module),
                    Err(e) => Candidate::failed(origin, e),
                }
            })
            .collect())
    }

    fn ensure_location(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))
    }
}
