//! # Command Registry
//!
//! Builds the name/alias → descriptor map once at startup from a set of
//! command sources. Malformed or failing candidates are logged and skipped so
//! the bot can always start, even with zero commands.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::command::{CommandDescriptor, CommandModule};
use crate::strings::logs;

/// One discovered candidate. `module` is `Err` when the candidate could not be
/// loaded at all (e.g. an unreadable manifest file).
pub struct Candidate {
    pub origin: String,
    pub module: Result<CommandModule>,
}

impl Candidate {
    pub fn loaded(origin: impl Into<String>, module: CommandModule) -> Self {
        Self {
            origin: origin.into(),
            module: Ok(module),
        }
    }

    pub fn failed(origin: impl Into<String>, error: anyhow::Error) -> Self {
        Self {
            origin: origin.into(),
            module: Err(error),
        }
    }
}

/// Somewhere commands come from.
pub trait CommandSource {
    /// Human-readable label used in log lines.
    fn label(&self) -> String;

    /// Enumerate every candidate. Fails only when the source itself is unusable.
    fn discover(&self) -> Result<Vec<Candidate>>;

    /// Create whatever the source expects to exist, after `discover` failed.
    fn ensure_location(&self) -> Result<()> {
        Ok(())
    }
}

pub struct CommandRegistry {
    entries: HashMap<String, Arc<CommandDescriptor>>,
    ordered: Vec<Arc<CommandDescriptor>>,
}

impl CommandRegistry {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
            ordered: Vec::new(),
        }
    }

    /// Load every source in order. Never fails.
    pub fn load(sources: &[&dyn CommandSource]) -> Self {
        let mut registry = Self::empty();
        for source in sources {
            registry.load_source(*source);
        }
        tracing::info!("{}", logs::registry_ready(registry.ordered.len(), registry.entries.len()));
        registry
    }

    fn load_source(&mut self, source: &dyn CommandSource) {
        let candidates = match source.discover() {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::error!("{}", logs::source_read_failed(&source.label(), &format!("{e:#}")));
                match source.ensure_location() {
                    Ok(()) => tracing::info!("{}", logs::source_created(&source.label())),
                    Err(e) => tracing::error!(
                        "{}",
                        logs::source_create_failed(&source.label(), &format!("{e:#}"))
                    ),
                }
                return;
            }
        };

        for candidate in candidates {
            let module = match candidate.module {
                Ok(module) => module,
                Err(e) => {
                    tracing::error!("{}", logs::command_load_failed(&candidate.origin, &format!("{e:#}")));
                    continue;
                }
            };
            match module.into_descriptor() {
                Ok(descriptor) => self.register(descriptor),
                Err(missing) => {
                    tracing::warn!(
                        "{}",
                        logs::command_invalid(&candidate.origin, &missing.to_string())
                    );
                }
            }
        }
    }

    /// Insert under the lowercase name and every lowercase alias. Later
    /// registrations win on collision.
    fn register(&mut self, descriptor: CommandDescriptor) {
        let descriptor = Arc::new(descriptor);
        let keys = std::iter::once(&descriptor.name).chain(descriptor.aliases.iter());
        for key in keys {
            let key = key.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            if let Some(previous) = self.entries.insert(key.clone(), descriptor.clone()) {
                if !Arc::ptr_eq(&previous, &descriptor) {
                    tracing::warn!("{}", logs::command_collision(&key, &previous.name, &descriptor.name));
                }
            }
        }
        self.ordered.push(descriptor.clone());
        tracing::info!("{}", logs::command_loaded(&descriptor.name));
    }

    /// Case-insensitive exact match on name or alias.
    pub fn lookup(&self, name: &str) -> Option<Arc<CommandDescriptor>> {
        self.entries.get(&name.to_lowercase()).cloned()
    }

    /// Number of lookup keys (names plus aliases).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct commands still reachable by at least one key, in load order.
    pub fn commands(&self) -> impl Iterator<Item = &Arc<CommandDescriptor>> {
        self.ordered
            .iter()
            .filter(|d| self.entries.values().any(|e| Arc::ptr_eq(e, d)))
    }
}
