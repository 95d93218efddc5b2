//! # Command Descriptors
//!
//! The registered shape of a command and the raw, not yet validated module a
//! command source hands to the registry.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::domain::traits::CommandHandler;

/// Restrictions a command declares. Each one is checked independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Restrictions {
    #[serde(default)]
    pub group_only: bool,
    #[serde(default)]
    pub admin_only: bool,
    #[serde(default)]
    pub owner_only: bool,
    /// The bot account itself must be a group admin.
    #[serde(default)]
    pub bot_admin: bool,
}

impl Restrictions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn group_only(mut self) -> Self {
        self.group_only = true;
        self
    }

    pub fn admin_only(mut self) -> Self {
        self.admin_only = true;
        self
    }

    pub fn owner_only(mut self) -> Self {
        self.owner_only = true;
        self
    }

    pub fn bot_admin(mut self) -> Self {
        self.bot_admin = true;
        self
    }
}

/// A validated command. Immutable once registered.
pub struct CommandDescriptor {
    pub name: String,
    pub aliases: Vec<String>,
    pub description: String,
    pub restrictions: Restrictions,
    pub handler: Arc<dyn CommandHandler>,
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("restrictions", &self.restrictions)
            .finish_non_exhaustive()
    }
}

/// What a source produces for one candidate. Validated by the registry.
#[derive(Default)]
pub struct CommandModule {
    pub name: Option<String>,
    pub aliases: Vec<String>,
    pub description: String,
    pub restrictions: Restrictions,
    pub handler: Option<Arc<dyn CommandHandler>>,
}

impl CommandModule {
    pub fn new(name: &str, handler: impl CommandHandler + 'static) -> Self {
        Self {
            name: Some(name.to_string()),
            handler: Some(Arc::new(handler)),
            ..Default::default()
        }
    }

    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn restricted(mut self, restrictions: Restrictions) -> Self {
        self.restrictions = restrictions;
        self
    }

    /// Turn the module into a descriptor, or say which required part is missing.
    pub fn into_descriptor(self) -> Result<CommandDescriptor, MissingField> {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or(MissingField::Name)?;
        let handler = self.handler.ok_or(MissingField::Execute)?;
        Ok(CommandDescriptor {
            name,
            aliases: self.aliases,
            description: self.description,
            restrictions: self.restrictions,
            handler,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Name,
    Execute,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingField::Name => write!(f, "name"),
            MissingField::Execute => write!(f, "execute"),
        }
    }
}
