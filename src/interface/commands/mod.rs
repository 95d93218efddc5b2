//! # Command Handlers
//!
//! The compiled-in commands (`ping`, `menu`, `groupinfo`, `kick`, `status`)
//! and the source that registers them.

pub mod admin;
pub mod group;
pub mod help;
pub mod misc;

use anyhow::Result;
use std::time::Instant;

use crate::application::registry::{Candidate, CommandSource};
use crate::domain::command::CommandModule;

/// Registers the built-in commands.
pub struct BuiltinSource {
    started: Instant,
}

impl BuiltinSource {
    pub fn new(started: Instant) -> Self {
        Self { started }
    }

    fn modules(&self) -> Vec<(&'static str, CommandModule)> {
        vec![
            ("builtin:ping", misc::ping()),
            ("builtin:menu", help::module()),
            ("builtin:groupinfo", group::module()),
            ("builtin:kick", admin::kick()),
            ("builtin:status", misc::status(self.started)),
        ]
    }
}

impl CommandSource for BuiltinSource {
    fn label(&self) -> String {
        "builtin".to_string()
    }

    fn discover(&self) -> Result<Vec<Candidate>> {
        Ok(self
            .modules()
            .into_iter()
            .map(|(origin, module)| Candidate::loaded(origin, module))
            .collect())
    }
}
