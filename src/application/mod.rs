//! # Application Layer
//!
//! Contains the core logic and orchestration of the bot.
//! This includes the command registry, message parsing, the invocation
//! context, the permission gate, the dispatcher and the message store.

pub mod context;
pub mod dispatcher;
pub mod parsing;
pub mod permissions;
pub mod registry;
pub mod store;
