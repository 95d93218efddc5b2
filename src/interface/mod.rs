//! # Interface Layer
//!
//! Command sources: the compiled-in commands and the manifest directory.

pub mod commands;
pub mod manifests;
