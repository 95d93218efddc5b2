//! # Infrastructure Layer
//!
//! Handles interactions with external systems and services.
//! Implements the `Session` trait from the Domain layer over a sidecar bridge.

pub mod bridge;
pub mod sidecar;
