//! Integration test utilities for the trickle client
//!
//! This crate provides a scriptable in-process gateway for running
//! end-to-end tests against the WebSocket client.

pub mod fixtures;

pub use helpers::*;
pub use fixtures::*;
