//! Integration test utilities for the gateway client
//!
//! An in-process fake gateway stands in for the WebSocket server so the
//! full session lifecycle can be scripted frame by frame.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
