//! # Node Runtime Library
//!
//! This library exposes the internal modules of the node runtime for testing.
//! The main entry point is the `main.rs` binary.
//!
//! - `config` - runtime configuration from the environment and TOML
//! - `driver` - one tokio task per session over the loopback hub

#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_lines)]

pub mod config;
pub mod driver;

pub use config::{RuntimeConfig, RuntimeConfigError};
pub use driver::{ChannelSink, Delivery, DriverError, NodeHandle, Swarm};
