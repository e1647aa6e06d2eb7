//! # Adapters
//!
//! Concrete implementations of the outbound ports.
//!
//! - `time` - system and manual clocks
//! - `config` - static and TOML configuration providers
//! - `loopback` - in-process transport, directory and scheduler

pub mod config;
pub mod loopback;
pub mod time;

pub use config::StaticConfigProvider;
#[cfg(feature = "config-file")]
pub use config::TomlConfigProvider;
pub use loopback::{InputSink, LoopbackNetwork, LoopbackPort, PEER_UNAVAILABLE};
pub use time::{ManualClock, SystemTimeSource};
