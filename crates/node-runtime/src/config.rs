//! # Runtime Configuration
//!
//! Protocol settings come from [`RendezvousConfig`]; the runtime adds how many
//! nodes to run and the simulated network latency.
//!
//! ## Environment
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `PC_CONFIG` | TOML file with `[rendezvous]` and `[timers]` sections |
//! | `PC_NODES` | number of sessions to run (default 2) |
//! | `PC_LOBBY_CAPACITY` | lobby size, overrides the file |
//! | `PC_LATENCY_MS` | one-way loopback latency (default 20) |

use pc_01_rendezvous::{ConfigError, RendezvousConfig};
use std::time::Duration;
use thiserror::Error;

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Protocol configuration shared by every node.
    pub rendezvous: RendezvousConfig,
    /// Sessions to run in this process.
    pub nodes: usize,
    /// One-way latency of the loopback network.
    pub latency: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            rendezvous: RendezvousConfig::default(),
            nodes: 2,
            latency: Duration::from_millis(20),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuntimeConfigError {
    #[error("{name} has invalid value {value:?}")]
    InvalidVar { name: &'static str, value: String },

    #[error("at least one node is required")]
    NoNodes,

    #[error("PC_CONFIG is set but this build has no config-file support")]
    FileUnsupported,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RuntimeConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, RuntimeConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RuntimeConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("PC_CONFIG") {
            config.rendezvous = load_file(&path)?;
        }
        if let Some(value) = lookup("PC_NODES") {
            config.nodes = parse_var("PC_NODES", value)?;
        }
        if let Some(value) = lookup("PC_LOBBY_CAPACITY") {
            config.rendezvous.lobby_capacity = parse_var("PC_LOBBY_CAPACITY", value)?;
        }
        if let Some(value) = lookup("PC_LATENCY_MS") {
            config.latency = Duration::from_millis(parse_var("PC_LATENCY_MS", value)?);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RuntimeConfigError> {
        if self.nodes == 0 {
            return Err(RuntimeConfigError::NoNodes);
        }
        self.rendezvous.validate()?;
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    name: &'static str,
    value: String,
) -> Result<T, RuntimeConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| RuntimeConfigError::InvalidVar { name, value })
}

#[cfg(feature = "config-file")]
fn load_file(path: &str) -> Result<RendezvousConfig, RuntimeConfigError> {
    use pc_01_rendezvous::{ConfigProvider, TomlConfigProvider};

    Ok(TomlConfigProvider::load(path)?.rendezvous_config())
}

#[cfg(not(feature = "config-file"))]
fn load_file(_path: &str) -> Result<RendezvousConfig, RuntimeConfigError> {
    Err(RuntimeConfigError::FileUnsupported)
}
