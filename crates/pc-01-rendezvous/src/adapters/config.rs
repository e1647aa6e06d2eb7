use crate::domain::RendezvousConfig;
use crate::ports::ConfigProvider;

// ============================================================================
// StaticConfigProvider - Hardcoded config for testing/development
// ============================================================================

/// Static configuration provider.
///
/// For file-based configuration, use `TomlConfigProvider` (feature `config-file`).
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    config: RendezvousConfig,
}

impl StaticConfigProvider {
    /// Create with the default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given config.
    #[must_use]
    pub fn with_config(mut self, config: RendezvousConfig) -> Self {
        self.config = config;
        self
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn rendezvous_config(&self) -> RendezvousConfig {
        self.config.clone()
    }
}

// ============================================================================
// TomlConfigProvider - File Config Loading (requires "config-file" feature)
// ============================================================================

#[cfg(feature = "config-file")]
mod toml_config {
    use super::*;
    use crate::domain::{ConfigError, RelayPolicy};
    use serde::Deserialize;
    use shared_types::NodeId;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;

    /// Configuration file structure.
    #[derive(Debug, Deserialize, Default)]
    struct ConfigFile {
        #[serde(default)]
        rendezvous: RendezvousSection,
        #[serde(default)]
        timers: TimersSection,
    }

    #[derive(Debug, Deserialize, Default)]
    struct RendezvousSection {
        id: Option<String>,
        node_prefix: Option<String>,
        suffix_len: Option<usize>,
        lobby_capacity: Option<usize>,
        relay_policy: Option<RelayPolicy>,
    }

    #[derive(Debug, Deserialize, Default)]
    struct TimersSection {
        election_backoff_ms: Option<u64>,
        sweep_interval_ms: Option<u64>,
        reconnect_timeout_ms: Option<u64>,
        join_timeout_ms: Option<u64>,
        pair_ack_timeout_ms: Option<u64>,
    }

    /// TOML-based configuration provider.
    ///
    /// Missing keys keep their defaults.
    ///
    /// # Config File Format
    ///
    /// ```toml
    /// [rendezvous]
    /// id = "ChainBootstrap-2025-001"
    /// node_prefix = "ChainNode-"
    /// suffix_len = 8
    /// lobby_capacity = 3
    /// relay_policy = "seen-set"
    ///
    /// [timers]
    /// election_backoff_ms = 1000
    /// sweep_interval_ms = 5000
    /// reconnect_timeout_ms = 10000
    /// join_timeout_ms = 10000
    /// pair_ack_timeout_ms = 5000
    /// ```
    #[derive(Debug, Clone)]
    pub struct TomlConfigProvider {
        config: RendezvousConfig,
    }

    impl TomlConfigProvider {
        /// Load configuration from a TOML file.
        ///
        /// # Errors
        ///
        /// Returns error if the file cannot be read, parsed or validated.
        pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
            let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
                path: path.as_ref().display().to_string(),
                error: e.to_string(),
            })?;

            Self::parse(&content)
        }

        /// Parse configuration from a TOML string.
        pub fn parse(content: &str) -> Result<Self, ConfigError> {
            let file: ConfigFile =
                toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

            let mut config = RendezvousConfig::default();
            let r = file.rendezvous;
            if let Some(id) = r.id {
                config.rendezvous_id = NodeId::new(id);
            }
            if let Some(prefix) = r.node_prefix {
                config.node_prefix = prefix;
            }
            if let Some(len) = r.suffix_len {
                config.suffix_len = len;
            }
            if let Some(capacity) = r.lobby_capacity {
                config.lobby_capacity = capacity;
            }
            if let Some(policy) = r.relay_policy {
                config.relay_policy = policy;
            }

            let t = file.timers;
            let set = |slot: &mut Duration, ms: Option<u64>| {
                if let Some(ms) = ms {
                    *slot = Duration::from_millis(ms);
                }
            };
            set(&mut config.election_backoff, t.election_backoff_ms);
            set(&mut config.sweep_interval, t.sweep_interval_ms);
            set(&mut config.reconnect_timeout, t.reconnect_timeout_ms);
            set(&mut config.join_timeout, t.join_timeout_ms);
            set(&mut config.pair_ack_timeout, t.pair_ack_timeout_ms);

            config.validate()?;
            Ok(Self { config })
        }

        pub fn config(&self) -> &RendezvousConfig {
            &self.config
        }
    }

    impl ConfigProvider for TomlConfigProvider {
        fn rendezvous_config(&self) -> RendezvousConfig {
            self.config.clone()
        }
    }

}

#[cfg(feature = "config-file")]
pub use toml_config::TomlConfigProvider;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_provider_returns_config() {
        let provider =
            StaticConfigProvider::new().with_config(RendezvousConfig::default().with_capacity(3));
        assert_eq!(provider.rendezvous_config().lobby_capacity, 3);
    }
}
