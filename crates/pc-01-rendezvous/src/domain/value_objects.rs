//! Value Objects for the rendezvous protocol

use super::errors::ConfigError;
use serde::{Deserialize, Serialize};
use shared_types::{NodeId, NodeRole};
use std::fmt;
use std::time::Duration;

/// Handle for one transport connection, assigned by the transport adapter.
///
/// Two connections between the same pair of nodes have distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Which partners an inbound chat envelope is relayed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelayPolicy {
    /// Relay every envelope not authored locally to every partner except the
    /// one it arrived from. Only loop-free for two-party islands.
    ExcludeSender,
    /// Relay only envelopes that added at least one new message to the log,
    /// and never back to the arrival partner or the original sender.
    #[default]
    SeenSet,
}

/// Configuration for a rendezvous session.
///
/// Every node of a swarm must agree on `rendezvous_id` and `lobby_capacity`;
/// the timing values are local.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendezvousConfig {
    /// Well-known name used as the meeting point (default: `ChainBootstrap-2025-001`)
    pub rendezvous_id: NodeId,
    /// Prefix of generated node identities (default: `ChainNode-`)
    pub node_prefix: String,
    /// Length of the random identity suffix (default: 8)
    pub suffix_len: usize,
    /// Lobby size including the coordinator (default: 2, minimum: 2)
    pub lobby_capacity: usize,
    /// Wait after a failed claim before joining, and after partner loss
    /// before re-electing (default: 1s)
    pub election_backoff: Duration,
    /// Period of the liveness sweep (default: 5s)
    pub sweep_interval: Duration,
    /// How long a reconnect attempt may stay unopened before the partner is
    /// considered lost (default: 10s)
    pub reconnect_timeout: Duration,
    /// How long a joiner waits for `pair` before re-electing (default: 10s)
    pub join_timeout: Duration,
    /// How long a coordinator waits for `pair-ack` from a sealed lobby
    /// (default: 5s)
    pub pair_ack_timeout: Duration,
    /// Relay discipline for inbound chat (default: `SeenSet`)
    pub relay_policy: RelayPolicy,
}

impl Default for RendezvousConfig {
    fn default() -> Self {
        Self {
            rendezvous_id: NodeId::from("ChainBootstrap-2025-001"),
            node_prefix: "ChainNode-".to_string(),
            suffix_len: 8,
            lobby_capacity: 2,
            election_backoff: Duration::from_millis(1_000),
            sweep_interval: Duration::from_millis(5_000),
            reconnect_timeout: Duration::from_millis(10_000),
            join_timeout: Duration::from_millis(10_000),
            pair_ack_timeout: Duration::from_millis(5_000),
            relay_policy: RelayPolicy::SeenSet,
        }
    }
}

impl RendezvousConfig {
    /// Create a config suitable for testing (shorter timers)
    pub fn for_testing() -> Self {
        Self {
            suffix_len: 6,
            election_backoff: Duration::from_millis(100),
            sweep_interval: Duration::from_millis(500),
            reconnect_timeout: Duration::from_millis(1_000),
            join_timeout: Duration::from_millis(1_000),
            pair_ack_timeout: Duration::from_millis(500),
            ..Self::default()
        }
    }

    /// Same config with a different lobby size.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.lobby_capacity = capacity;
        self
    }

    /// Same config with a different relay policy.
    #[must_use]
    pub fn with_relay_policy(mut self, policy: RelayPolicy) -> Self {
        self.relay_policy = policy;
        self
    }

    /// Reject configurations the protocol cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lobby_capacity < 2 {
            return Err(ConfigError::CapacityTooSmall(self.lobby_capacity));
        }
        if self.rendezvous_id.as_str().is_empty() {
            return Err(ConfigError::EmptyRendezvousId);
        }
        if self.suffix_len == 0 {
            return Err(ConfigError::Invalid("suffix_len must be at least 1".into()));
        }
        let timers = [
            ("election_backoff", self.election_backoff),
            ("sweep_interval", self.sweep_interval),
            ("reconnect_timeout", self.reconnect_timeout),
            ("join_timeout", self.join_timeout),
            ("pair_ack_timeout", self.pair_ack_timeout),
        ];
        for (name, value) in timers {
            if value.is_zero() {
                return Err(ConfigError::Invalid(format!("{name} must be non-zero")));
            }
        }
        Ok(())
    }
}

/// Point-in-time view of a session for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub node_id: NodeId,
    pub role: NodeRole,
    pub paired: bool,
    /// Partners in identity order.
    pub partners: Vec<NodeId>,
    /// Lobby members in join order; empty unless coordinating.
    pub lobby_members: Vec<NodeId>,
    /// Members (coordinator included) with a live connection.
    pub lobby_connected: usize,
    pub capacity: usize,
    pub lobby_full: bool,
    /// A connection to the rendezvous identity is open or pending.
    pub bootstrap_open: bool,
    pub status: String,
}
