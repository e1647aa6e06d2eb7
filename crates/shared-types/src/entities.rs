//! # Domain Entities
//!
//! Core data structures shared by the rendezvous core, the event bus and the
//! runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// IDENTITY
// =============================================================================

/// Opaque node identity.
///
/// Generated locally (fixed prefix plus random suffix) and immutable for the
/// lifetime of a process. The well-known rendezvous identity is also a
/// `NodeId`; it is simply one that every node knows in advance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Wrap an identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Message identifier, `<author>_<millis>_<suffix>`. Unique by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// CHAT
// =============================================================================

/// A chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Deduplication key.
    pub id: MessageId,
    /// Author of the message.
    pub peer_id: NodeId,
    /// Trimmed, non-empty text.
    pub text: String,
    /// Milliseconds since the Unix epoch on the author's clock.
    pub timestamp: u64,
}

// =============================================================================
// ROLES
// =============================================================================

/// Role of a node in the rendezvous protocol. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NodeRole {
    /// Endpoint not open yet, or no election attempted.
    #[default]
    Unclaimed,
    /// Holds the rendezvous identity and runs the lobby.
    Coordinator,
    /// Looking for a partner through the coordinator.
    Joiner,
    /// Member of a formed island.
    Paired,
}

impl NodeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Unclaimed => "unclaimed",
            NodeRole::Coordinator => "coordinator",
            NodeRole::Joiner => "joiner",
            NodeRole::Paired => "paired",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// DIAGNOSTICS
// =============================================================================

/// Severity of a diagnostic trail entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    /// Noteworthy protocol transition (election, pairing).
    Notice,
    /// Recoverable fault (connection lost, timeout).
    Warning,
    Error,
    /// Liveness sweep activity.
    Probe,
}

/// One line of the append-only diagnostic trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticEntry {
    pub level: LogLevel,
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub at_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_uses_camel_case_fields() {
        let msg = Message {
            id: MessageId::new("ChainNode-a_1_x"),
            peer_id: NodeId::from("ChainNode-a"),
            text: "hello".into(),
            timestamp: 1,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["peerId"], "ChainNode-a");
        assert_eq!(json["id"], "ChainNode-a_1_x");
    }

    #[test]
    fn test_node_id_ordering_is_lexicographic() {
        let mut ids = vec![NodeId::from("b"), NodeId::from("a"), NodeId::from("c")];
        ids.sort();
        assert_eq!(ids, vec![NodeId::from("a"), NodeId::from("b"), NodeId::from("c")]);
    }

    #[test]
    fn test_default_role_is_unclaimed() {
        assert_eq!(NodeRole::default(), NodeRole::Unclaimed);
        assert_eq!(NodeRole::Paired.to_string(), "paired");
    }
}
