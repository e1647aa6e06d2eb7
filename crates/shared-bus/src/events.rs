//! # Session Events
//!
//! Everything a rendezvous session reports to its observers.

use serde::{Deserialize, Serialize};
use shared_types::entities::{DiagnosticEntry, Message, NodeId, NodeRole};

/// Events published by a session.
///
/// Every variant carries the `node` that emitted it, so one bus can serve a
/// whole swarm of sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    // =========================================================================
    // STATUS
    // =========================================================================
    /// The user-visible status line changed.
    StatusChanged { node: NodeId, status: String },

    // =========================================================================
    // DIAGNOSTICS
    // =========================================================================
    /// An entry was appended to the diagnostic trail.
    Log { node: NodeId, entry: DiagnosticEntry },

    // =========================================================================
    // CHAT
    // =========================================================================
    /// A message not seen before was merged into the message log.
    MessageReceived { node: NodeId, message: Message },

    // =========================================================================
    // PAIRING
    // =========================================================================
    /// Role or partner set changed.
    RoleChanged {
        node: NodeId,
        role: NodeRole,
        partners: Vec<NodeId>,
    },

    /// Lobby membership changed on a coordinator.
    LobbyChanged {
        node: NodeId,
        members: Vec<NodeId>,
        capacity: usize,
        sealed: bool,
    },
}

impl SessionEvent {
    /// Get the topic this event belongs to.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::StatusChanged { .. } => EventTopic::Status,
            Self::Log { .. } => EventTopic::Diagnostics,
            Self::MessageReceived { .. } => EventTopic::Chat,
            Self::RoleChanged { .. } | Self::LobbyChanged { .. } => EventTopic::Pairing,
        }
    }

    /// The node that emitted this event.
    #[must_use]
    pub fn source_node(&self) -> &NodeId {
        match self {
            Self::StatusChanged { node, .. }
            | Self::Log { node, .. }
            | Self::MessageReceived { node, .. }
            | Self::RoleChanged { node, .. }
            | Self::LobbyChanged { node, .. } => node,
        }
    }
}

/// Event topics for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    Status,
    Diagnostics,
    Chat,
    Pairing,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Source nodes to include. Empty means all nodes.
    pub nodes: Vec<NodeId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            nodes: Vec::new(),
        }
    }

    /// Create a filter for events from specific nodes.
    #[must_use]
    pub fn from_nodes(nodes: Vec<NodeId>) -> Self {
        Self {
            topics: Vec::new(),
            nodes,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &SessionEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let source_match = self.nodes.is_empty() || self.nodes.contains(event.source_node());

        topic_match && source_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::entities::LogLevel;

    fn status(node: &str) -> SessionEvent {
        SessionEvent::StatusChanged {
            node: NodeId::from(node),
            status: "Paired!".into(),
        }
    }

    #[test]
    fn test_event_topic_mapping() {
        assert_eq!(status("a").topic(), EventTopic::Status);
        let log = SessionEvent::Log {
            node: NodeId::from("a"),
            entry: DiagnosticEntry {
                level: LogLevel::Probe,
                text: "[Auto] sweep".into(),
                at_ms: 0,
            },
        };
        assert_eq!(log.topic(), EventTopic::Diagnostics);
        assert_eq!(log.source_node(), &NodeId::from("a"));
    }

    #[test]
    fn test_filter_all() {
        assert!(EventFilter::all().matches(&status("a")));
    }

    #[test]
    fn test_filter_topics() {
        let filter = EventFilter::topics(vec![EventTopic::Chat]);
        assert!(!filter.matches(&status("a")));

        let filter = EventFilter::topics(vec![EventTopic::All]);
        assert!(filter.matches(&status("a")));
    }

    #[test]
    fn test_filter_nodes() {
        let filter = EventFilter::from_nodes(vec![NodeId::from("a")]);
        assert!(filter.matches(&status("a")));
        assert!(!filter.matches(&status("b")));
    }
}
