//! # Wire Protocol
//!
//! Messages exchanged between nodes over the transport. Each is a JSON object
//! tagged with `type`:
//!
//! | type | fields | direction |
//! |---|---|---|
//! | `join` | `peerId` | Joiner → Coordinator |
//! | `pair` | `partnerPeerId`, `members` | Coordinator → Joiner |
//! | `pair-ack` | `peerId` | Joiner → Coordinator |
//! | `message` | `messages`, `from` | either direction, relayed |

use crate::entities::{Message, NodeId};
use serde::{Deserialize, Serialize};

/// A protocol message as it travels between nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WireMessage {
    /// Request to enter the coordinator's lobby.
    Join {
        #[serde(rename = "peerId")]
        peer_id: NodeId,
    },
    /// Lobby sealed; `members` lists it in join order, slot 0 being the
    /// coordinator. Older peers omit `members`, in which case the only
    /// partner is `partner_peer_id`.
    Pair {
        #[serde(rename = "partnerPeerId")]
        partner_peer_id: NodeId,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        members: Vec<NodeId>,
    },
    /// The joiner has recorded the pairing.
    PairAck {
        #[serde(rename = "peerId")]
        peer_id: NodeId,
    },
    /// Chat payload.
    Message(MessageEnvelope),
}

impl WireMessage {
    /// The `type` discriminator as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::Join { .. } => "join",
            WireMessage::Pair { .. } => "pair",
            WireMessage::PairAck { .. } => "pair-ack",
            WireMessage::Message(_) => "message",
        }
    }
}

/// Chat envelope. Relayed unmodified, so `from` stays the original sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub messages: Vec<Message>,
    pub from: NodeId,
}

impl MessageEnvelope {
    pub fn single(message: Message, from: NodeId) -> Self {
        Self {
            messages: vec![message],
            from,
        }
    }
}
