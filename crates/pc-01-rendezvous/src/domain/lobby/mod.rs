//! # Lobby
//!
//! Slot bookkeeping for the node holding the rendezvous identity.
//!
//! The coordinator occupies slot 0. Joiners take the next free slot in join
//! order until the lobby reaches capacity, at which point it is sealed and
//! every further join is refused. A sealed lobby completes once every joiner
//! has acknowledged its `pair` notification.
//!
//! ## Invariants
//!
//! - No identity appears twice.
//! - `members().len() <= capacity`.
//! - A sealed lobby admits nobody.
//! - A lobby left with no joiners is never sealed.

use crate::domain::value_objects::ConnectionId;
use shared_types::NodeId;

/// One occupied slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyMember {
    pub peer_id: NodeId,
    /// Connection the join arrived on. `None` for the coordinator and for
    /// acknowledged members whose bootstrap connection has since closed.
    pub connection: Option<ConnectionId>,
    /// Whether `pair-ack` was received. The coordinator is always acknowledged.
    pub acknowledged: bool,
}

/// Result of a join request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Slot assigned at `position`; `sealed` is true if this join filled the lobby.
    Admitted { position: usize, sealed: bool },
    /// Lobby is sealed; the join is dropped without reply.
    Full,
    /// Identity already holds a slot. Its connection is rebound if the lobby
    /// is still open.
    Duplicate,
    /// A node tried to join its own lobby.
    SelfJoin,
}

/// The coordinator's lobby.
#[derive(Debug, Clone)]
pub struct Lobby {
    capacity: usize,
    members: Vec<LobbyMember>,
    sealed: bool,
}

impl Lobby {
    /// New lobby with the coordinator in slot 0.
    pub fn new(coordinator: NodeId, capacity: usize) -> Self {
        Self {
            capacity: capacity.max(2),
            members: vec![LobbyMember {
                peer_id: coordinator,
                connection: None,
                acknowledged: true,
            }],
            sealed: false,
        }
    }

    /// Try to give `peer_id` a slot.
    pub fn admit(&mut self, peer_id: NodeId, connection: ConnectionId) -> Admission {
        if peer_id == self.members[0].peer_id {
            return Admission::SelfJoin;
        }
        if let Some(existing) = self.members.iter_mut().find(|m| m.peer_id == peer_id) {
            if !self.sealed {
                existing.connection = Some(connection);
            }
            return Admission::Duplicate;
        }
        if self.sealed || self.members.len() >= self.capacity {
            return Admission::Full;
        }

        self.members.push(LobbyMember {
            peer_id,
            connection: Some(connection),
            acknowledged: false,
        });
        self.sealed = self.members.len() == self.capacity;

        Admission::Admitted {
            position: self.members.len() - 1,
            sealed: self.sealed,
        }
    }

    /// Record a `pair-ack`. Returns `true` if this was the first ack from a
    /// member of a sealed lobby.
    pub fn acknowledge(&mut self, peer_id: &NodeId) -> bool {
        if !self.sealed {
            return false;
        }
        match self.members.iter_mut().find(|m| &m.peer_id == peer_id) {
            Some(member) if !member.acknowledged => {
                member.acknowledged = true;
                true
            }
            _ => false,
        }
    }

    /// Every member, coordinator included, has acknowledged.
    pub fn all_acknowledged(&self) -> bool {
        self.members.iter().all(|m| m.acknowledged)
    }

    /// Sealed, non-empty and fully acknowledged.
    pub fn is_complete(&self) -> bool {
        self.sealed && self.joiner_count() > 0 && self.all_acknowledged()
    }

    /// A joiner's connection closed.
    ///
    /// Before sealing the slot is freed. After sealing an unacknowledged
    /// member is dropped (a missing ack); an acknowledged one only loses its
    /// connection. Returns the affected member.
    pub fn release_connection(&mut self, connection: ConnectionId) -> Option<NodeId> {
        let index = self
            .members
            .iter()
            .skip(1)
            .position(|m| m.connection == Some(connection))?
            + 1;

        if self.sealed && self.members[index].acknowledged {
            self.members[index].connection = None;
            return Some(self.members[index].peer_id.clone());
        }

        let removed = self.members.remove(index);
        if self.joiner_count() == 0 {
            self.sealed = false;
        }
        Some(removed.peer_id)
    }

    /// Remove every joiner that has not acknowledged. Reopens the lobby if
    /// nobody is left.
    pub fn drop_unacknowledged(&mut self) -> Vec<LobbyMember> {
        let mut dropped = Vec::new();
        let mut kept = Vec::with_capacity(self.members.len());
        for (index, member) in self.members.drain(..).enumerate() {
            if index == 0 || member.acknowledged {
                kept.push(member);
            } else {
                dropped.push(member);
            }
        }
        self.members = kept;
        if self.joiner_count() == 0 {
            self.sealed = false;
        }
        dropped
    }

    /// Member identities in join order, coordinator first.
    pub fn members(&self) -> Vec<NodeId> {
        self.members.iter().map(|m| m.peer_id.clone()).collect()
    }

    /// Slots 1.., in join order.
    pub fn joiners(&self) -> &[LobbyMember] {
        &self.members[1..]
    }

    pub fn joiner_count(&self) -> usize {
        self.members.len() - 1
    }

    /// Coordinator plus joiners that still have a connection.
    pub fn connected_count(&self) -> usize {
        1 + self.joiners().iter().filter(|m| m.connection.is_some()).count()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
