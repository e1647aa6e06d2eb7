//! Partner connection set.
//!
//! Maps each partner identity to the connections that reach it. Both sides
//! of an island dial each other, so a partner often has two connections:
//! one is the primary used for sending, the rest are aliases kept in reserve
//! and promoted when the primary goes away.

use crate::domain::value_objects::ConnectionId;
use shared_types::NodeId;
use std::collections::BTreeMap;

/// Connections to one partner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartnerLink {
    pub primary: Option<ConnectionId>,
    pub aliases: Vec<ConnectionId>,
}

impl PartnerLink {
    /// Primary first, then aliases.
    pub fn connections(&self) -> Vec<ConnectionId> {
        self.primary.iter().chain(self.aliases.iter()).copied().collect()
    }

    fn holds(&self, connection: ConnectionId) -> bool {
        self.primary == Some(connection) || self.aliases.contains(&connection)
    }
}

/// Partners of this node, ordered by identity.
#[derive(Debug, Clone, Default)]
pub struct PartnerSet {
    links: BTreeMap<NodeId, PartnerLink>,
}

impl PartnerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole set with `peers`, none of them connected yet.
    /// Returns every connection the previous set held.
    pub fn replace(&mut self, peers: impl IntoIterator<Item = NodeId>) -> Vec<ConnectionId> {
        let released = self.clear();
        for peer in peers {
            self.links.entry(peer).or_default();
        }
        released
    }

    /// Drop every partner. Returns their connections.
    pub fn clear(&mut self) -> Vec<ConnectionId> {
        let released = self
            .links
            .values()
            .flat_map(PartnerLink::connections)
            .collect();
        self.links.clear();
        released
    }

    /// Add a connection to a known partner. The first one becomes primary.
    /// Returns `false` if `peer` is not a partner.
    pub fn attach(&mut self, peer: &NodeId, connection: ConnectionId) -> bool {
        let Some(link) = self.links.get_mut(peer) else {
            return false;
        };
        if link.holds(connection) {
            return true;
        }
        if link.primary.is_none() {
            link.primary = Some(connection);
        } else {
            link.aliases.push(connection);
        }
        true
    }

    /// Make `connection` the primary for `peer`, demoting the old primary.
    pub fn promote(&mut self, peer: &NodeId, connection: ConnectionId) {
        let Some(link) = self.links.get_mut(peer) else {
            return;
        };
        if link.primary == Some(connection) {
            return;
        }
        link.aliases.retain(|c| *c != connection);
        if let Some(previous) = link.primary.replace(connection) {
            link.aliases.push(previous);
        }
    }

    /// Forget `connection`. If it was a primary, the oldest alias takes over.
    /// Returns the partner it belonged to.
    pub fn detach(&mut self, connection: ConnectionId) -> Option<NodeId> {
        let (peer, link) = self
            .links
            .iter_mut()
            .find(|(_, link)| link.holds(connection))?;

        if link.primary == Some(connection) {
            link.primary = if link.aliases.is_empty() {
                None
            } else {
                Some(link.aliases.remove(0))
            };
        } else {
            link.aliases.retain(|c| *c != connection);
        }
        Some(peer.clone())
    }

    /// Remove a partner. Returns its connections.
    pub fn remove(&mut self, peer: &NodeId) -> Vec<ConnectionId> {
        self.links
            .remove(peer)
            .map(|link| link.connections())
            .unwrap_or_default()
    }

    pub fn primary(&self, peer: &NodeId) -> Option<ConnectionId> {
        self.links.get(peer).and_then(|link| link.primary)
    }

    pub fn connections(&self, peer: &NodeId) -> Vec<ConnectionId> {
        self.links
            .get(peer)
            .map(PartnerLink::connections)
            .unwrap_or_default()
    }

    pub fn contains(&self, peer: &NodeId) -> bool {
        self.links.contains_key(peer)
    }

    /// Partner identities in order.
    pub fn ids(&self) -> Vec<NodeId> {
        self.links.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &PartnerLink)> {
        self.links.iter()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
