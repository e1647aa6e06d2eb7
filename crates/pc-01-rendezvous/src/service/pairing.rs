//! Pairing state machine: joining, pairing, island formation and recovery.

use super::core::ConnectionPurpose;
use crate::domain::{ConnectionId, NextStep, TimerKind};
use crate::service::RendezvousSession;
use shared_types::{LogLevel, NodeId, NodeRole, WireMessage};
use tracing::debug;

impl RendezvousSession {
    /// The coordinator announced our lobby.
    pub(crate) fn on_pair(
        &mut self,
        connection: ConnectionId,
        partner_peer_id: NodeId,
        members: Vec<NodeId>,
    ) {
        if matches!(self.role, NodeRole::Paired | NodeRole::Coordinator) || self.in_island() {
            debug!(node = %self.identity, role = %self.role, "Ignoring pair notification");
            return;
        }

        let partners: Vec<NodeId> = if members.is_empty() {
            vec![partner_peer_id]
        } else {
            members.into_iter().filter(|m| m != &self.identity).collect()
        };
        if partners.is_empty() {
            return;
        }

        let ack = WireMessage::PairAck {
            peer_id: self.identity.clone(),
        };
        self.send(connection, &ack);

        let listing = partners
            .iter()
            .map(NodeId::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        self.note(
            LogLevel::Notice,
            format!("[Pair] Received pairing notification with: {listing}"),
        );
        self.enter_paired(partners);
    }

    /// Become a member of an island with `peers`, then connect to each.
    pub(crate) fn enter_paired(&mut self, peers: Vec<NodeId>) {
        for stale in self.partners.replace(peers) {
            self.drop_connection(stale);
        }
        self.timers.cancel(&TimerKind::JoinTimeout);
        self.timers
            .cancel_where(|k| matches!(k, TimerKind::ElectionBackoff(_)));

        // Partners that dialed us before we knew them.
        let adopted: Vec<(ConnectionId, NodeId)> = self
            .connections
            .iter()
            .filter(|(_, entry)| {
                entry.purpose == ConnectionPurpose::Incoming
                    && self.partners.contains(&entry.remote)
            })
            .map(|(connection, entry)| (*connection, entry.remote.clone()))
            .collect();
        for (connection, peer) in &adopted {
            if let Some(entry) = self.connections.get_mut(connection) {
                entry.purpose = ConnectionPurpose::Partner;
            }
            self.partners.attach(peer, *connection);
        }

        self.set_role(NodeRole::Paired);
        self.set_status("Paired!");

        for (connection, peer) in adopted {
            if self.is_open(connection) {
                self.on_partner_open(connection, peer);
            }
        }
        for peer in self.partners.ids() {
            if !self.has_open_connection(&peer) {
                self.dial_partner(&peer);
            }
        }
    }

    pub(crate) fn dial_partner(&mut self, peer: &NodeId) {
        match self.ports.transport.connect(peer) {
            Ok(connection) => {
                self.track(connection, peer.clone(), ConnectionPurpose::Partner, false);
                self.partners.attach(peer, connection);
            }
            Err(e) => {
                self.note(
                    LogLevel::Warning,
                    format!("[Conn] Could not dial partner {peer}: {e}"),
                );
            }
        }
    }

    /// Someone dialed our own endpoint.
    pub(crate) fn on_direct_connection(&mut self, connection: ConnectionId, remote: NodeId) {
        if self.partners.contains(&remote) {
            self.track(connection, remote.clone(), ConnectionPurpose::Partner, true);
            self.partners.attach(&remote, connection);
            self.on_partner_open(connection, remote);
        } else {
            self.track(connection, remote, ConnectionPurpose::Incoming, true);
        }
    }

    pub(crate) fn on_connection_opened(&mut self, connection: ConnectionId) {
        let Some(entry) = self.connections.get_mut(&connection) else {
            return;
        };
        entry.open = true;
        let purpose = entry.purpose;
        let remote = entry.remote.clone();

        match purpose {
            ConnectionPurpose::Bootstrap => {
                let join = WireMessage::Join {
                    peer_id: self.identity.clone(),
                };
                if self.send(connection, &join) {
                    self.note(LogLevel::Info, "[Join] Sent join request to base");
                }
            }
            ConnectionPurpose::Partner => self.on_partner_open(connection, remote),
            ConnectionPurpose::LobbyClient | ConnectionPurpose::Incoming => {}
        }
    }

    /// A partner connection is usable.
    pub(crate) fn on_partner_open(&mut self, connection: ConnectionId, peer: NodeId) {
        if !self.partners.contains(&peer) {
            // Partner was dropped while this dial was pending.
            self.drop_connection(connection);
            return;
        }

        let had_deadline = self.timers.cancel(&TimerKind::ReconnectDeadline(peer.clone())) > 0;
        let primary_open = self
            .partners
            .primary(&peer)
            .is_some_and(|p| p != connection && self.is_open(p));
        if !primary_open {
            self.partners.promote(&peer, connection);
        }
        if self.role != NodeRole::Paired {
            self.set_role(NodeRole::Paired);
        }

        if had_deadline {
            self.note(
                LogLevel::Info,
                format!("[Auto] Reconnected to partner: {peer}"),
            );
        } else {
            self.note(
                LogLevel::Info,
                format!("[Conn] Connected to partner: {peer}"),
            );
        }

        if let Some(bootstrap) = self.bootstrap.take() {
            self.note(
                LogLevel::Info,
                "[Pair] Disconnecting from base peer (island formed)",
            );
            self.drop_connection(bootstrap);
        }
        self.set_status("Paired!");
    }

    /// A connection closed or failed. `reason` is set for errors.
    pub(crate) fn on_connection_lost(&mut self, connection: ConnectionId, reason: Option<String>) {
        let Some(entry) = self.connections.remove(&connection) else {
            return;
        };

        match entry.purpose {
            ConnectionPurpose::Bootstrap => {
                if self.bootstrap == Some(connection) {
                    self.bootstrap = None;
                    self.timers.cancel(&TimerKind::JoinTimeout);
                }
                if self.role == NodeRole::Joiner {
                    if let Some(reason) = reason {
                        self.set_status("Failed to join pair");
                        self.note(LogLevel::Error, format!("[Join] Error: {reason}"));
                    }
                    self.try_become_coordinator();
                }
            }
            ConnectionPurpose::LobbyClient => self.on_lobby_client_lost(connection),
            ConnectionPurpose::Partner => {
                let Some(peer) = self.partners.detach(connection) else {
                    return;
                };
                if self.has_open_connection(&peer) {
                    debug!(
                        node = %self.identity,
                        peer = %peer,
                        "Duplicate partner connection closed"
                    );
                    return;
                }
                let text = match reason {
                    Some(reason) => format!(
                        "[Conn] Partner connection error: {reason}, looking for new partner..."
                    ),
                    None => {
                        "[Conn] Partner connection closed, looking for new partner...".to_string()
                    }
                };
                self.note(LogLevel::Error, text);
                self.drop_partner(&peer);
            }
            ConnectionPurpose::Incoming => {
                debug!(node = %self.identity, remote = %entry.remote, "Connection closed");
            }
        }
    }

    /// Whether this node belongs to an island: paired, or reconnecting to
    /// partners it still remembers.
    pub(crate) fn in_island(&self) -> bool {
        match self.role {
            NodeRole::Paired => true,
            NodeRole::Joiner => !self.partners.is_empty(),
            NodeRole::Unclaimed | NodeRole::Coordinator => false,
        }
    }

    /// Forget a partner; rejoin if it was the last one.
    pub(crate) fn drop_partner(&mut self, peer: &NodeId) {
        let last = self.partners.ids().iter().all(|p| p == peer);
        if last {
            self.reset_pairing_and_rejoin();
            return;
        }
        for connection in self.partners.remove(peer) {
            self.drop_connection(connection);
        }
        self.timers.cancel(&TimerKind::ReconnectDeadline(peer.clone()));
        self.publish_partners();
    }

    /// Leave the island and look for a new partner after a backoff.
    ///
    /// Idempotent: only acts while in an island.
    pub(crate) fn reset_pairing_and_rejoin(&mut self) {
        if !self.in_island() {
            return;
        }
        for connection in self.partners.clear() {
            self.drop_connection(connection);
        }
        self.timers
            .cancel_where(|k| matches!(k, TimerKind::ReconnectDeadline(_)));

        self.set_role(NodeRole::Joiner);
        self.set_status("Partner disconnected, looking for new partner...");
        self.note(LogLevel::Notice, "[Rejoin] Starting search for new partner...");
        self.arm_timer(
            TimerKind::ElectionBackoff(NextStep::Claim),
            self.config.election_backoff,
        );
    }
}
