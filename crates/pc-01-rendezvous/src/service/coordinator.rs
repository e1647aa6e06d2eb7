//! Rendezvous coordinator: lobby admission, pairing notification and
//! the pair-ack handshake.

use super::core::ConnectionPurpose;
use crate::domain::{Admission, ConnectionId, TimerKind};
use crate::service::RendezvousSession;
use shared_types::{LogLevel, NodeId, NodeRole, WireMessage};
use tracing::debug;

impl RendezvousSession {
    /// A joiner dialed our rendezvous endpoint.
    pub(crate) fn on_lobby_connection(&mut self, connection: ConnectionId, remote: NodeId) {
        if self.role != NodeRole::Coordinator {
            // Stale: we released the name but the dial was already in flight.
            debug!(node = %self.identity, remote = %remote, "Refusing rendezvous connection");
            self.ports.transport.close(connection);
            return;
        }
        self.track(connection, remote, ConnectionPurpose::LobbyClient, true);
    }

    pub(crate) fn on_join(&mut self, connection: ConnectionId, peer: NodeId) {
        if self.role != NodeRole::Coordinator {
            debug!(node = %self.identity, peer = %peer, "Ignoring join: not coordinating");
            return;
        }
        let arrived_on_rendezvous = self
            .connections
            .get(&connection)
            .is_some_and(|entry| entry.purpose == ConnectionPurpose::LobbyClient);
        if !arrived_on_rendezvous {
            debug!(node = %self.identity, peer = %peer, "Ignoring join on direct connection");
            return;
        }
        let Some(lobby) = self.lobby.as_mut() else {
            return;
        };

        let capacity = lobby.capacity();
        match lobby.admit(peer.clone(), connection) {
            Admission::Admitted { position, sealed } => {
                self.note(
                    LogLevel::Notice,
                    format!("[Base] Peer joined: {peer} (slot {}/{capacity})", position + 1),
                );
                self.publish_lobby();
                if sealed {
                    self.seal_lobby();
                }
            }
            Admission::Full => {
                // No reply: the joiner notices via its own timeout.
                self.note(
                    LogLevel::Info,
                    format!("[Base] Lobby full, ignoring join from {peer}"),
                );
            }
            Admission::Duplicate | Admission::SelfJoin => {
                debug!(node = %self.identity, peer = %peer, "Ignoring repeated join");
            }
        }
    }

    /// Notify every joiner of the final membership and wait for acks.
    fn seal_lobby(&mut self) {
        let Some(lobby) = self.lobby.as_ref() else {
            return;
        };
        let members = lobby.members();
        let notify: Vec<(NodeId, Option<ConnectionId>)> = lobby
            .joiners()
            .iter()
            .map(|m| (m.peer_id.clone(), m.connection))
            .collect();

        let listing = members
            .iter()
            .map(NodeId::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        self.note(
            LogLevel::Notice,
            format!("[Base] Lobby full ({listing}), sending pairing notifications"),
        );

        let pair = WireMessage::Pair {
            partner_peer_id: self.identity.clone(),
            members,
        };
        for (peer, connection) in notify {
            let delivered = connection.is_some_and(|c| self.send(c, &pair));
            if !delivered {
                debug!(node = %self.identity, peer = %peer, "Pair notification not delivered");
            }
        }

        self.timers.cancel(&TimerKind::PairAckTimeout);
        self.arm_timer(TimerKind::PairAckTimeout, self.config.pair_ack_timeout);
    }

    pub(crate) fn on_pair_ack(&mut self, peer: NodeId) {
        if self.role != NodeRole::Coordinator {
            return;
        }
        let Some(lobby) = self.lobby.as_mut() else {
            return;
        };
        if lobby.acknowledge(&peer) {
            self.note(LogLevel::Info, format!("[Base] Pairing acknowledged by {peer}"));
            self.check_lobby_progress();
        }
    }

    /// Complete the lobby once every remaining joiner has acked.
    pub(crate) fn check_lobby_progress(&mut self) {
        let Some(lobby) = self.lobby.as_ref() else {
            return;
        };
        if lobby.is_complete() {
            self.complete_lobby();
        } else if !lobby.is_sealed() {
            self.timers.cancel(&TimerKind::PairAckTimeout);
        }
    }

    /// A joiner's connection to the rendezvous endpoint went away.
    pub(crate) fn on_lobby_client_lost(&mut self, connection: ConnectionId) {
        let Some(lobby) = self.lobby.as_mut() else {
            return;
        };
        if let Some(peer) = lobby.release_connection(connection) {
            let still_member = lobby.members().contains(&peer);
            if !still_member {
                self.note(
                    LogLevel::Warning,
                    format!("[Conn] Connection closed: {peer}"),
                );
                self.publish_lobby();
            }
            self.check_lobby_progress();
        }
    }

    /// Un-acked members are dropped; complete with whoever acked, or reopen.
    pub(crate) fn on_pair_ack_timeout(&mut self) {
        if self.role != NodeRole::Coordinator {
            return;
        }
        let Some(lobby) = self.lobby.as_mut() else {
            return;
        };
        if !lobby.is_sealed() {
            return;
        }

        let dropped = lobby.drop_unacknowledged();
        for member in &dropped {
            self.note(
                LogLevel::Warning,
                format!("[Base] No pairing acknowledgement from {}, dropping", member.peer_id),
            );
            if let Some(connection) = member.connection {
                self.drop_connection(connection);
            }
            self.close_incoming_from(&member.peer_id);
        }

        let complete = self.lobby.as_ref().is_some_and(|l| l.is_complete());
        if complete {
            self.complete_lobby();
        } else {
            self.note(LogLevel::Notice, "[Base] Lobby reopened");
            self.set_status("Waiting for a partner...");
            self.publish_lobby();
        }
    }

    /// Release the rendezvous identity and become a member of our own island.
    fn complete_lobby(&mut self) {
        let Some(lobby) = self.lobby.take() else {
            return;
        };
        self.timers.cancel(&TimerKind::PairAckTimeout);

        self.ports.directory.release(&self.config.rendezvous_id);
        let lobby_connections: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, entry)| entry.purpose == ConnectionPurpose::LobbyClient)
            .map(|(connection, _)| *connection)
            .collect();
        for connection in lobby_connections {
            self.drop_connection(connection);
        }
        self.note(LogLevel::Notice, "[Base] Pair formed, base status removed.");

        let partners: Vec<NodeId> = lobby
            .members()
            .into_iter()
            .filter(|m| m != &self.identity)
            .collect();
        self.enter_paired(partners);
    }

    /// Close direct connections a non-partner opened to us.
    pub(crate) fn close_incoming_from(&mut self, peer: &NodeId) {
        let stray: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, entry)| {
                entry.purpose == ConnectionPurpose::Incoming && &entry.remote == peer
            })
            .map(|(connection, _)| *connection)
            .collect();
        for connection in stray {
            self.drop_connection(connection);
        }
    }
}
