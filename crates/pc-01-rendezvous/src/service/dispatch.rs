//! Input dispatch and the `RendezvousApi` implementation.
//!
//! Wire messages are dispatched on their type, never on the connection that
//! delivered them.

use crate::domain::{ConnectionId, SessionError, SessionSnapshot, SubmitError, TimerKind};
use crate::ports::{NodeInput, RendezvousApi};
use crate::service::RendezvousSession;
use shared_types::{DiagnosticEntry, LogLevel, Message, MessageEnvelope, NodeRole, WireMessage};
use tracing::{debug, trace};

impl RendezvousSession {
    fn dispatch(&mut self, input: NodeInput) {
        match input {
            NodeInput::IncomingConnection {
                connection,
                remote,
                endpoint,
            } => {
                self.note(
                    LogLevel::Info,
                    format!("[Conn] Incoming connection from {remote}"),
                );
                if endpoint == self.config.rendezvous_id {
                    self.on_lobby_connection(connection, remote);
                } else {
                    self.on_direct_connection(connection, remote);
                }
            }
            NodeInput::ConnectionOpened(connection) => self.on_connection_opened(connection),
            NodeInput::Data {
                connection,
                message,
            } => self.on_data(connection, message),
            NodeInput::ConnectionClosed(connection) => self.on_connection_lost(connection, None),
            NodeInput::ConnectionError { connection, reason } => {
                self.on_connection_lost(connection, Some(reason))
            }
            NodeInput::TransportError(reason) => {
                self.set_status(format!("Peer error: {reason}"));
                self.note(LogLevel::Error, format!("[Peer] Error: {reason}"));
            }
            NodeInput::TimerFired(id) => match self.timers.take(id) {
                Some(kind) => self.on_timer(kind),
                None => trace!(node = %self.identity, timer = %id, "Cancelled timer fired"),
            },
        }
    }

    fn on_data(&mut self, connection: ConnectionId, message: WireMessage) {
        if !self.connections.contains_key(&connection) {
            debug!(
                node = %self.identity,
                connection = %connection,
                kind = message.kind(),
                "Data on untracked connection"
            );
            return;
        }
        match message {
            WireMessage::Join { peer_id } => self.on_join(connection, peer_id),
            WireMessage::Pair {
                partner_peer_id,
                members,
            } => self.on_pair(connection, partner_peer_id, members),
            WireMessage::PairAck { peer_id } => self.on_pair_ack(peer_id),
            WireMessage::Message(envelope) => self.receive_envelope(envelope, Some(connection)),
        }
    }

    fn on_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::ElectionBackoff(next) => self.on_backoff_elapsed(next),
            TimerKind::LivenessSweep => self.run_liveness_sweep(),
            TimerKind::ReconnectDeadline(peer) => self.on_reconnect_deadline(peer),
            TimerKind::JoinTimeout => self.on_join_timeout(),
            TimerKind::PairAckTimeout => self.on_pair_ack_timeout(),
        }
    }
}

impl RendezvousApi for RendezvousSession {
    fn start(&mut self) -> Result<(), SessionError> {
        self.start_session()
    }

    fn handle(&mut self, input: NodeInput) {
        if !self.initialized {
            trace!(node = %self.identity, "Input before start ignored");
            return;
        }
        self.dispatch(input);
    }

    fn submit(&mut self, text: &str) -> Result<Message, SubmitError> {
        self.submit_text(text)
    }

    fn receive(&mut self, envelope: MessageEnvelope, via: Option<ConnectionId>) {
        self.receive_envelope(envelope, via);
    }

    fn snapshot(&self) -> SessionSnapshot {
        let (lobby_members, lobby_connected, lobby_full) = match &self.lobby {
            Some(lobby) => (lobby.members(), lobby.connected_count(), lobby.is_sealed()),
            None => (Vec::new(), 0, false),
        };
        SessionSnapshot {
            node_id: self.identity.clone(),
            role: self.role,
            paired: self.role == NodeRole::Paired,
            partners: self.partners.ids(),
            lobby_members,
            lobby_connected,
            capacity: self.config.lobby_capacity,
            lobby_full,
            bootstrap_open: self.bootstrap.is_some(),
            status: self.status.clone(),
        }
    }

    fn messages(&self) -> &[Message] {
        self.log.entries()
    }

    fn diagnostics(&self) -> &[DiagnosticEntry] {
        self.diagnostics.entries()
    }
}
