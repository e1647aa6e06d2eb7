use super::core::ConnectionPurpose;
use crate::domain::{ConnectionId, TimerKind};
use crate::service::RendezvousSession;
use shared_types::{LogLevel, NodeId, NodeRole};

impl RendezvousSession {
    /// Periodic liveness sweep.
    ///
    /// - Connections the transport reports closed without telling us are
    ///   pruned; partner ones leave the partner in place for a reconnect.
    /// - Every partner without an open connection or a fresh dial is
    ///   redialed under a reconnect deadline. If no partner is reachable the
    ///   node leaves `Paired` until a reconnect opens.
    /// - Connections from strangers older than one sweep are closed.
    /// - A node with no partner that is not coordinating re-runs the election.
    pub(crate) fn run_liveness_sweep(&mut self) {
        self.arm_timer(TimerKind::LivenessSweep, self.config.sweep_interval);
        if !self.initialized {
            return;
        }

        self.prune_dead_connections();
        self.close_stray_connections();

        let unreachable: Vec<NodeId> = self
            .partners
            .ids()
            .into_iter()
            .filter(|peer| !self.has_open_connection(peer) && !self.dial_in_flight(peer))
            .collect();
        for peer in &unreachable {
            let deadline = TimerKind::ReconnectDeadline(peer.clone());
            if !self.timers.is_armed(&deadline) {
                self.note(
                    LogLevel::Probe,
                    format!("[Auto] Attempting to reconnect to partner: {peer}"),
                );
                self.arm_timer(deadline, self.config.reconnect_timeout);
            }
            self.redial_partner(peer);
        }

        let any_open = self
            .partners
            .ids()
            .iter()
            .any(|peer| self.has_open_connection(peer));
        if self.role == NodeRole::Paired && !unreachable.is_empty() && !any_open {
            self.set_role(NodeRole::Joiner);
            self.set_status("Reconnecting to partner...");
        }

        let election_in_flight = self.bootstrap.is_some() || self.timers.backoff_pending();
        if self.partners.is_empty() && self.role != NodeRole::Coordinator && !election_in_flight {
            self.note(
                LogLevel::Probe,
                "[Auto] Not paired, attempting to find partner...",
            );
            self.try_become_coordinator();
        }
    }

    /// A dial to `peer` younger than one sweep is still allowed to open.
    fn dial_in_flight(&self, peer: &NodeId) -> bool {
        let now = self.now_ms();
        let min_age = self.config.sweep_interval.as_millis() as u64;
        self.partners.connections(peer).iter().any(|c| {
            self.connections
                .get(c)
                .is_some_and(|entry| !entry.open && now.saturating_sub(entry.since_ms) < min_age)
        })
    }

    /// Abandon dials to `peer` that never opened and start a fresh one. A
    /// dial into a partition never completes, even after the partition heals.
    fn redial_partner(&mut self, peer: &NodeId) {
        for connection in self.partners.connections(peer) {
            self.partners.detach(connection);
            self.drop_connection(connection);
        }
        self.dial_partner(peer);
    }

    fn prune_dead_connections(&mut self) {
        let dead: Vec<(ConnectionId, ConnectionPurpose)> = self
            .connections
            .iter()
            .filter(|(connection, entry)| entry.open && !self.ports.transport.is_open(**connection))
            .map(|(connection, entry)| (*connection, entry.purpose))
            .collect();

        for (connection, purpose) in dead {
            if purpose == ConnectionPurpose::Partner {
                self.partners.detach(connection);
                self.drop_connection(connection);
            } else {
                self.on_connection_lost(connection, None);
            }
        }
    }

    fn close_stray_connections(&mut self) {
        let now = self.now_ms();
        let min_age = self.config.sweep_interval.as_millis() as u64;
        let lobby_members = self.lobby.as_ref().map(|l| l.members()).unwrap_or_default();
        let stray: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, entry)| {
                entry.purpose == ConnectionPurpose::Incoming
                    && !lobby_members.contains(&entry.remote)
                    && now.saturating_sub(entry.since_ms) >= min_age
            })
            .map(|(connection, _)| *connection)
            .collect();
        for connection in stray {
            self.drop_connection(connection);
        }
    }

    /// The reconnect window for `peer` elapsed.
    pub(crate) fn on_reconnect_deadline(&mut self, peer: NodeId) {
        if !self.partners.contains(&peer) || self.has_open_connection(&peer) {
            return;
        }
        self.note(
            LogLevel::Warning,
            format!("[Auto] Partner {peer} not responding, looking for new partner..."),
        );
        self.drop_partner(&peer);
    }

    /// No `pair` arrived in time; give up on this coordinator.
    pub(crate) fn on_join_timeout(&mut self) {
        let Some(bootstrap) = self.bootstrap.take() else {
            return;
        };
        self.drop_connection(bootstrap);
        if self.role != NodeRole::Joiner {
            return;
        }
        self.set_status("Failed to join pair");
        self.note(
            LogLevel::Warning,
            "[Join] No pairing response from base, retrying election",
        );
        self.try_become_coordinator();
    }
}
