//! Identity & bootstrap: opening the endpoint and electing a coordinator.

use super::core::ConnectionPurpose;
use crate::domain::{Lobby, NextStep, SessionError, TimerKind};
use crate::service::RendezvousSession;
use shared_types::{LogLevel, NodeRole};

impl RendezvousSession {
    pub(crate) fn start_session(&mut self) -> Result<(), SessionError> {
        if self.initialized {
            return Err(SessionError::AlreadyStarted);
        }

        if let Err(e) = self.ports.transport.open_endpoint(&self.identity) {
            self.set_status(format!("Peer error: {e}"));
            self.note(LogLevel::Error, format!("[Peer] Error: {e}"));
            return Err(SessionError::TransportInit(e));
        }

        self.initialized = true;
        self.set_status(format!("Connected as {}", self.identity));
        self.note(LogLevel::Info, format!("[Peer] Initialized: {}", self.identity));

        self.arm_timer(TimerKind::LivenessSweep, self.config.sweep_interval);
        self.try_become_coordinator();
        Ok(())
    }

    /// Claim the rendezvous identity, or fall back to joining.
    ///
    /// No-op before the endpoint is open, while coordinating, while in an
    /// island (paired or reconnecting), or while a bootstrap connection is in
    /// flight.
    pub(crate) fn try_become_coordinator(&mut self) {
        if !self.initialized
            || self.role == NodeRole::Coordinator
            || self.in_island()
            || self.bootstrap.is_some()
        {
            return;
        }
        self.timers
            .cancel_where(|k| matches!(k, TimerKind::ElectionBackoff(_)));

        let rendezvous = self.config.rendezvous_id.clone();
        match self.ports.directory.claim(&rendezvous) {
            Ok(()) => {
                self.lobby = Some(Lobby::new(
                    self.identity.clone(),
                    self.config.lobby_capacity,
                ));
                self.set_role(NodeRole::Coordinator);
                self.set_status("Waiting for a partner...");
                self.note(LogLevel::Notice, "[Base] Became base peer!");
                self.publish_lobby();
            }
            Err(e) => {
                self.note(
                    LogLevel::Notice,
                    format!("[Base] Failed to become base peer: {e}"),
                );
                if self.role != NodeRole::Joiner {
                    self.set_role(NodeRole::Joiner);
                }
                // Give a departing coordinator time to tear down.
                self.arm_timer(
                    TimerKind::ElectionBackoff(NextStep::Join),
                    self.config.election_backoff,
                );
            }
        }
    }

    /// Dial the rendezvous identity and ask for a slot.
    pub(crate) fn join_rendezvous(&mut self) {
        if self.role != NodeRole::Joiner || self.in_island() || self.bootstrap.is_some() {
            return;
        }
        self.set_status("Joining pair...");

        let rendezvous = self.config.rendezvous_id.clone();
        match self.ports.transport.connect(&rendezvous) {
            Ok(connection) => {
                self.track(connection, rendezvous, ConnectionPurpose::Bootstrap, false);
                self.bootstrap = Some(connection);
                self.arm_timer(TimerKind::JoinTimeout, self.config.join_timeout);
            }
            Err(e) => {
                self.set_status("Failed to join pair");
                self.note(LogLevel::Error, format!("[Join] Error: {e}"));
                self.try_become_coordinator();
            }
        }
    }

    pub(crate) fn on_backoff_elapsed(&mut self, next: NextStep) {
        match next {
            NextStep::Join => self.join_rendezvous(),
            NextStep::Claim => self.try_become_coordinator(),
        }
    }
}
