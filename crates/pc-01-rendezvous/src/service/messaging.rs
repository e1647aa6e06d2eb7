//! Message store & relay.

use crate::domain::{generate_message_id, relay_targets, should_relay, ConnectionId, SubmitError};
use crate::service::RendezvousSession;
use shared_bus::SessionEvent;
use shared_types::{Message, MessageEnvelope, WireMessage};
use tracing::debug;

impl RendezvousSession {
    pub(crate) fn submit_text(&mut self, text: &str) -> Result<Message, SubmitError> {
        if !self.initialized {
            self.set_status("Error: Peer not initialized.");
            return Err(SubmitError::NotReady);
        }
        let text = text.trim();
        if text.is_empty() {
            self.set_status("Error: Message cannot be empty.");
            return Err(SubmitError::EmptyText);
        }

        let timestamp = self.now_ms();
        let message = Message {
            id: generate_message_id(&self.identity, timestamp, &mut self.rng),
            peer_id: self.identity.clone(),
            text: text.to_string(),
            timestamp,
        };
        self.log.merge(std::iter::once(&message));

        let wire = WireMessage::Message(MessageEnvelope::single(
            message.clone(),
            self.identity.clone(),
        ));
        let mut delivered = 0usize;
        for peer in self.partners.ids() {
            if self.send_to_partner(&peer, &wire) {
                delivered += 1;
            }
        }

        if delivered > 0 {
            self.set_status("Message sent to partner.");
        } else {
            self.set_status("Error: No connection to partner.");
        }
        Ok(message)
    }

    pub(crate) fn receive_envelope(
        &mut self,
        envelope: MessageEnvelope,
        via: Option<ConnectionId>,
    ) {
        let added = self.log.merge(&envelope.messages);
        for message in &added {
            self.ports.events.publish(SessionEvent::MessageReceived {
                node: self.identity.clone(),
                message: message.clone(),
            });
        }

        let from_self = envelope.from == self.identity;
        if !should_relay(self.config.relay_policy, from_self, added.len()) {
            return;
        }

        let arrived_from = via
            .and_then(|c| self.connections.get(&c))
            .map(|entry| entry.remote.clone());
        let partners = self.partners.ids();
        let targets = relay_targets(
            &partners,
            arrived_from.as_ref(),
            &envelope.from,
            self.config.relay_policy,
        );
        if targets.is_empty() {
            return;
        }

        debug!(
            node = %self.identity,
            from = %envelope.from,
            messages = envelope.messages.len(),
            targets = targets.len(),
            "Relaying envelope"
        );
        let wire = WireMessage::Message(envelope);
        for peer in targets {
            self.send_to_partner(&peer, &wire);
        }
    }
}
