use super::LoopbackNetwork;
use crate::domain::{ClaimError, ConnectionId, TimerId, TransportError};
use crate::ports::{Directory, NodeInput, Scheduler, Transport};
use shared_types::{NodeId, WireMessage};
use std::sync::Arc;
use std::time::Duration;

/// One node's handle on the loopback hub.
#[derive(Clone)]
pub struct LoopbackPort {
    node: NodeId,
    network: Arc<LoopbackNetwork>,
}

impl LoopbackPort {
    pub fn new(node: NodeId, network: Arc<LoopbackNetwork>) -> Self {
        Self { node, network }
    }

    pub fn node(&self) -> &NodeId {
        &self.node
    }
}

impl Transport for LoopbackPort {
    fn open_endpoint(&self, local: &NodeId) -> Result<(), TransportError> {
        self.network.open_endpoint(&self.node, local)
    }

    fn connect(&self, target: &NodeId) -> Result<ConnectionId, TransportError> {
        self.network.connect(&self.node, target)
    }

    fn send(&self, connection: ConnectionId, message: &WireMessage) -> Result<(), TransportError> {
        self.network.send(&self.node, connection, message)
    }

    fn close(&self, connection: ConnectionId) {
        self.network.close(&self.node, connection);
    }

    fn is_open(&self, connection: ConnectionId) -> bool {
        self.network.is_open(connection)
    }
}

impl Directory for LoopbackPort {
    fn claim(&self, name: &NodeId) -> Result<(), ClaimError> {
        self.network.claim(&self.node, name)
    }

    fn release(&self, name: &NodeId) {
        self.network.release(&self.node, name);
    }
}

impl Scheduler for LoopbackPort {
    fn schedule(&self, timer: TimerId, after: Duration) {
        self.network
            .schedule(&self.node, NodeInput::TimerFired(timer), after);
    }
}
