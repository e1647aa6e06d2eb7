//! # Loopback Transport
//!
//! In-process stand-in for a peer-to-peer network and its signalling
//! directory. One [`LoopbackNetwork`] hub is shared by every node; each node
//! talks to it through its own [`LoopbackPort`], which implements the
//! `Transport`, `Directory` and `Scheduler` ports.
//!
//! Every event the hub produces is handed to an [`InputSink`] together with
//! a delay, so the same hub runs under a real tokio runtime and under the
//! virtual clock of the simulation harness.
//!
//! Each connection has two ends with their own ids. Messages are encoded to
//! JSON and decoded again on the way through, so the wire format is
//! exercised even in process.

mod port;

pub use port::LoopbackPort;

use crate::domain::{ClaimError, ConnectionId, TransportError};
use crate::ports::NodeInput;
use parking_lot::Mutex;
use shared_types::{decode, encode, NodeId, WireMessage};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Reason carried by `ConnectionError` when nobody holds the dialed name.
pub const PEER_UNAVAILABLE: &str = "peer-unavailable";

/// Where the hub delivers inputs.
pub trait InputSink: Send + Sync {
    /// Deliver `input` to `node` after `delay`.
    fn deliver(&self, node: &NodeId, input: NodeInput, delay: Duration);
}

#[derive(Debug, Clone)]
struct LinkEnd {
    owner: NodeId,
    peer: ConnectionId,
}

#[derive(Debug, Default)]
struct HubState {
    next_connection: u64,
    /// name -> owning node
    names: HashMap<NodeId, NodeId>,
    offline: HashSet<NodeId>,
    links: HashMap<ConnectionId, LinkEnd>,
    /// Endpoint name each accepting end was addressed to.
    accepted_on: HashMap<ConnectionId, NodeId>,
}

impl HubState {
    fn allocate(&mut self) -> ConnectionId {
        self.next_connection += 1;
        ConnectionId::new(self.next_connection)
    }

    /// Remove both ends of the link containing `connection`. Returns the
    /// other end if it was tracked.
    fn unlink(&mut self, connection: ConnectionId) -> Option<(ConnectionId, LinkEnd)> {
        let end = self.links.remove(&connection)?;
        self.accepted_on.remove(&connection);
        self.accepted_on.remove(&end.peer);
        self.links.remove(&end.peer).map(|other| (end.peer, other))
    }

    fn is_online(&self, node: &NodeId) -> bool {
        !self.offline.contains(node)
    }
}

type Delivery = (NodeId, NodeInput);

/// Shared in-process network hub.
pub struct LoopbackNetwork {
    state: Mutex<HubState>,
    sink: Arc<dyn InputSink>,
    latency: Duration,
}

impl LoopbackNetwork {
    pub fn new(sink: Arc<dyn InputSink>, latency: Duration) -> Self {
        Self {
            state: Mutex::new(HubState::default()),
            sink,
            latency,
        }
    }

    /// Port for `node`.
    pub fn port(self: &Arc<Self>, node: NodeId) -> LoopbackPort {
        LoopbackPort::new(node, Arc::clone(self))
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    fn flush(&self, deliveries: Vec<Delivery>) {
        for (node, input) in deliveries {
            self.sink.deliver(&node, input, self.latency);
        }
    }

    // =========================================================================
    // Port operations
    // =========================================================================

    pub(crate) fn open_endpoint(&self, node: &NodeId, name: &NodeId) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if !state.is_online(node) {
            return Err(TransportError::Unreachable("node offline".into()));
        }
        let taken = state.names.get(name).is_some_and(|owner| owner != node);
        if taken {
            return Err(TransportError::EndpointTaken(name.clone()));
        }
        state.names.insert(name.clone(), node.clone());
        Ok(())
    }

    pub(crate) fn claim(&self, node: &NodeId, name: &NodeId) -> Result<(), ClaimError> {
        let mut state = self.state.lock();
        if !state.is_online(node) {
            return Err(ClaimError::Unavailable("node offline".into()));
        }
        let taken = state.names.get(name).is_some_and(|owner| owner != node);
        if taken {
            return Err(ClaimError::AlreadyTaken(name.clone()));
        }
        state.names.insert(name.clone(), node.clone());
        debug!(node = %node, name = %name, "Name claimed");
        Ok(())
    }

    pub(crate) fn release(&self, node: &NodeId, name: &NodeId) {
        let mut deliveries = Vec::new();
        {
            let mut state = self.state.lock();
            if state.names.get(name) != Some(node) {
                return;
            }
            state.names.remove(name);

            let accepted: Vec<ConnectionId> = state
                .accepted_on
                .iter()
                .filter(|(_, endpoint)| *endpoint == name)
                .map(|(connection, _)| *connection)
                .collect();
            for connection in accepted {
                if let Some((dialer_end, dialer)) = state.unlink(connection) {
                    if state.is_online(&dialer.owner) {
                        deliveries.push((dialer.owner, NodeInput::ConnectionClosed(dialer_end)));
                    }
                }
            }
            debug!(node = %node, name = %name, "Name released");
        }
        self.flush(deliveries);
    }

    pub(crate) fn connect(
        &self,
        node: &NodeId,
        target: &NodeId,
    ) -> Result<ConnectionId, TransportError> {
        let mut deliveries = Vec::new();
        let dialer_end = {
            let mut state = self.state.lock();
            let dialer_end = state.allocate();

            let owner = state.names.get(target).cloned();
            match owner {
                _ if !state.is_online(node) => {
                    // Nothing leaves a partitioned node; the dial hangs.
                }
                None => deliveries.push((
                    node.clone(),
                    NodeInput::ConnectionError {
                        connection: dialer_end,
                        reason: PEER_UNAVAILABLE.to_string(),
                    },
                )),
                Some(owner) if !state.is_online(&owner) => {
                    trace!(node = %node, target = %target, "Dial into partition hangs");
                }
                Some(owner) => {
                    let acceptor_end = state.allocate();
                    state.links.insert(
                        dialer_end,
                        LinkEnd {
                            owner: node.clone(),
                            peer: acceptor_end,
                        },
                    );
                    state.links.insert(
                        acceptor_end,
                        LinkEnd {
                            owner: owner.clone(),
                            peer: dialer_end,
                        },
                    );
                    state.accepted_on.insert(acceptor_end, target.clone());
                    deliveries.push((
                        owner,
                        NodeInput::IncomingConnection {
                            connection: acceptor_end,
                            remote: node.clone(),
                            endpoint: target.clone(),
                        },
                    ));
                    deliveries.push((node.clone(), NodeInput::ConnectionOpened(dialer_end)));
                }
            }
            dialer_end
        };
        self.flush(deliveries);
        Ok(dialer_end)
    }

    pub(crate) fn send(
        &self,
        node: &NodeId,
        connection: ConnectionId,
        message: &WireMessage,
    ) -> Result<(), TransportError> {
        let text = encode(message)?;
        let decoded = decode(&text)?;

        let delivery = {
            let state = self.state.lock();
            let end = state
                .links
                .get(&connection)
                .filter(|end| &end.owner == node)
                .ok_or(TransportError::UnknownConnection)?;
            let remote = state
                .links
                .get(&end.peer)
                .ok_or(TransportError::NotOpen)?;
            (
                remote.owner.clone(),
                NodeInput::Data {
                    connection: end.peer,
                    message: decoded,
                },
            )
        };
        self.flush(vec![delivery]);
        Ok(())
    }

    pub(crate) fn close(&self, node: &NodeId, connection: ConnectionId) {
        let mut deliveries = Vec::new();
        {
            let mut state = self.state.lock();
            let owned = state
                .links
                .get(&connection)
                .is_some_and(|end| &end.owner == node);
            if !owned {
                return;
            }
            if let Some((other_end, other)) = state.unlink(connection) {
                if state.is_online(&other.owner) {
                    deliveries.push((other.owner, NodeInput::ConnectionClosed(other_end)));
                }
            }
        }
        self.flush(deliveries);
    }

    pub(crate) fn is_open(&self, connection: ConnectionId) -> bool {
        self.state.lock().links.contains_key(&connection)
    }

    pub(crate) fn schedule(&self, node: &NodeId, input: NodeInput, after: Duration) {
        self.sink.deliver(node, input, after);
    }

    // =========================================================================
    // Fault injection
    // =========================================================================

    /// Process exit: names are freed and every peer sees its connections close.
    pub fn disconnect_node(&self, node: &NodeId) {
        let mut deliveries = Vec::new();
        {
            let mut state = self.state.lock();
            state.names.retain(|_, owner| *owner != *node);
            let owned: Vec<ConnectionId> = state
                .links
                .iter()
                .filter(|(_, end)| &end.owner == node)
                .map(|(connection, _)| *connection)
                .collect();
            for connection in owned {
                if let Some((other_end, other)) = state.unlink(connection) {
                    if state.is_online(&other.owner) {
                        deliveries.push((other.owner, NodeInput::ConnectionClosed(other_end)));
                    }
                }
            }
            state.offline.insert(node.clone());
        }
        self.flush(deliveries);
    }

    /// Cut `node` off. Its links die silently on both sides and its dials
    /// hang; it keeps the names it holds.
    pub fn partition(&self, node: &NodeId) {
        let mut state = self.state.lock();
        let owned: Vec<ConnectionId> = state
            .links
            .iter()
            .filter(|(_, end)| &end.owner == node)
            .map(|(connection, _)| *connection)
            .collect();
        for connection in owned {
            state.unlink(connection);
        }
        state.offline.insert(node.clone());
    }

    /// Bring a partitioned node back.
    pub fn heal(&self, node: &NodeId) {
        self.state.lock().offline.remove(node);
    }

    /// Drop every link between `a` and `b`, notifying both sides.
    pub fn sever(&self, a: &NodeId, b: &NodeId) {
        let mut deliveries = Vec::new();
        {
            let mut state = self.state.lock();
            let between: Vec<ConnectionId> = state
                .links
                .iter()
                .filter(|(_, end)| &end.owner == a)
                .filter(|(_, end)| {
                    state
                        .links
                        .get(&end.peer)
                        .is_some_and(|other| &other.owner == b)
                })
                .map(|(connection, _)| *connection)
                .collect();
            for connection in between {
                if let Some((other_end, other)) = state.unlink(connection) {
                    deliveries.push((a.clone(), NodeInput::ConnectionClosed(connection)));
                    deliveries.push((other.owner, NodeInput::ConnectionClosed(other_end)));
                }
            }
        }
        self.flush(deliveries);
    }

    /// Current owner of `name`.
    pub fn owner_of(&self, name: &NodeId) -> Option<NodeId> {
        self.state.lock().names.get(name).cloned()
    }

    /// Number of live links (each counted once per end).
    pub fn open_link_ends(&self) -> usize {
        self.state.lock().links.len()
    }
}
