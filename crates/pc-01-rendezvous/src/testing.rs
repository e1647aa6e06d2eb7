//! Centralized Testing Utilities
//!
//! A deterministic harness for whole swarms. Every node runs a real
//! [`RendezvousSession`] over the loopback hub; the hub and all timers feed a
//! single [`VirtualQueue`] ordered by virtual time, so a scenario replays the
//! same way on every run. Available with the `test-utils` feature flag.
//!
//! # Example
//!
//! ```rust
//! use pc_01_rendezvous::testing::Simulation;
//! use pc_01_rendezvous::RendezvousConfig;
//! use std::time::Duration;
//!
//! let mut sim = Simulation::new(RendezvousConfig::for_testing());
//! let a = sim.add_node(1).unwrap();
//! let b = sim.add_node(2).unwrap();
//! sim.run_for(Duration::from_secs(2));
//!
//! assert!(sim.session(&a).unwrap().partners().contains(&b));
//! ```

use crate::adapters::{InputSink, LoopbackNetwork};
use crate::domain::{generate_node_id, RendezvousConfig, SessionError, SubmitError};
use crate::ports::{NodeInput, RendezvousApi, TimeSource};
use crate::service::{RendezvousSession, SessionPorts};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared_bus::InMemoryEventBus;
use shared_types::{Message, NodeId, NodeRole};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Wall-clock value of virtual time zero.
pub const SIMULATION_EPOCH_MS: u64 = 1_700_000_000_000;

/// Default one-way latency of the simulated network.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(5);

// =============================================================================
// VirtualQueue
// =============================================================================

struct Scheduled {
    at_ms: u64,
    seq: u64,
    node: NodeId,
    input: NodeInput,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        (self.at_ms, self.seq) == (other.at_ms, other.seq)
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at_ms, self.seq).cmp(&(other.at_ms, other.seq))
    }
}

#[derive(Default)]
struct QueueState {
    now_ms: u64,
    seq: u64,
    pending: BinaryHeap<Reverse<Scheduled>>,
}

/// Virtual clock plus the inputs waiting on it.
///
/// Inputs scheduled for the same instant are delivered in the order they
/// were scheduled.
#[derive(Default)]
pub struct VirtualQueue {
    state: Mutex<QueueState>,
}

impl VirtualQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual milliseconds since the start of the run.
    pub fn elapsed_ms(&self) -> u64 {
        self.state.lock().now_ms
    }

    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Pop the next input due at or before `until_ms`, advancing the clock
    /// to its delivery time.
    pub fn pop_due(&self, until_ms: u64) -> Option<(NodeId, NodeInput)> {
        let mut state = self.state.lock();
        let due = state
            .pending
            .peek()
            .is_some_and(|Reverse(next)| next.at_ms <= until_ms);
        if !due {
            return None;
        }
        let Reverse(next) = state.pending.pop()?;
        state.now_ms = state.now_ms.max(next.at_ms);
        Some((next.node, next.input))
    }

    /// Move the clock forward without delivering anything.
    pub fn advance_to(&self, at_ms: u64) {
        let mut state = self.state.lock();
        state.now_ms = state.now_ms.max(at_ms);
    }
}

impl InputSink for VirtualQueue {
    fn deliver(&self, node: &NodeId, input: NodeInput, delay: Duration) {
        let mut state = self.state.lock();
        state.seq += 1;
        let scheduled = Scheduled {
            at_ms: state.now_ms + delay.as_millis() as u64,
            seq: state.seq,
            node: node.clone(),
            input,
        };
        state.pending.push(Reverse(scheduled));
    }
}

impl TimeSource for VirtualQueue {
    fn now_millis(&self) -> u64 {
        SIMULATION_EPOCH_MS + self.elapsed_ms()
    }
}

// =============================================================================
// Simulation
// =============================================================================

/// A swarm of sessions on one loopback hub, driven by a virtual clock.
pub struct Simulation {
    config: RendezvousConfig,
    queue: Arc<VirtualQueue>,
    network: Arc<LoopbackNetwork>,
    bus: Arc<InMemoryEventBus>,
    order: Vec<NodeId>,
    sessions: HashMap<NodeId, RendezvousSession>,
    crashed: HashSet<NodeId>,
    peak_coordinators: usize,
}

impl Simulation {
    pub fn new(config: RendezvousConfig) -> Self {
        Self::with_latency(config, DEFAULT_LATENCY)
    }

    pub fn with_latency(config: RendezvousConfig, latency: Duration) -> Self {
        let queue = Arc::new(VirtualQueue::new());
        let network = Arc::new(LoopbackNetwork::new(queue.clone(), latency));
        Self {
            config,
            queue,
            network,
            bus: Arc::new(InMemoryEventBus::new()),
            order: Vec::new(),
            sessions: HashMap::new(),
            crashed: HashSet::new(),
            peak_coordinators: 0,
        }
    }

    /// Create and start a node. Its identity is derived from `seed`.
    pub fn add_node(&mut self, seed: u64) -> Result<NodeId, SessionError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let identity = generate_node_id(&self.config.node_prefix, self.config.suffix_len, &mut rng);
        let port = Arc::new(self.network.port(identity.clone()));
        let ports = SessionPorts {
            transport: port.clone(),
            directory: port.clone(),
            scheduler: port,
            time_source: self.queue.clone(),
            events: self.bus.clone(),
        };
        let mut session =
            RendezvousSession::with_identity(identity.clone(), self.config.clone(), ports, rng);
        session.start()?;

        self.order.push(identity.clone());
        self.sessions.insert(identity.clone(), session);
        self.observe();
        Ok(identity)
    }

    /// Deliver the next pending input. Returns false when nothing is queued.
    pub fn step(&mut self) -> bool {
        self.step_until(u64::MAX)
    }

    fn step_until(&mut self, until_ms: u64) -> bool {
        let Some((node, input)) = self.queue.pop_due(until_ms) else {
            return false;
        };
        if !self.crashed.contains(&node) {
            if let Some(session) = self.sessions.get_mut(&node) {
                session.handle(input);
            }
        }
        self.observe();
        true
    }

    /// Run every input due within `duration` of virtual time.
    pub fn run_for(&mut self, duration: Duration) {
        let until = self.queue.elapsed_ms() + duration.as_millis() as u64;
        while self.step_until(until) {}
        self.queue.advance_to(until);
    }

    /// Run until `done` holds, or `limit` of virtual time passes. Returns
    /// whether `done` held.
    pub fn run_until<F>(&mut self, limit: Duration, mut done: F) -> bool
    where
        F: FnMut(&Simulation) -> bool,
    {
        let until = self.queue.elapsed_ms() + limit.as_millis() as u64;
        loop {
            if done(self) {
                return true;
            }
            if !self.step_until(until) {
                self.queue.advance_to(until);
                return done(self);
            }
        }
    }

    fn observe(&mut self) {
        let coordinators = self.coordinators().len();
        self.peak_coordinators = self.peak_coordinators.max(coordinators);
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn session(&self, node: &NodeId) -> Option<&RendezvousSession> {
        self.sessions.get(node)
    }

    pub fn session_mut(&mut self, node: &NodeId) -> Option<&mut RendezvousSession> {
        self.sessions.get_mut(node)
    }

    /// Nodes in the order they were added.
    pub fn nodes(&self) -> &[NodeId] {
        &self.order
    }

    /// Live nodes currently coordinating.
    pub fn coordinators(&self) -> Vec<NodeId> {
        self.live()
            .filter(|session| session.role() == NodeRole::Coordinator)
            .map(|session| session.identity().clone())
            .collect()
    }

    /// Most coordinators ever observed at once.
    pub fn peak_coordinators(&self) -> usize {
        self.peak_coordinators
    }

    /// Whether `a` and `b` list each other as partners and share an open
    /// connection.
    pub fn are_paired(&self, a: &NodeId, b: &NodeId) -> bool {
        let linked = |x: &NodeId, y: &NodeId| {
            self.sessions
                .get(x)
                .is_some_and(|s| s.partners().contains(y) && s.has_open_connection(y))
        };
        linked(a, b) && linked(b, a)
    }

    /// Whether every live node is paired.
    pub fn all_paired(&self) -> bool {
        self.live().all(|session| session.role() == NodeRole::Paired)
    }

    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    pub fn network(&self) -> &Arc<LoopbackNetwork> {
        &self.network
    }

    /// Virtual milliseconds since the start of the run.
    pub fn elapsed_ms(&self) -> u64 {
        self.queue.elapsed_ms()
    }

    fn live(&self) -> impl Iterator<Item = &RendezvousSession> {
        self.sessions
            .values()
            .filter(|session| !self.crashed.contains(session.identity()))
    }

    // =========================================================================
    // Actions and faults
    // =========================================================================

    pub fn submit(&mut self, node: &NodeId, text: &str) -> Result<Message, SubmitError> {
        match self.sessions.get_mut(node) {
            Some(session) if !self.crashed.contains(node) => session.submit(text),
            _ => Err(SubmitError::NotReady),
        }
    }

    /// Process exit: peers see every connection close.
    pub fn crash(&mut self, node: &NodeId) {
        self.network.disconnect_node(node);
        self.crashed.insert(node.clone());
    }

    /// Silent network loss for `node`.
    pub fn partition(&mut self, node: &NodeId) {
        self.network.partition(node);
    }

    pub fn heal(&mut self, node: &NodeId) {
        self.network.heal(node);
    }

    /// Close every link between `a` and `b`.
    pub fn sever(&mut self, a: &NodeId, b: &NodeId) {
        self.network.sever(a, b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_orders_by_time_then_insertion() {
        let queue = VirtualQueue::new();
        let a = NodeId::from("A");
        queue.deliver(&a, NodeInput::TransportError("late".into()), Duration::from_millis(20));
        queue.deliver(&a, NodeInput::TransportError("first".into()), Duration::from_millis(10));
        queue.deliver(&a, NodeInput::TransportError("second".into()), Duration::from_millis(10));

        let order: Vec<NodeInput> = std::iter::from_fn(|| queue.pop_due(u64::MAX))
            .map(|(_, input)| input)
            .collect();
        assert_eq!(
            order,
            vec![
                NodeInput::TransportError("first".into()),
                NodeInput::TransportError("second".into()),
                NodeInput::TransportError("late".into()),
            ]
        );
        assert_eq!(queue.elapsed_ms(), 20);
    }

    #[test]
    fn test_queue_holds_inputs_past_horizon() {
        let queue = VirtualQueue::new();
        queue.deliver(
            &NodeId::from("A"),
            NodeInput::TransportError("x".into()),
            Duration::from_secs(1),
        );

        assert!(queue.pop_due(999).is_none());
        assert_eq!(queue.pending(), 1);
        assert!(queue.pop_due(1_000).is_some());
        assert_eq!(queue.now_millis(), SIMULATION_EPOCH_MS + 1_000);
    }

    #[test]
    fn test_same_seed_gives_same_identity() {
        let mut one = Simulation::new(RendezvousConfig::for_testing());
        let mut two = Simulation::new(RendezvousConfig::for_testing());
        assert_eq!(one.add_node(42).unwrap(), two.add_node(42).unwrap());
    }
}
