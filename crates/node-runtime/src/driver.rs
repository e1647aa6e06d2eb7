//! # Swarm Driver
//!
//! Runs each [`RendezvousSession`] in its own tokio task. The loopback hub
//! delivers into a [`ChannelSink`], which feeds every node an ordered queue
//! of transport inputs and spawns a sleeper per timer.
//!
//! ```text
//!  LoopbackNetwork ──deliver──▶ ChannelSink ──mpsc──▶ node task ──▶ session.handle
//!                                    ▲                     │
//!                                    └──── ports ──────────┘
//! ```

use crate::config::RuntimeConfig;
use pc_01_rendezvous::{
    generate_node_id, InputSink, LoopbackNetwork, NodeInput, RendezvousApi, RendezvousSession,
    SessionError, SessionPorts, SessionSnapshot, SubmitError, SystemTimeSource,
};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared_bus::InMemoryEventBus;
use shared_types::{Message, NodeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Driver errors.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("no node at index {0}")]
    UnknownNode(usize),

    #[error("node task has stopped")]
    Stopped,

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

// =============================================================================
// ChannelSink
// =============================================================================

/// A transport input and when it is due.
#[derive(Debug)]
pub struct Delivery {
    pub due: Instant,
    pub input: NodeInput,
}

/// [`InputSink`] over per-node tokio channels.
///
/// Transport inputs share one latency, so queueing them with a due time
/// keeps per-node order. Timers have their own delays and are slept on
/// separately.
#[derive(Default)]
pub struct ChannelSink {
    routes: RwLock<HashMap<NodeId, mpsc::UnboundedSender<Delivery>>>,
}

impl ChannelSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route inputs for `node` into a new channel.
    pub fn register(&self, node: NodeId) -> mpsc::UnboundedReceiver<Delivery> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.routes.write().insert(node, tx);
        rx
    }

    pub fn unregister(&self, node: &NodeId) {
        self.routes.write().remove(node);
    }
}

impl InputSink for ChannelSink {
    fn deliver(&self, node: &NodeId, input: NodeInput, delay: Duration) {
        let Some(tx) = self.routes.read().get(node).cloned() else {
            debug!(node = %node, "Input for unknown node dropped");
            return;
        };

        if matches!(input, NodeInput::TimerFired(_)) {
            let Ok(handle) = tokio::runtime::Handle::try_current() else {
                warn!(node = %node, "Timer scheduled outside the runtime, dropped");
                return;
            };
            handle.spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = tx.send(Delivery {
                    due: Instant::now(),
                    input,
                });
            });
        } else {
            let _ = tx.send(Delivery {
                due: Instant::now() + delay,
                input,
            });
        }
    }
}

// =============================================================================
// Node task
// =============================================================================

enum Command {
    Submit(String, oneshot::Sender<Result<Message, SubmitError>>),
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Messages(oneshot::Sender<Vec<Message>>),
}

async fn run_node(
    mut session: RendezvousSession,
    mut inputs: mpsc::UnboundedReceiver<Delivery>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            Some(delivery) = inputs.recv() => {
                tokio::time::sleep_until(delivery.due).await;
                session.handle(delivery.input);
            }
            Some(command) = commands.recv() => match command {
                Command::Submit(text, reply) => {
                    let _ = reply.send(session.submit(&text));
                }
                Command::Snapshot(reply) => {
                    let _ = reply.send(session.snapshot());
                }
                Command::Messages(reply) => {
                    let _ = reply.send(session.messages().to_vec());
                }
            },
            _ = shutdown.changed() => {
                info!(node = %session.identity(), "Shutdown signal received");
                break;
            }
            else => break,
        }
    }
}

/// Handle on one running node.
pub struct NodeHandle {
    id: NodeId,
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl NodeHandle {
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, DriverError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .map_err(|_| DriverError::Stopped)?;
        rx.await.map_err(|_| DriverError::Stopped)
    }
}

// =============================================================================
// Swarm
// =============================================================================

/// Every node of this process, sharing one loopback hub and one event bus.
pub struct Swarm {
    network: Arc<LoopbackNetwork>,
    sink: Arc<ChannelSink>,
    bus: Arc<InMemoryEventBus>,
    nodes: Vec<NodeHandle>,
    shutdown_tx: watch::Sender<bool>,
}

impl Swarm {
    /// Start `config.nodes` sessions. Must run inside a tokio runtime.
    pub fn spawn(config: &RuntimeConfig, bus: Arc<InMemoryEventBus>) -> Result<Self, DriverError> {
        let sink = Arc::new(ChannelSink::new());
        let network = Arc::new(LoopbackNetwork::new(sink.clone(), config.latency));
        let (shutdown_tx, _) = watch::channel(false);

        let mut swarm = Self {
            network,
            sink,
            bus,
            nodes: Vec::with_capacity(config.nodes),
            shutdown_tx,
        };
        for _ in 0..config.nodes {
            swarm.spawn_node(&config.rendezvous)?;
        }
        info!(nodes = swarm.nodes.len(), "Swarm started");
        Ok(swarm)
    }

    fn spawn_node(
        &mut self,
        config: &pc_01_rendezvous::RendezvousConfig,
    ) -> Result<(), DriverError> {
        let mut rng = StdRng::from_entropy();
        let id = generate_node_id(&config.node_prefix, config.suffix_len, &mut rng);
        let inputs = self.sink.register(id.clone());

        let port = Arc::new(self.network.port(id.clone()));
        let ports = SessionPorts {
            transport: port.clone(),
            directory: port.clone(),
            scheduler: port,
            time_source: Arc::new(SystemTimeSource::new()),
            events: self.bus.clone(),
        };
        let mut session = RendezvousSession::with_identity(id.clone(), config.clone(), ports, rng);
        if let Err(e) = session.start() {
            self.sink.unregister(&id);
            return Err(e.into());
        }

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_node(
            session,
            inputs,
            commands_rx,
            self.shutdown_tx.subscribe(),
        ));
        self.nodes.push(NodeHandle {
            id,
            commands: commands_tx,
            task,
        });
        Ok(())
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    pub fn network(&self) -> &Arc<LoopbackNetwork> {
        &self.network
    }

    fn node(&self, index: usize) -> Result<&NodeHandle, DriverError> {
        self.nodes.get(index).ok_or(DriverError::UnknownNode(index))
    }

    /// Submit a chat line on node `index`.
    pub async fn submit(&self, index: usize, text: &str) -> Result<Message, DriverError> {
        let text = text.to_string();
        let result = self
            .node(index)?
            .request(|reply| Command::Submit(text, reply))
            .await?;
        Ok(result?)
    }

    pub async fn snapshot(&self, index: usize) -> Result<SessionSnapshot, DriverError> {
        self.node(index)?.request(Command::Snapshot).await
    }

    pub async fn messages(&self, index: usize) -> Result<Vec<Message>, DriverError> {
        self.node(index)?.request(Command::Messages).await
    }

    /// Stop every node task and wait for them to finish.
    pub async fn shutdown(self) {
        info!("Initiating graceful shutdown...");
        let _ = self.shutdown_tx.send(true);
        for node in self.nodes {
            self.network.disconnect_node(&node.id);
            if let Err(e) = node.task.await {
                warn!(node = %node.id, error = %e, "Node task failed");
            }
        }
        info!("Shutdown complete");
    }
}
