use crate::domain::{
    generate_node_id, ConnectionId, DiagnosticTrail, Lobby, MessageLog, PartnerSet,
    PendingTimers, RendezvousConfig, TimerKind,
};
use crate::ports::{Directory, Scheduler, TimeSource, Transport};
use rand::rngs::StdRng;
use shared_bus::{EventPublisher, SessionEvent};
use shared_types::{LogLevel, NodeId, NodeRole, WireMessage};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Why a connection exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPurpose {
    /// We dialed the rendezvous identity to join a lobby.
    Bootstrap,
    /// Direct connection to a partner, dialed or accepted.
    Partner,
    /// A joiner dialed our rendezvous endpoint.
    LobbyClient,
    /// A node dialed our own endpoint before we knew it as a partner.
    Incoming,
}

#[derive(Debug, Clone)]
pub(crate) struct ConnectionEntry {
    pub(crate) remote: NodeId,
    pub(crate) purpose: ConnectionPurpose,
    pub(crate) open: bool,
    /// When the entry was created, wall-clock milliseconds.
    pub(crate) since_ms: u64,
}

/// The driven ports a session talks to.
#[derive(Clone)]
pub struct SessionPorts {
    pub transport: Arc<dyn Transport>,
    pub directory: Arc<dyn Directory>,
    pub scheduler: Arc<dyn Scheduler>,
    pub time_source: Arc<dyn TimeSource>,
    pub events: Arc<dyn EventPublisher>,
}

/// One node's rendezvous session.
///
/// Owns every piece of protocol state for the process: identity, role, the
/// lobby while coordinating, partners, connections, timers, the message log
/// and the diagnostic trail. Handlers take `&mut self`; the host feeds one
/// session from one task, so no locking is needed.
///
/// # Example
///
/// ```rust,ignore
/// use pc_01_rendezvous::{RendezvousApi, RendezvousConfig, RendezvousSession};
///
/// let mut session = RendezvousSession::new(RendezvousConfig::default(), ports, rng);
/// session.start()?;
/// session.handle(input);
/// ```
pub struct RendezvousSession {
    pub(crate) identity: NodeId,
    pub(crate) config: RendezvousConfig,
    pub(crate) role: NodeRole,
    /// Local endpoint is open.
    pub(crate) initialized: bool,
    /// Present only while coordinating.
    pub(crate) lobby: Option<Lobby>,
    pub(crate) partners: PartnerSet,
    pub(crate) connections: HashMap<ConnectionId, ConnectionEntry>,
    /// Pending or open connection to the rendezvous identity.
    pub(crate) bootstrap: Option<ConnectionId>,
    pub(crate) timers: PendingTimers,
    pub(crate) log: MessageLog,
    pub(crate) diagnostics: DiagnosticTrail,
    pub(crate) status: String,
    pub(crate) ports: SessionPorts,
    pub(crate) rng: StdRng,
}

impl RendezvousSession {
    /// Create a session with a freshly generated identity.
    pub fn new(config: RendezvousConfig, ports: SessionPorts, mut rng: StdRng) -> Self {
        let identity = generate_node_id(&config.node_prefix, config.suffix_len, &mut rng);
        Self::with_identity(identity, config, ports, rng)
    }

    /// Create a session with a given identity.
    pub fn with_identity(
        identity: NodeId,
        config: RendezvousConfig,
        ports: SessionPorts,
        rng: StdRng,
    ) -> Self {
        Self {
            identity,
            config,
            role: NodeRole::Unclaimed,
            initialized: false,
            lobby: None,
            partners: PartnerSet::new(),
            connections: HashMap::new(),
            bootstrap: None,
            timers: PendingTimers::new(),
            log: MessageLog::new(),
            diagnostics: DiagnosticTrail::new(),
            status: String::new(),
            ports,
            rng,
        }
    }

    pub fn identity(&self) -> &NodeId {
        &self.identity
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn config(&self) -> &RendezvousConfig {
        &self.config
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Partner identities in order.
    pub fn partners(&self) -> Vec<NodeId> {
        self.partners.ids()
    }

    pub fn lobby(&self) -> Option<&Lobby> {
        self.lobby.as_ref()
    }

    /// Whether `peer` is reachable over at least one open connection.
    pub fn has_open_connection(&self, peer: &NodeId) -> bool {
        self.open_connection_to(peer).is_some()
    }

    // =========================================================================
    // Connection helpers
    // =========================================================================

    pub(crate) fn now_ms(&self) -> u64 {
        self.ports.time_source.now_millis()
    }

    pub(crate) fn is_open(&self, connection: ConnectionId) -> bool {
        self.connections
            .get(&connection)
            .is_some_and(|entry| entry.open)
            && self.ports.transport.is_open(connection)
    }

    /// First open connection to a partner, primary preferred.
    pub(crate) fn open_connection_to(&self, peer: &NodeId) -> Option<ConnectionId> {
        self.partners
            .connections(peer)
            .into_iter()
            .find(|c| self.is_open(*c))
    }

    pub(crate) fn track(
        &mut self,
        connection: ConnectionId,
        remote: NodeId,
        purpose: ConnectionPurpose,
        open: bool,
    ) {
        let since_ms = self.now_ms();
        self.connections.insert(
            connection,
            ConnectionEntry {
                remote,
                purpose,
                open,
                since_ms,
            },
        );
    }

    /// Close and forget a connection.
    pub(crate) fn drop_connection(&mut self, connection: ConnectionId) {
        self.connections.remove(&connection);
        self.ports.transport.close(connection);
    }

    pub(crate) fn send(&mut self, connection: ConnectionId, message: &WireMessage) -> bool {
        match self.ports.transport.send(connection, message) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    node = %self.identity,
                    connection = %connection,
                    kind = message.kind(),
                    error = %e,
                    "Send failed"
                );
                false
            }
        }
    }

    /// Send to a partner over its first open connection.
    pub(crate) fn send_to_partner(&mut self, peer: &NodeId, message: &WireMessage) -> bool {
        match self.open_connection_to(peer) {
            Some(connection) => self.send(connection, message),
            None => false,
        }
    }

    // =========================================================================
    // Timers
    // =========================================================================

    pub(crate) fn arm_timer(&mut self, kind: TimerKind, after: Duration) {
        let id = self.timers.arm(kind);
        self.ports.scheduler.schedule(id, after);
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// Append to the diagnostic trail, mirror to tracing, publish on the bus.
    pub(crate) fn note(&mut self, level: LogLevel, text: impl Into<String>) {
        let at_ms = self.now_ms();
        let entry = self.diagnostics.push(level, text, at_ms);
        match level {
            LogLevel::Error => error!(node = %self.identity, "{}", entry.text),
            LogLevel::Warning => warn!(node = %self.identity, "{}", entry.text),
            LogLevel::Notice => info!(node = %self.identity, "{}", entry.text),
            LogLevel::Info | LogLevel::Probe => debug!(node = %self.identity, "{}", entry.text),
        }
        self.ports.events.publish(SessionEvent::Log {
            node: self.identity.clone(),
            entry,
        });
    }

    pub(crate) fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        self.ports.events.publish(SessionEvent::StatusChanged {
            node: self.identity.clone(),
            status: self.status.clone(),
        });
    }

    pub(crate) fn set_role(&mut self, role: NodeRole) {
        self.role = role;
        self.publish_partners();
    }

    /// Publish the current role and partner set.
    pub(crate) fn publish_partners(&self) {
        self.ports.events.publish(SessionEvent::RoleChanged {
            node: self.identity.clone(),
            role: self.role,
            partners: self.partners.ids(),
        });
    }

    pub(crate) fn publish_lobby(&self) {
        if let Some(lobby) = &self.lobby {
            self.ports.events.publish(SessionEvent::LobbyChanged {
                node: self.identity.clone(),
                members: lobby.members(),
                capacity: lobby.capacity(),
                sealed: lobby.is_sealed(),
            });
        }
    }
}
