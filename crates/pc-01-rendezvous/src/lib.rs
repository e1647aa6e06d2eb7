//! # Rendezvous & Pairing Subsystem
//!
//! **Subsystem ID:** 1
//!
//! Serverless peer pairing over a well-known rendezvous name. Every node
//! races to claim the rendezvous identity; the winner coordinates a lobby,
//! the losers join it, and once the lobby is full everyone is told who their
//! partners are. Partners then chat over direct connections, with messages
//! deduplicated, ordered by timestamp and relayed through the mesh.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Domain Layer:** Pure protocol logic (lobby, partner set, message log,
//!   relay rules, timers)
//! - **Ports Layer:** `RendezvousApi` and `NodeInput` inbound; transport,
//!   directory, scheduler, clock and config outbound
//! - **Service Layer:** `RendezvousSession`, a sans-IO state machine over
//!   `NodeInput`s
//! - **Adapters Layer:** Loopback transport, clocks, config providers
//!
//! ## Protocol at a Glance
//!
//! | Step | Message | Direction |
//! |------|---------|-----------|
//! | 1 | `join { peerId }` | joiner → coordinator |
//! | 2 | `pair { partnerPeerId, members }` | coordinator → each joiner |
//! | 3 | `pair-ack { peerId }` | joiner → coordinator |
//! | 4 | `message { messages, from }` | partner ↔ partner |
//!
//! ## Example
//!
//! ```rust,ignore
//! use pc_01_rendezvous::{RendezvousApi, RendezvousConfig, RendezvousSession, SessionPorts};
//!
//! let mut session = RendezvousSession::new(RendezvousConfig::default(), ports, rng);
//! session.start()?;
//! while let Some(input) = inputs.recv().await {
//!     session.handle(input);
//! }
//! ```

// =============================================================================
// CORE MODULES
// =============================================================================

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// =============================================================================
// FEATURE-GATED MODULES
// =============================================================================

/// Simulation harness (VirtualQueue, Simulation)
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// =============================================================================
// CORE RE-EXPORTS
// =============================================================================

// Domain entities
pub use domain::{
    Admission, ConnectionId, DiagnosticTrail, Lobby, LobbyMember, MessageLog, NextStep,
    PartnerLink, PartnerSet, PendingTimers, RelayPolicy, RendezvousConfig, SessionSnapshot,
    TimerId, TimerKind,
};

// Domain services
pub use domain::{generate_message_id, generate_node_id, random_suffix, relay_targets, should_relay};

// Errors
pub use domain::{ClaimError, ConfigError, SessionError, SubmitError, TransportError};

// Port traits
pub use ports::{
    ConfigProvider, Directory, NodeInput, RendezvousApi, Scheduler, TimeSource, Transport,
};

// Service
pub use service::{ConnectionPurpose, RendezvousSession, SessionPorts};

// =============================================================================
// ADAPTER RE-EXPORTS
// =============================================================================

pub use adapters::{
    InputSink, LoopbackNetwork, LoopbackPort, ManualClock, StaticConfigProvider, SystemTimeSource,
    PEER_UNAVAILABLE,
};

#[cfg(feature = "config-file")]
pub use adapters::TomlConfigProvider;

// Shared types callers need alongside the API
pub use shared_types::{
    DiagnosticEntry, LogLevel, Message, MessageEnvelope, MessageId, NodeId, NodeRole, WireMessage,
};
