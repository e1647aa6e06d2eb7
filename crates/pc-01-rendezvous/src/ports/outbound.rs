//! # Driven Ports (Outbound SPI)
//!
//! These are the interfaces a session **requires** from its host: a
//! point-to-point transport, a name directory, timers, a clock and
//! configuration.
//!
//! Everything here is fire-and-forget. Anything that completes later (a dial
//! opening, a message arriving, a timer firing) comes back to the session as
//! a [`NodeInput`](crate::ports::inbound::NodeInput).

use crate::domain::{ConnectionId, RendezvousConfig, TimerId};
use shared_types::{NodeId, WireMessage};
use std::time::Duration;

pub use crate::domain::errors::{ClaimError, TransportError};

/// Abstract point-to-point transport.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the session itself is driven from a
/// single task but its ports may be shared with the runtime.
///
/// # Events
///
/// The transport reports back through inputs:
/// - `IncomingConnection` when a remote dials one of our endpoints
/// - `ConnectionOpened` when a dial succeeds
/// - `Data` for every decoded wire message
/// - `ConnectionClosed` / `ConnectionError` when a connection goes away
pub trait Transport: Send + Sync {
    /// Open the self-addressable endpoint for `local`.
    fn open_endpoint(&self, local: &NodeId) -> Result<(), TransportError>;

    /// Start dialing `target`. The returned connection is pending until
    /// `ConnectionOpened` arrives for it.
    fn connect(&self, target: &NodeId) -> Result<ConnectionId, TransportError>;

    /// Send one message. No queueing: a closed connection is an error.
    fn send(&self, connection: ConnectionId, message: &WireMessage) -> Result<(), TransportError>;

    /// Close a connection. The remote end is notified; we are not.
    fn close(&self, connection: ConnectionId);

    /// Whether the connection is currently open.
    fn is_open(&self, connection: ConnectionId) -> bool;
}

/// Name directory with claim-or-fail semantics.
pub trait Directory: Send + Sync {
    /// Register `name` for this process.
    fn claim(&self, name: &NodeId) -> Result<(), ClaimError>;

    /// Give `name` up. Connections that arrived on it are closed.
    fn release(&self, name: &NodeId);
}

/// One-shot timers. A fired timer arrives as `NodeInput::TimerFired`.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, timer: TimerId, after: Duration);
}

/// Abstract wall clock.
///
/// Enables deterministic testing by injecting controllable time sources.
pub trait TimeSource: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}

/// Abstract interface for configuration loading.
pub trait ConfigProvider: Send + Sync {
    fn rendezvous_config(&self) -> RendezvousConfig;
}
