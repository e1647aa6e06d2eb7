//! # Ports Layer - Hexagonal Architecture Boundaries
//!
//! - **Driving Ports (Inbound):** `RendezvousApi` and the `NodeInput` events
//!   a host feeds into a session
//! - **Driven Ports (Outbound):** transport, directory, scheduler, clock and
//!   configuration the session requires from adapters

pub mod inbound;
pub mod outbound;

pub use inbound::{NodeInput, RendezvousApi};
pub use outbound::{
    ClaimError, ConfigProvider, Directory, Scheduler, TimeSource, Transport, TransportError,
};
