//! # Rendezvous Service
//!
//! `RendezvousSession` implements the `RendezvousApi` port. It wraps the
//! domain pieces (lobby, partner set, message log, timers) and drives them
//! from `NodeInput` events, issuing commands through the outbound ports.
//!
//! ## Role transitions
//!
//! ```text
//!  Unclaimed ──claim ok──▶ Coordinator ──lobby acked──▶ Paired
//!      │                                                 ▲  │
//!      └──claim taken──▶ Joiner ──pair──────────────────┘  │
//!                         ▲  │                              │
//!                         │  └─bootstrap lost─▶ claim       │
//!                         └──────── last partner lost ──────┘
//! ```

// Semantic submodules
mod bootstrap;
mod coordinator;
mod core;
mod dispatch;
mod maintenance;
mod messaging;
mod pairing;

// Re-export public API
pub use self::core::{ConnectionPurpose, RendezvousSession, SessionPorts};
