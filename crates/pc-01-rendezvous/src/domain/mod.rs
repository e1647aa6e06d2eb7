//! Domain Layer - Pure protocol logic with no I/O
//!
//! This module contains the building blocks of the rendezvous protocol:
//! - Node and message identity generation
//! - The coordinator's lobby (slot assignment, sealing, acknowledgements)
//! - The partner connection set
//! - The deduplicated, timestamp-ordered message log and relay rules
//! - The append-only diagnostic trail
//! - Timer bookkeeping (first writer wins)

pub mod diagnostics;
pub mod errors;
pub mod identity;
pub mod lobby;
pub mod message_log;
pub mod partners;
pub mod relay;
pub mod timers;
pub mod value_objects;

pub use diagnostics::DiagnosticTrail;
pub use errors::{ClaimError, ConfigError, SessionError, SubmitError, TransportError};
pub use identity::{generate_message_id, generate_node_id, random_suffix};
pub use lobby::{Admission, Lobby, LobbyMember};
pub use message_log::MessageLog;
pub use partners::{PartnerLink, PartnerSet};
pub use relay::{relay_targets, should_relay};
pub use timers::{NextStep, PendingTimers, TimerId, TimerKind};
pub use value_objects::{ConnectionId, RelayPolicy, RendezvousConfig, SessionSnapshot};
