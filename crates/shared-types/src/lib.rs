//! # Shared Types Crate
//!
//! This crate contains the domain entities and wire protocol types that are
//! shared by every Pair-Chain crate.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: node identities, chat messages and wire
//!   messages are defined once, here.
//! - **Self-describing wire format**: every wire message is a JSON object
//!   carrying a `type` discriminator, so receivers dispatch on the message
//!   kind and never on the connection that delivered it.
//! - **Immutable messages**: a [`Message`] never changes after creation; its
//!   `id` is the deduplication key.

pub mod codec;
pub mod entities;
pub mod errors;
pub mod wire;

pub use codec::{decode, encode};
pub use entities::*;
pub use errors::*;
pub use wire::*;
