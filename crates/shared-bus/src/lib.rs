//! # Shared Bus - Observer Bus for Session Events
//!
//! Decouples a rendezvous session from whatever renders it. The session
//! publishes typed events; any number of listeners (including none, for
//! headless runs) subscribe with a filter.
//!
//! ```text
//! ┌──────────────────┐                    ┌──────────────┐
//! │ RendezvousSession│                    │  Renderer /  │
//! │                  │    publish()       │ test harness │
//! │                  │ ──────┐            │              │
//! └──────────────────┘       │            └──────────────┘
//!                            ▼                    ↑
//!                      ┌──────────────┐          │
//!                      │  Event Bus   │          │
//!                      │              │ ─────────┘
//!                      └──────────────┘  subscribe()
//! ```
//!
//! Publishing never blocks and never fails: with no receivers the event is
//! dropped, and slow receivers skip ahead when they lag. Skipped events are
//! counted by `Subscription::missed`. The bus is a live feed, so `Log` events
//! on it are best effort; the session's `diagnostics()` is the append-only
//! record.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventTopic, SessionEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, EventSubscriber, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before it starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
