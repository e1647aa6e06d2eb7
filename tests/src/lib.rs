//! # Pair-Chain Test Suite
//!
//! Whole-swarm scenarios. Every test runs real sessions over the loopback
//! hub under the virtual clock of `pc_01_rendezvous::testing::Simulation`,
//! so runs are deterministic and take no wall-clock time.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── pairing.rs    # election and two-node pairing
//!     ├── lobby.rs      # races, larger lobbies, swarm convergence
//!     ├── messaging.rs  # submit, ordering, relay
//!     └── recovery.rs   # crash, partition, sever
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p pc-tests
//!
//! # By area
//! cargo test -p pc-tests integration::recovery::
//! ```

#![allow(dead_code)]

pub mod integration;
