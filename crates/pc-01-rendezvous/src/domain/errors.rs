//! Domain errors.

use shared_types::NodeId;
use thiserror::Error;

/// Rejection of a local `submit`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// Text is empty after trimming.
    #[error("Message cannot be empty")]
    EmptyText,
    /// The local endpoint is not open yet.
    #[error("Peer not initialized")]
    NotReady,
}

/// Fatal session failures. Everything else self-heals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The local endpoint could not be opened. Not retried.
    #[error("Transport initialisation failed: {0}")]
    TransportInit(TransportError),

    /// `start` was called twice.
    #[error("Session already started")]
    AlreadyStarted,
}

/// Errors reported synchronously by a transport.
///
/// Asynchronous failures (a dial that never opens, a connection that drops)
/// arrive as inputs instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The transport itself cannot be reached.
    #[error("Transport unreachable: {0}")]
    Unreachable(String),

    /// The local endpoint name is already registered.
    #[error("Endpoint already taken: {0}")]
    EndpointTaken(NodeId),

    /// No such connection.
    #[error("Unknown connection")]
    UnknownConnection,

    /// The connection exists but is not open.
    #[error("Connection not open")]
    NotOpen,

    #[error("Codec failure: {0}")]
    Codec(#[from] shared_types::CodecError),
}

/// Outcome of claiming a name in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    /// Another live process holds the name.
    #[error("Name already taken: {0}")]
    AlreadyTaken(NodeId),

    /// The directory could not be reached.
    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

/// Invalid or unreadable configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Lobby capacity must be at least 2, got {0}")]
    CapacityTooSmall(usize),

    #[error("Rendezvous identity must not be empty")]
    EmptyRendezvousId,

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to read config file {path}: {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),
}
