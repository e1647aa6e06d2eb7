//! # Driving Ports (Inbound API)
//!
//! The API a host uses to drive a session, and the inputs it feeds in.

use crate::domain::{ConnectionId, SessionError, SessionSnapshot, SubmitError, TimerId};
use shared_types::{DiagnosticEntry, Message, MessageEnvelope, NodeId, WireMessage};

/// Everything that can happen to a session from the outside.
///
/// Transport callbacks and fired timers are all funnelled through this one
/// type, so the session is a plain state machine over `NodeInput`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeInput {
    /// A remote opened a connection to one of our endpoints. The connection
    /// is already open. `endpoint` is the name it was addressed to: our own
    /// identity or the rendezvous identity.
    IncomingConnection {
        connection: ConnectionId,
        remote: NodeId,
        endpoint: NodeId,
    },
    /// A connection we dialed is now open.
    ConnectionOpened(ConnectionId),
    /// A wire message arrived.
    Data {
        connection: ConnectionId,
        message: WireMessage,
    },
    /// The remote closed the connection.
    ConnectionClosed(ConnectionId),
    /// The connection failed (dial target unavailable, transport fault).
    ConnectionError {
        connection: ConnectionId,
        reason: String,
    },
    /// Endpoint-level failure not tied to one connection.
    TransportError(String),
    TimerFired(TimerId),
}

/// Primary API of a rendezvous session.
///
/// # Example
///
/// ```rust,ignore
/// use pc_01_rendezvous::ports::RendezvousApi;
///
/// session.start()?;
/// while let Some(input) = inputs.recv().await {
///     session.handle(input);
/// }
/// ```
pub trait RendezvousApi {
    /// Open the local endpoint and run the first election.
    ///
    /// # Errors
    ///
    /// `SessionError::TransportInit` if the endpoint cannot be opened. The
    /// session is then inert and must be restarted from scratch.
    fn start(&mut self) -> Result<(), SessionError>;

    /// Feed one transport event or fired timer.
    fn handle(&mut self, input: NodeInput);

    /// Author a chat message and send it to every connected partner.
    ///
    /// # Errors
    ///
    /// - `NotReady` before `start` succeeded
    /// - `EmptyText` if `text` is blank after trimming
    fn submit(&mut self, text: &str) -> Result<Message, SubmitError>;

    /// Merge an inbound envelope and relay it. `via` is the connection it
    /// arrived on, if any.
    fn receive(&mut self, envelope: MessageEnvelope, via: Option<ConnectionId>);

    fn snapshot(&self) -> SessionSnapshot;

    /// Message log, sorted by timestamp.
    fn messages(&self) -> &[Message];

    /// Append-only diagnostic trail.
    fn diagnostics(&self) -> &[DiagnosticEntry];
}
