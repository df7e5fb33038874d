//! Transport abstraction for the hub connection.
//!
//! The client core only needs five things from an RPC transport: create a
//! handle for a target, start the session, wait until it is connected,
//! fire outbound calls, and deliver inbound calls to a receiver. This module
//! defines that seam as the [`Connector`] and [`Transport`] traits.
//!
//! # Architecture
//!
//! ```text
//! Connector (trait) ──connect(target, Receiver)──> Arc<dyn Transport>
//!     │
//!     └── SignalRConnector
//!         └── SignalRTransport: negotiate + WebSocket + JSON hub protocol
//!
//! Transport ──on_call(caller, payload)──> Receiver ──mpsc──> EventDispatcher
//! ```
//!
//! Inbound calls are pushed by value into an unbounded queue; the transport's
//! reader task never blocks on the UI.

pub mod protocol;
pub mod signalr;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

pub use signalr::{SignalRConnector, SignalRTransport};

/// A remote call received from the server.
///
/// Produced by the transport's receiver callback, handed by value to the
/// dispatch queue and consumed exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundCall {
    /// Name identifying the event kind. Not validated here.
    pub caller_name: String,
    /// Untyped payload; a JSON string for some callers.
    pub payload: serde_json::Value,
}

impl InboundCall {
    /// Creates an inbound call.
    pub fn new(caller_name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            caller_name: caller_name.into(),
            payload,
        }
    }
}

/// Callback surface through which a transport delivers inbound calls.
///
/// Cloned into every transport created for the session; all clones feed the
/// same dispatch queue.
#[derive(Debug, Clone)]
pub struct Receiver {
    tx: mpsc::UnboundedSender<InboundCall>,
}

impl Receiver {
    /// Wraps the sending half of the dispatch queue.
    pub fn new(tx: mpsc::UnboundedSender<InboundCall>) -> Self {
        Self { tx }
    }

    /// Delivers one inbound call. Returns false once the queue is gone.
    pub fn on_call(&self, caller_name: impl Into<String>, payload: serde_json::Value) -> bool {
        self.tx.send(InboundCall::new(caller_name, payload)).is_ok()
    }
}

/// Connection state reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Created but not started, or stopped.
    #[default]
    Disconnected,
    /// Started; dialing or handshaking.
    Connecting,
    /// Session established; calls flow both ways.
    Connected,
    /// The session could not be established and will not be retried.
    Failed(String),
}

/// Errors produced by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The target URL is unusable.
    InvalidTarget(String),
    /// Dial failed or timed out. Retried while a connect attempt is live.
    Dial(String),
    /// The HTTP negotiate step failed. Retried like a dial failure.
    Negotiate(String),
    /// The server rejected the protocol handshake.
    Handshake(String),
    /// An outbound call could not be queued or written.
    Send(String),
    /// The session is closed.
    Closed,
}

impl TransportError {
    /// Errors that no amount of retrying within an attempt can fix.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidTarget(_) | Self::Handshake(_))
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTarget(msg) => write!(f, "Invalid target: {msg}"),
            Self::Dial(msg) => write!(f, "Dial failed: {msg}"),
            Self::Negotiate(msg) => write!(f, "Negotiate failed: {msg}"),
            Self::Handshake(msg) => write!(f, "Handshake rejected: {msg}"),
            Self::Send(msg) => write!(f, "Send failed: {msg}"),
            Self::Closed => write!(f, "Connection closed"),
        }
    }
}

impl std::error::Error for TransportError {}

/// A live (or starting) RPC session with the server.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Begins the session. Calling it twice has no effect.
    fn start(&self);

    /// Resolves once the session is connected, or with the error that
    /// stopped it. Dial failures are retried internally and never surface
    /// here; the caller bounds the wait with its own timeout.
    async fn wait_for_ready(&self) -> Result<(), TransportError>;

    /// Resolves when a session that was connected has ended.
    async fn closed(&self);

    /// Current connection state.
    fn state(&self) -> ConnectionState;

    /// Fires an outbound call. No return value is awaited.
    ///
    /// Calls are written in the order they are made.
    fn invoke(&self, method: &str, args: &[String]) -> Result<(), TransportError>;

    /// Stops the session and any dial attempts in flight.
    fn stop(&self);
}

/// Creates transports. Each call returns a fresh, unstarted handle.
pub trait Connector: Send + Sync + std::fmt::Debug {
    /// Creates a transport for `target` that delivers inbound calls to
    /// `receiver`.
    fn connect(
        &self,
        target: &str,
        dial_timeout: Duration,
        receiver: Receiver,
    ) -> Result<Arc<dyn Transport>, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(TransportError::InvalidTarget("x".into()).is_fatal());
        assert!(TransportError::Handshake("x".into()).is_fatal());
        assert!(!TransportError::Dial("x".into()).is_fatal());
        assert!(!TransportError::Negotiate("x".into()).is_fatal());
        assert!(!TransportError::Closed.is_fatal());
    }

    #[test]
    fn test_receiver_delivers_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let receiver = Receiver::new(tx);
        assert!(receiver.on_call("A", serde_json::json!(1)));
        assert!(receiver.clone().on_call("B", serde_json::json!(2)));

        assert_eq!(rx.try_recv().unwrap().caller_name, "A");
        assert_eq!(rx.try_recv().unwrap().caller_name, "B");
    }

    #[test]
    fn test_receiver_reports_closed_queue() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        assert!(!Receiver::new(tx).on_call("A", serde_json::Value::Null));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            TransportError::Handshake("bad protocol".into()).to_string(),
            "Handshake rejected: bad protocol"
        );
        assert_eq!(TransportError::Closed.to_string(), "Connection closed");
    }
}
