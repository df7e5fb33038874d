//! Dreamer - terminal client for a SignalR game server.
//!
//! Keeps a persistent hub connection, turns server-pushed events into panel
//! updates, and turns typed commands into outbound hub calls.
//!
//! # Architecture
//!
//! - **Session State** - stage, error state and auth token
//! - **Connection Manager** - owns the transport; connect with timeouts
//! - **Event Dispatcher** - drains inbound calls one at a time, in order
//! - **Command Router** - gates and translates `/commands`
//! - **TUI** - host event loop that owns all of the above
//!
//! # Modules
//!
//! - [`session`] - Session state
//! - [`connection`] - Connection Manager
//! - [`dispatch`] - Event Dispatcher
//! - [`commands`] - Command Router
//! - [`events`] - Typed inbound and lifecycle events
//! - [`transport`] - Transport traits and the SignalR implementation
//! - [`app`] - Application state, panels and key handling
//! - [`tui`] - Terminal host
//! - [`config`] - Configuration loading

pub mod app;
pub mod commands;
pub mod config;
pub mod connection;
pub mod constants;
pub mod dispatch;
pub mod events;
pub mod session;
pub mod transport;
pub mod tui;
pub mod ws;

// Re-export commonly used types
pub use app::App;
pub use commands::{CommandError, CommandRouter};
pub use config::Config;
pub use connection::{ConnectTimeouts, ConnectionManager};
pub use dispatch::EventDispatcher;
pub use events::{LifecycleEvent, ServerEvent};
pub use session::{ErrorKind, SessionState, Stage};
pub use transport::{Connector, InboundCall, Transport, TransportError};
