//! Connection Manager.
//!
//! Owns the transport handle and runs the connect-with-timeout sequence:
//!
//! 1. Create a fresh transport for the target (per-attempt dial timeout).
//! 2. Start the session and wait for it to report connected.
//! 3. Race readiness against the overall timeout.
//!
//! Exactly one [`LifecycleEvent`] is produced per attempt. A retry after a
//! failure goes through the whole sequence again with a new handle; nothing
//! from the failed attempt is reused.

// Rust guideline compliant 2026-01

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::constants;
use crate::events::LifecycleEvent;
use crate::session::ErrorKind;
use crate::transport::{Connector, Receiver, Transport};

/// Timeouts for one connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectTimeouts {
    /// Per-attempt dial timeout, passed to the transport.
    pub dial: Duration,
    /// Overall budget for reaching the connected state.
    pub overall: Duration,
}

impl Default for ConnectTimeouts {
    fn default() -> Self {
        Self {
            dial: constants::DIAL_TIMEOUT,
            overall: constants::CONNECT_TIMEOUT,
        }
    }
}

/// Owns the transport handle for the session.
///
/// The Event Dispatcher and Command Router borrow the handle through
/// [`ConnectionManager::transport`]; nothing else holds it.
#[derive(Debug)]
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    target: String,
    timeouts: ConnectTimeouts,
    receiver: Receiver,
    transport: Option<Arc<dyn Transport>>,
}

impl ConnectionManager {
    /// Creates a manager. Inbound calls from every transport it creates are
    /// delivered to `receiver`.
    pub fn new(
        connector: Arc<dyn Connector>,
        target: impl Into<String>,
        timeouts: ConnectTimeouts,
        receiver: Receiver,
    ) -> Self {
        Self {
            connector,
            target: target.into(),
            timeouts,
            receiver,
            transport: None,
        }
    }

    /// Hub URL this manager connects to.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The current transport, if an attempt has created one.
    pub fn transport(&self) -> Option<&dyn Transport> {
        self.transport.as_deref()
    }

    /// Starts a connect attempt.
    ///
    /// The transport is created synchronously so that the handle is owned
    /// here before the returned future runs. The future resolves to
    /// `ConnectionEstablished`, `ConnectionFailed(ConnectionTimeout)` or
    /// `ConnectionFailed(Fatal)`, and never more than one of them.
    pub fn connect(&mut self) -> impl Future<Output = LifecycleEvent> + Send + 'static {
        self.disconnect();

        let overall = self.timeouts.overall;
        let created = self
            .connector
            .connect(&self.target, self.timeouts.dial, self.receiver.clone());
        let transport = created.map(|transport| {
            self.transport = Some(Arc::clone(&transport));
            transport
        });
        let target = self.target.clone();

        async move {
            let transport = match transport {
                Ok(transport) => transport,
                Err(e) => {
                    log::error!("[Connection] Cannot create transport for {}: {}", target, e);
                    return LifecycleEvent::ConnectionFailed(ErrorKind::Fatal);
                }
            };

            log::info!("[Connection] Connecting to {}", target);
            transport.start();

            match tokio::time::timeout(overall, transport.wait_for_ready()).await {
                Ok(Ok(())) => {
                    log::info!("[Connection] Connected to {}", target);
                    LifecycleEvent::ConnectionEstablished
                }
                Ok(Err(e)) => {
                    log::error!("[Connection] Session start failed: {}", e);
                    transport.stop();
                    LifecycleEvent::ConnectionFailed(ErrorKind::Fatal)
                }
                Err(_) => {
                    log::warn!("[Connection] Not connected after {:?}", overall);
                    transport.stop();
                    LifecycleEvent::ConnectionFailed(ErrorKind::ConnectionTimeout)
                }
            }
        }
    }

    /// Future that resolves with `ConnectionFailed(Unknown)` once the current,
    /// established session ends. `None` when there is no transport.
    pub fn watch_closed(&self) -> Option<impl Future<Output = LifecycleEvent> + Send + 'static> {
        let transport = self.transport.clone()?;
        Some(async move {
            transport.closed().await;
            log::warn!("[Connection] Connection lost");
            LifecycleEvent::ConnectionFailed(ErrorKind::Unknown)
        })
    }

    /// Stops and drops the current transport.
    pub fn disconnect(&mut self) {
        if let Some(transport) = self.transport.take() {
            transport.stop();
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}
