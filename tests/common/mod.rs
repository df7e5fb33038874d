//! Shared test doubles: an in-memory transport that records outbound calls
//! and a connector that hands them out.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dreamer::transport::{ConnectionState, Connector, Receiver, Transport, TransportError};
use tokio::sync::Notify;

/// How a [`RecordingTransport`] answers `wait_for_ready`.
#[derive(Debug, Clone, Copy)]
pub enum Readiness {
    /// Connected as soon as asked.
    Immediate,
    /// Connected after a delay.
    After(Duration),
    /// Never connects.
    Never,
    /// Handshake rejected.
    Reject,
}

/// In-memory transport that records every invoke.
#[derive(Debug)]
pub struct RecordingTransport {
    readiness: Readiness,
    state: Mutex<ConnectionState>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
    started: AtomicBool,
    stopped: AtomicBool,
    lost: Notify,
}

impl RecordingTransport {
    pub fn new(readiness: Readiness) -> Self {
        Self {
            readiness,
            state: Mutex::new(ConnectionState::Disconnected),
            calls: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            lost: Notify::new(),
        }
    }

    /// Already connected; for dispatcher and router tests.
    pub fn connected() -> Self {
        let transport = Self::new(Readiness::Immediate);
        *transport.state.lock().unwrap() = ConnectionState::Connected;
        transport
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn was_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn was_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Simulates the server dropping the connection.
    pub fn lose_connection(&self) {
        *self.state.lock().unwrap() = ConnectionState::Disconnected;
        self.lost.notify_one();
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap() = state;
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn start(&self) {
        self.started.store(true, Ordering::SeqCst);
        self.set_state(ConnectionState::Connecting);
    }

    async fn wait_for_ready(&self) -> Result<(), TransportError> {
        match self.readiness {
            Readiness::Immediate => {}
            Readiness::After(delay) => tokio::time::sleep(delay).await,
            Readiness::Never => std::future::pending::<()>().await,
            Readiness::Reject => {
                self.set_state(ConnectionState::Failed("rejected".to_string()));
                return Err(TransportError::Handshake("rejected".to_string()));
            }
        }
        self.set_state(ConnectionState::Connected);
        Ok(())
    }

    async fn closed(&self) {
        self.lost.notified().await;
    }

    fn state(&self) -> ConnectionState {
        self.state.lock().unwrap().clone()
    }

    fn invoke(&self, method: &str, args: &[String]) -> Result<(), TransportError> {
        if self.state() != ConnectionState::Connected {
            return Err(TransportError::Closed);
        }
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), args.to_vec()));
        Ok(())
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.set_state(ConnectionState::Disconnected);
    }
}

/// Connector handing out [`RecordingTransport`]s.
#[derive(Debug)]
pub struct MockConnector {
    readiness: Mutex<Readiness>,
    fail_create: bool,
    created: Mutex<Vec<Arc<RecordingTransport>>>,
}

impl MockConnector {
    pub fn new(readiness: Readiness) -> Self {
        Self {
            readiness: Mutex::new(readiness),
            fail_create: false,
            created: Mutex::new(Vec::new()),
        }
    }

    /// Every `connect` fails with an invalid target.
    pub fn failing() -> Self {
        Self {
            fail_create: true,
            ..Self::new(Readiness::Immediate)
        }
    }

    /// Readiness for transports created from now on.
    pub fn set_readiness(&self, readiness: Readiness) {
        *self.readiness.lock().unwrap() = readiness;
    }

    pub fn created(&self) -> Vec<Arc<RecordingTransport>> {
        self.created.lock().unwrap().clone()
    }
}

impl Connector for MockConnector {
    fn connect(
        &self,
        target: &str,
        _dial_timeout: Duration,
        _receiver: Receiver,
    ) -> Result<Arc<dyn Transport>, TransportError> {
        if self.fail_create {
            return Err(TransportError::InvalidTarget(target.to_string()));
        }
        let transport = Arc::new(RecordingTransport::new(*self.readiness.lock().unwrap()));
        self.created.lock().unwrap().push(Arc::clone(&transport));
        Ok(transport)
    }
}
