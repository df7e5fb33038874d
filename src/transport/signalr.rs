//! SignalR client transport.
//!
//! Implements [`Transport`] with the SignalR JSON hub protocol over a
//! WebSocket. A background tokio task owns the socket; the handle talks to
//! it through channels, in the same shape as the command channel client:
//!
//! ```text
//! SignalRTransport (handle)            run_session (task)
//! ├── outbound_tx ──records──────────> writer (in call order)
//! ├── state (watch) <─────────────────  Connecting / Connected / Failed
//! └── shutdown (CancellationToken) ──> stops dialing or closes the socket
//!                                      reader ──on_call──> Receiver
//! ```
//!
//! # Session start
//!
//! 1. Negotiate (`POST {hub}/negotiate?negotiateVersion=1`) unless skipped
//! 2. Open the WebSocket to `{hub}?id={connectionToken}`
//! 3. Send the JSON protocol handshake and wait for the reply
//!
//! Steps 1-3 run under the per-attempt dial timeout and are retried until
//! the session is stopped. Only a rejected handshake ends the session with
//! `Failed`; the caller's overall timeout covers everything else.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use super::protocol::{self, HubMessage, RecordBuffer};
use super::{ConnectionState, Connector, Receiver, Transport, TransportError};
use crate::config::Config;
use crate::constants;
use crate::ws::{self, Frame, SocketReader, SocketWriter};

/// Creates [`SignalRTransport`]s.
#[derive(Debug, Clone)]
pub struct SignalRConnector {
    http: reqwest::Client,
    skip_negotiation: bool,
    keep_alive: Duration,
}

impl SignalRConnector {
    /// Creates a connector.
    pub fn new(skip_negotiation: bool, keep_alive: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            skip_negotiation,
            keep_alive,
        }
    }

    /// Creates a connector from the client configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.skip_negotiation, config.keep_alive())
    }
}

impl Connector for SignalRConnector {
    fn connect(
        &self,
        target: &str,
        dial_timeout: Duration,
        receiver: Receiver,
    ) -> Result<Arc<dyn Transport>, TransportError> {
        let endpoint = parse_endpoint(target)?;
        let session = SessionConfig {
            endpoint,
            skip_negotiation: self.skip_negotiation,
            dial_timeout,
            keep_alive: self.keep_alive,
            http: self.http.clone(),
        };
        Ok(Arc::new(SignalRTransport::new(session, receiver)))
    }
}

/// Validates a hub URL. Accepts `http`, `https`, `ws` and `wss`.
fn parse_endpoint(target: &str) -> Result<Url, TransportError> {
    let url = Url::parse(target)
        .map_err(|e| TransportError::InvalidTarget(format!("{target}: {e}")))?;
    match url.scheme() {
        "http" | "https" | "ws" | "wss" if url.host_str().is_some() => Ok(url),
        scheme => Err(TransportError::InvalidTarget(format!(
            "{target}: unsupported scheme '{scheme}'"
        ))),
    }
}

/// Everything the session task needs.
#[derive(Debug, Clone)]
struct SessionConfig {
    endpoint: Url,
    skip_negotiation: bool,
    dial_timeout: Duration,
    keep_alive: Duration,
    http: reqwest::Client,
}

/// Parts handed to the session task on `start()`.
#[derive(Debug)]
struct Pending {
    receiver: Receiver,
    outbound_rx: mpsc::UnboundedReceiver<String>,
}

/// State shared between the handle and the session task.
#[derive(Debug)]
struct Shared {
    state: watch::Sender<ConnectionState>,
    failure: OnceLock<TransportError>,
    was_connected: AtomicBool,
    shutdown: CancellationToken,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }
}

/// A SignalR hub session. Dropping the handle stops the session.
#[derive(Debug)]
pub struct SignalRTransport {
    config: SessionConfig,
    pending: Mutex<Option<Pending>>,
    outbound_tx: mpsc::UnboundedSender<String>,
    shared: Arc<Shared>,
}

impl SignalRTransport {
    fn new(config: SessionConfig, receiver: Receiver) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            pending: Mutex::new(Some(Pending {
                receiver,
                outbound_rx,
            })),
            outbound_tx,
            shared: Arc::new(Shared {
                state,
                failure: OnceLock::new(),
                was_connected: AtomicBool::new(false),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    fn started(&self) -> bool {
        self.pending.lock().map_or(true, |pending| pending.is_none())
    }
}

impl Drop for SignalRTransport {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}

#[async_trait]
impl Transport for SignalRTransport {
    fn start(&self) {
        let pending = match self.pending.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        let Some(Pending {
            receiver,
            outbound_rx,
        }) = pending
        else {
            log::warn!("[SignalR] start() called twice; ignoring");
            return;
        };

        self.shared.set_state(ConnectionState::Connecting);
        tokio::spawn(run_session(
            self.config.clone(),
            receiver,
            outbound_rx,
            Arc::clone(&self.shared),
        ));
    }

    async fn wait_for_ready(&self) -> Result<(), TransportError> {
        let mut rx = self.shared.state.subscribe();
        loop {
            let state = rx.borrow_and_update().clone();
            // Readiness was reached even if the session has since ended.
            if self.shared.was_connected.load(Ordering::SeqCst) {
                return Ok(());
            }
            match state {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Failed(reason) => {
                    return Err(self
                        .shared
                        .failure
                        .get()
                        .cloned()
                        .unwrap_or(TransportError::Handshake(reason)));
                }
                ConnectionState::Disconnected if self.started() => {
                    return Err(TransportError::Closed);
                }
                ConnectionState::Disconnected | ConnectionState::Connecting => {}
            }
            if rx.changed().await.is_err() {
                return Err(TransportError::Closed);
            }
        }
    }

    async fn closed(&self) {
        let mut rx = self.shared.state.subscribe();
        loop {
            let connected = *rx.borrow_and_update() == ConnectionState::Connected;
            if !connected && self.shared.was_connected.load(Ordering::SeqCst) {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    fn state(&self) -> ConnectionState {
        self.shared.state.borrow().clone()
    }

    fn invoke(&self, method: &str, args: &[String]) -> Result<(), TransportError> {
        if self.state() != ConnectionState::Connected {
            return Err(TransportError::Closed);
        }
        let record = protocol::encode_invocation(method, args)
            .map_err(|e| TransportError::Send(e.to_string()))?;
        log::debug!("[SignalR] Invoke {} ({} args)", method, args.len());
        self.outbound_tx
            .send(record)
            .map_err(|_| TransportError::Closed)
    }

    fn stop(&self) {
        self.shared.shutdown.cancel();
    }
}

/// Negotiate response (versions 0 and 1).
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct NegotiateResponse {
    connection_id: Option<String>,
    connection_token: Option<String>,
    available_transports: Vec<AvailableTransport>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvailableTransport {
    transport: String,
}

/// Runs the negotiate step and returns the URL to open the WebSocket on.
///
/// Server-reported errors and servers without WebSocket support are fatal
/// ([`TransportError::Handshake`]); HTTP failures are retryable.
pub async fn negotiate(http: &reqwest::Client, endpoint: &Url) -> Result<Url, TransportError> {
    let mut negotiate_url = endpoint.clone();
    let path = format!("{}/negotiate", endpoint.path().trim_end_matches('/'));
    negotiate_url.set_path(&path);
    negotiate_url
        .query_pairs_mut()
        .append_pair("negotiateVersion", "1");

    let response = http
        .post(negotiate_url)
        .send()
        .await
        .map_err(|e| TransportError::Negotiate(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Negotiate(format!("server returned {status}")));
    }
    let body: NegotiateResponse = response
        .json()
        .await
        .map_err(|e| TransportError::Negotiate(e.to_string()))?;

    if let Some(error) = body.error {
        return Err(TransportError::Handshake(error));
    }
    if !body.available_transports.is_empty()
        && !body
            .available_transports
            .iter()
            .any(|t| t.transport == "WebSockets")
    {
        return Err(TransportError::Handshake(
            "server does not offer WebSockets".to_string(),
        ));
    }
    let id = body
        .connection_token
        .or(body.connection_id)
        .ok_or_else(|| TransportError::Negotiate("no connection id in response".to_string()))?;

    let mut ws_url = endpoint.clone();
    ws_url.query_pairs_mut().append_pair("id", &id);
    Ok(ws_url)
}

/// An open, handshaken socket.
struct Established {
    writer: SocketWriter,
    reader: SocketReader,
    records: RecordBuffer,
    backlog: Vec<String>,
}

/// Negotiate, dial and handshake once.
async fn establish(config: &SessionConfig) -> Result<Established, TransportError> {
    let url = if config.skip_negotiation {
        config.endpoint.clone()
    } else {
        negotiate(&config.http, &config.endpoint).await?
    };
    let (mut writer, mut reader) = ws::connect(&url)
        .await
        .map_err(|e| TransportError::Dial(format!("{e:#}")))?;
    writer
        .send_text(&protocol::handshake_request())
        .await
        .map_err(|e| TransportError::Dial(format!("{e:#}")))?;

    let mut records = RecordBuffer::new();
    loop {
        match reader.recv().await {
            Some(Ok(Frame::Text(text))) => {
                let mut complete = records.push(&text);
                if complete.is_empty() {
                    continue;
                }
                let reply = complete.remove(0);
                protocol::parse_handshake_response(&reply).map_err(TransportError::Handshake)?;
                return Ok(Established {
                    writer,
                    reader,
                    records,
                    backlog: complete,
                });
            }
            Some(Ok(Frame::Close { code, reason })) => {
                return Err(TransportError::Dial(format!(
                    "closed during handshake ({code}: {reason})"
                )));
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(TransportError::Dial(format!("{e:#}"))),
            None => {
                return Err(TransportError::Dial("closed during handshake".to_string()));
            }
        }
    }
}

/// Dial until connected, a fatal error, or shutdown (handled by the caller).
async fn establish_with_retry(config: &SessionConfig) -> Result<Established, TransportError> {
    loop {
        match tokio::time::timeout(config.dial_timeout, establish(config)).await {
            Ok(Ok(established)) => return Ok(established),
            Ok(Err(e)) if e.is_fatal() => return Err(e),
            Ok(Err(e)) => log::debug!("[SignalR] {}; retrying", e),
            Err(_) => log::debug!(
                "[SignalR] Dial timed out after {:?}; retrying",
                config.dial_timeout
            ),
        }
        tokio::time::sleep(constants::DIAL_RETRY_DELAY).await;
    }
}

/// What to do after handling a record.
enum Flow {
    Continue,
    Close,
}

fn handle_record(record: &str, receiver: &Receiver) -> Flow {
    match protocol::decode_message(record) {
        Ok(HubMessage::Invocation { target, arguments }) => {
            let call = protocol::into_inbound_call(target, arguments);
            log::debug!("[SignalR] Inbound call {}", call.caller_name);
            if receiver.on_call(call.caller_name, call.payload) {
                Flow::Continue
            } else {
                log::info!("[SignalR] Receiver gone; closing session");
                Flow::Close
            }
        }
        Ok(HubMessage::Close { error }) => {
            log::info!("[SignalR] Server closed the session: {:?}", error);
            Flow::Close
        }
        Ok(HubMessage::Ping | HubMessage::Result) => Flow::Continue,
        Ok(HubMessage::Other(kind)) => {
            log::debug!("[SignalR] Ignoring message type {}", kind);
            Flow::Continue
        }
        Err(e) => {
            log::warn!("[SignalR] Dropping malformed record: {}", e);
            Flow::Continue
        }
    }
}

/// Session task: connect, then pump records both ways until closed.
async fn run_session(
    config: SessionConfig,
    receiver: Receiver,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    shared: Arc<Shared>,
) {
    log::info!("[SignalR] Connecting to {}", config.endpoint);

    let established = tokio::select! {
        () = shared.shutdown.cancelled() => None,
        result = establish_with_retry(&config) => Some(result),
    };

    let Established {
        mut writer,
        mut reader,
        mut records,
        backlog,
    } = match established {
        None => {
            log::info!("[SignalR] Stopped before connecting");
            shared.set_state(ConnectionState::Disconnected);
            return;
        }
        Some(Err(e)) => {
            log::error!("[SignalR] {}", e);
            let reason = e.to_string();
            let _ = shared.failure.set(e);
            shared.set_state(ConnectionState::Failed(reason));
            return;
        }
        Some(Ok(established)) => established,
    };

    shared.was_connected.store(true, Ordering::SeqCst);
    shared.set_state(ConnectionState::Connected);
    log::info!("[SignalR] Connected");

    let mut open = backlog
        .iter()
        .all(|record| matches!(handle_record(record, &receiver), Flow::Continue));

    let mut keep_alive = tokio::time::interval_at(
        tokio::time::Instant::now() + config.keep_alive,
        config.keep_alive,
    );

    while open {
        tokio::select! {
            () = shared.shutdown.cancelled() => {
                let _ = writer.close().await;
                break;
            }
            Some(record) = outbound_rx.recv() => {
                if let Err(e) = writer.send_text(&record).await {
                    log::warn!("[SignalR] {:#}", e);
                    break;
                }
            }
            _ = keep_alive.tick() => {
                if let Err(e) = writer.send_text(&protocol::encode_ping()).await {
                    log::warn!("[SignalR] Keep-alive failed: {:#}", e);
                    break;
                }
            }
            message = reader.recv() => match message {
                Some(Ok(Frame::Text(text))) => {
                    open = records
                        .push(&text)
                        .iter()
                        .all(|record| matches!(handle_record(record, &receiver), Flow::Continue));
                }
                Some(Ok(Frame::Ping(data))) => {
                    let _ = writer.send_pong(data).await;
                }
                Some(Ok(Frame::Close { code, reason })) => {
                    log::info!("[SignalR] Socket closed ({}: {})", code, reason);
                    break;
                }
                Some(Err(e)) => {
                    log::warn!("[SignalR] {:#}", e);
                    break;
                }
                None => break,
            },
        }
    }

    if records.has_partial() {
        log::warn!("[SignalR] Session ended with an incomplete record buffered");
    }
    shared.set_state(ConnectionState::Disconnected);
    log::info!("[SignalR] Session ended");
}
