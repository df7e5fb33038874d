//! Hub socket.
//!
//! Splits a `tokio-tungstenite` stream into a [`SocketWriter`] and a
//! [`SocketReader`] so the session task can select over both. The reader
//! only surfaces what the SignalR JSON protocol cares about: text, pings
//! and the close frame.

use anyhow::{Context, Result};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Stream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Close code reported when the peer closes without one.
pub const NO_STATUS_CODE: u16 = 1005;

/// A frame from the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Text frame; may hold several records.
    Text(String),
    /// Ping to be answered with a pong.
    Ping(Vec<u8>),
    /// Peer closed the socket.
    Close {
        /// Close code.
        code: u16,
        /// Close reason, possibly empty.
        reason: String,
    },
}

/// Sending half.
#[derive(Debug)]
pub struct SocketWriter {
    sink: SplitSink<Stream, Message>,
}

impl SocketWriter {
    /// Sends one text frame.
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.sink
            .send(Message::Text(text.to_owned()))
            .await
            .context("hub socket send failed")
    }

    pub async fn send_pong(&mut self, payload: Vec<u8>) -> Result<()> {
        self.sink
            .send(Message::Pong(payload))
            .await
            .context("hub socket pong failed")
    }

    /// Sends a close frame.
    pub async fn close(&mut self) -> Result<()> {
        self.sink.close().await.context("hub socket close failed")
    }
}

/// Receiving half.
#[derive(Debug)]
pub struct SocketReader {
    stream: SplitStream<Stream>,
}

impl SocketReader {
    /// Next frame, or `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<Result<Frame>> {
        while let Some(message) = self.stream.next().await {
            let frame = match message {
                Ok(Message::Text(text)) => Frame::Text(text),
                Ok(Message::Ping(payload)) => Frame::Ping(payload),
                Ok(Message::Close(close)) => match close {
                    Some(close) => Frame::Close {
                        code: close.code.into(),
                        reason: close.reason.into_owned(),
                    },
                    None => Frame::Close {
                        code: NO_STATUS_CODE,
                        reason: String::new(),
                    },
                },
                Ok(Message::Binary(data)) => {
                    log::trace!("[Socket] Skipping {}-byte binary frame", data.len());
                    continue;
                }
                Ok(Message::Pong(_) | Message::Frame(_)) => continue,
                Err(e) => return Some(Err(anyhow::Error::new(e).context("hub socket read failed"))),
            };
            return Some(Ok(frame));
        }
        None
    }
}

/// Socket URL for a hub endpoint: `http` becomes `ws`, `https` becomes `wss`.
pub fn socket_url(endpoint: &Url) -> Url {
    let scheme = match endpoint.scheme() {
        "http" => "ws",
        "https" => "wss",
        _ => return endpoint.clone(),
    };
    let mut url = endpoint.clone();
    if url.set_scheme(scheme).is_err() {
        log::warn!("[Socket] Could not rewrite scheme of {}", endpoint);
    }
    url
}

/// Opens the hub socket at `endpoint`.
pub async fn connect(endpoint: &Url) -> Result<(SocketWriter, SocketReader)> {
    let url = socket_url(endpoint);
    let (stream, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .with_context(|| format!("could not open hub socket at {url}"))?;
    let (sink, stream) = stream.split();
    Ok((SocketWriter { sink }, SocketReader { stream }))
}
