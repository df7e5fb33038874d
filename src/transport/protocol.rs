//! SignalR JSON hub protocol framing.
//!
//! Every record is a JSON document terminated by the ASCII record separator
//! (`0x1E`). One WebSocket text frame may carry several records, and the
//! handshake reply may share a frame with the first messages.
//!
//! # Message types
//!
//! | type | meaning        | handling                            |
//! |------|----------------|-------------------------------------|
//! | 1    | Invocation     | delivered to the receiver           |
//! | 2    | StreamItem     | ignored                             |
//! | 3    | Completion     | ignored (no return values awaited)  |
//! | 6    | Ping           | ignored                             |
//! | 7    | Close          | ends the session                    |

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::InboundCall;
use crate::constants;

/// Record terminator.
pub const RECORD_SEPARATOR: char = '\u{1e}';

const TYPE_INVOCATION: u8 = 1;
const TYPE_STREAM_ITEM: u8 = 2;
const TYPE_COMPLETION: u8 = 3;
const TYPE_PING: u8 = 6;
const TYPE_CLOSE: u8 = 7;

/// A decoded hub message.
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    /// The server invoked a client method.
    Invocation {
        /// Method name.
        target: String,
        /// Positional arguments.
        arguments: Vec<Value>,
    },
    /// Stream item or completion; nothing in this client waits on them.
    Result,
    /// Keep-alive.
    Ping,
    /// The server is closing the connection.
    Close {
        /// Reason given by the server, if any.
        error: Option<String>,
    },
    /// A message type this client does not handle.
    Other(u8),
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    arguments: Vec<Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
struct OutboundInvocation<'a> {
    #[serde(rename = "type")]
    kind: u8,
    target: &'a str,
    arguments: &'a [String],
}

#[derive(Deserialize)]
struct HandshakeResponse {
    #[serde(default)]
    error: Option<String>,
}

/// Accumulates text frames and yields complete records.
#[derive(Debug, Default)]
pub struct RecordBuffer {
    pending: String,
}

impl RecordBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a frame and returns every record it completed, in order.
    pub fn push(&mut self, frame: &str) -> Vec<String> {
        self.pending.push_str(frame);
        let mut records = Vec::new();
        while let Some(end) = self.pending.find(RECORD_SEPARATOR) {
            let record: String = self.pending.drain(..=end).collect();
            let record = record.trim_end_matches(RECORD_SEPARATOR);
            if !record.trim().is_empty() {
                records.push(record.to_string());
            }
        }
        records
    }

    /// Whether a partial record is waiting for more data.
    pub fn has_partial(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// The client's opening handshake record.
pub fn handshake_request() -> String {
    format!(r#"{{"protocol":"json","version":1}}{RECORD_SEPARATOR}"#)
}

/// Checks the server's handshake reply. `Err` carries the server's reason.
pub fn parse_handshake_response(record: &str) -> Result<(), String> {
    let response: HandshakeResponse = serde_json::from_str(record)
        .map_err(|e| format!("malformed handshake response: {e}"))?;
    match response.error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Decodes one record.
pub fn decode_message(record: &str) -> Result<HubMessage, serde_json::Error> {
    let raw: RawMessage = serde_json::from_str(record)?;
    Ok(match raw.kind {
        TYPE_INVOCATION => HubMessage::Invocation {
            target: raw.target.unwrap_or_default(),
            arguments: raw.arguments,
        },
        TYPE_STREAM_ITEM | TYPE_COMPLETION => HubMessage::Result,
        TYPE_PING => HubMessage::Ping,
        TYPE_CLOSE => HubMessage::Close { error: raw.error },
        other => HubMessage::Other(other),
    })
}

/// Encodes a fire-and-forget invocation (no invocation id, no completion).
pub fn encode_invocation(target: &str, arguments: &[String]) -> Result<String, serde_json::Error> {
    let body = serde_json::to_string(&OutboundInvocation {
        kind: TYPE_INVOCATION,
        target,
        arguments,
    })?;
    Ok(format!("{body}{RECORD_SEPARATOR}"))
}

/// Encodes a keep-alive ping.
pub fn encode_ping() -> String {
    format!(r#"{{"type":{TYPE_PING}}}{RECORD_SEPARATOR}"#)
}

/// Turns an invocation into the caller name and payload seen by the client.
///
/// The generic `ReceiveCall(callerName, data)` envelope is unwrapped. For
/// any other target the target is the caller name and the payload is the
/// single argument, or the argument array when there are several.
pub fn into_inbound_call(target: String, mut arguments: Vec<Value>) -> InboundCall {
    if target.eq_ignore_ascii_case(constants::CALLER_ENVELOPE) && arguments.len() == 2 {
        if let Value::String(caller) = &arguments[0] {
            let caller = caller.clone();
            let payload = arguments.pop().unwrap_or(Value::Null);
            return InboundCall::new(caller, payload);
        }
    }

    let payload = match arguments.len() {
        0 => Value::Null,
        1 => arguments.pop().unwrap_or(Value::Null),
        _ => Value::Array(arguments),
    };
    InboundCall::new(target, payload)
}
