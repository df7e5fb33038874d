//! Typed events.
//!
//! Inbound calls arrive with a caller name and an untyped payload. They are
//! decoded at the dispatch boundary into [`ServerEvent`], a closed set of
//! known kinds plus [`ServerEvent::Unknown`] for names this client does not
//! understand. [`LifecycleEvent`] is what the core hands back to the host.

use serde::Deserialize;
use serde_json::Value;

use crate::constants;
use crate::session::ErrorKind;
use crate::transport::InboundCall;

/// Signals the host routes back into the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The transport reached the connected state within the timeout.
    ConnectionEstablished,
    /// The connect attempt failed, or an established session was lost.
    ConnectionFailed(ErrorKind),
    /// One inbound item was fully processed.
    EventProcessed,
}

/// Character status pushed by the server.
///
/// The server is not consistent about casing, so PascalCase field names are
/// accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CharacterStatus {
    /// Opaque identity.
    #[serde(rename = "guid", alias = "Guid", alias = "id", default)]
    pub id: String,
    /// Display name.
    #[serde(alias = "Name")]
    pub name: String,
    /// Hit points. Never clamped here.
    #[serde(rename = "hp", alias = "Hp", alias = "HP")]
    pub hit_points: i64,
    /// Active effect tags, in server order.
    #[serde(rename = "statuses", alias = "Statuses", default)]
    pub status_effects: Vec<String>,
}

impl CharacterStatus {
    /// Text shown in the character panel.
    pub fn display_text(&self) -> String {
        format!("{}\n    HP: {}", self.name, self.hit_points)
    }
}

/// A payload did not have the shape its caller name requires.
#[derive(Debug)]
pub struct DecodePayloadError {
    caller_name: String,
    source: serde_json::Error,
}

impl DecodePayloadError {
    /// Caller name of the rejected item.
    pub fn caller_name(&self) -> &str {
        &self.caller_name
    }

    /// The underlying decode error.
    pub fn reason(&self) -> &serde_json::Error {
        &self.source
    }
}

impl std::fmt::Display for DecodePayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.caller_name, self.source)
    }
}

impl std::error::Error for DecodePayloadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// A decoded inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Character status update.
    CharacterStatus(CharacterStatus),
    /// Login token delivery; may be the invalid-credentials sentinel.
    LoginToken(String),
    /// Session token confirmation; may be the rejection sentinel.
    SessionToken(String),
    /// Any caller name this client does not handle.
    Unknown {
        /// The caller name as received.
        name: String,
        /// The payload, untouched.
        payload: Value,
    },
}

impl ServerEvent {
    /// Decodes an inbound call by caller name.
    pub fn decode(call: InboundCall) -> Result<Self, DecodePayloadError> {
        let InboundCall {
            caller_name,
            payload,
        } = call;

        let decoded = match caller_name.as_str() {
            constants::CALLER_PLAYER_STATS => decode_json::<CharacterStatus>(payload)
                .map(ServerEvent::CharacterStatus),
            constants::CALLER_LOGIN_TOKEN => decode_scalar(payload).map(ServerEvent::LoginToken),
            constants::CALLER_SESSION_TOKEN => {
                decode_scalar(payload).map(ServerEvent::SessionToken)
            }
            _ => {
                return Ok(ServerEvent::Unknown {
                    name: caller_name,
                    payload,
                })
            }
        };

        decoded.map_err(|source| DecodePayloadError {
            caller_name,
            source,
        })
    }
}

/// Decodes a structured payload sent either as a JSON string or as a value.
fn decode_json<T: for<'de> Deserialize<'de>>(payload: Value) -> Result<T, serde_json::Error> {
    match payload {
        Value::String(text) => serde_json::from_str(&text),
        other => serde_json::from_value(other),
    }
}

/// Decodes a token-like payload. Numbers are kept in their textual form.
fn decode_scalar(payload: Value) -> Result<String, serde_json::Error> {
    match payload {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => serde_json::from_value(other),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn decode(caller: &str, payload: Value) -> Result<ServerEvent, DecodePayloadError> {
        ServerEvent::decode(InboundCall::new(caller, payload))
    }

    #[test]
    fn test_character_status_from_json_string() {
        let event = decode(
            "ReceivePlayerStats",
            json!(r#"{"guid":"g-1","name":"Numi","hp":12,"statuses":["poisoned"]}"#),
        )
        .unwrap();
        let ServerEvent::CharacterStatus(status) = event else {
            panic!("expected character status, got {event:?}");
        };
        assert_eq!(status.id, "g-1");
        assert_eq!(status.name, "Numi");
        assert_eq!(status.hit_points, 12);
        assert_eq!(status.status_effects, vec!["poisoned".to_string()]);
        assert_eq!(status.display_text(), "Numi\n    HP: 12");
    }

    #[test]
    fn test_character_status_pascal_case_object() {
        let event = decode("ReceivePlayerStats", json!({"Name": "Bob", "Hp": -3})).unwrap();
        assert_eq!(
            event,
            ServerEvent::CharacterStatus(CharacterStatus {
                id: String::new(),
                name: "Bob".to_string(),
                hit_points: -3,
                status_effects: Vec::new(),
            })
        );
    }

    #[test]
    fn test_character_status_hit_points_beyond_32_bits() {
        let event = decode("ReceivePlayerStats", json!({"name": "Titan", "hp": 5_000_000_000_i64}))
            .unwrap();
        let ServerEvent::CharacterStatus(status) = event else {
            panic!("expected character status, got {event:?}");
        };
        assert_eq!(status.hit_points, 5_000_000_000);
        assert_eq!(status.display_text(), "Titan\n    HP: 5000000000");
    }

    #[test]
    fn test_malformed_character_status_is_an_error() {
        let err = decode("ReceivePlayerStats", json!("{not json")).unwrap_err();
        assert_eq!(err.caller_name(), "ReceivePlayerStats");
        assert!(err.to_string().starts_with("ReceivePlayerStats: "));

        assert!(decode("ReceivePlayerStats", json!({"name": "NoHp"})).is_err());
    }

    #[test]
    fn test_tokens() {
        assert_eq!(
            decode("ReceiveLoginToken", json!("abc")).unwrap(),
            ServerEvent::LoginToken("abc".to_string())
        );
        assert_eq!(
            decode("ReceiveSessionToken", json!(-1)).unwrap(),
            ServerEvent::SessionToken("-1".to_string())
        );
        assert_eq!(
            decode("ReceiveSessionToken", json!(42)).unwrap(),
            ServerEvent::SessionToken("42".to_string())
        );
        assert!(decode("ReceiveLoginToken", json!({"token": 1})).is_err());
    }

    #[test]
    fn test_unknown_caller_keeps_payload() {
        assert_eq!(
            decode("SomethingNew", json!([1, 2])).unwrap(),
            ServerEvent::Unknown {
                name: "SomethingNew".to_string(),
                payload: json!([1, 2]),
            }
        );
    }
}
