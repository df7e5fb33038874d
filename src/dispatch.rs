//! Event Dispatcher.
//!
//! Drains inbound calls from the transport one at a time, in arrival order,
//! and applies them to the session and panels.
//!
//! # Drain cycle
//!
//! ```text
//! Transport ──on_call──> mpsc queue ──next()──> process() ──> EventProcessed
//!                                      ^                            │
//!                                      └──────── re-arm ────────────┘
//! ```
//!
//! The dispatcher has two states. While `Idle` the host does not poll it;
//! once armed (`Draining`) the host's loop awaits [`EventDispatcher::next`]
//! on every iteration, so re-arming is the loop itself rather than an
//! external message that could be lost. Items queued while idle are kept and
//! drained in order once armed again.
//!
//! Processing never fails: undecodable payloads and unknown caller names are
//! logged, surfaced where useful, and dropped.

use tokio::sync::mpsc;

use crate::app::Panels;
use crate::constants;
use crate::events::{LifecycleEvent, ServerEvent};
use crate::session::SessionState;
use crate::transport::{InboundCall, Receiver, Transport};

/// Whether the host is draining the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainState {
    /// Not armed. Inbound items accumulate.
    #[default]
    Idle,
    /// Armed. The host awaits the next item.
    Draining,
}

/// Single consumer of the inbound queue.
#[derive(Debug)]
pub struct EventDispatcher {
    queue: mpsc::UnboundedReceiver<InboundCall>,
    state: DrainState,
    processed: u64,
}

impl EventDispatcher {
    /// Creates a dispatcher consuming `queue`.
    pub fn new(queue: mpsc::UnboundedReceiver<InboundCall>) -> Self {
        Self {
            queue,
            state: DrainState::Idle,
            processed: 0,
        }
    }

    /// Creates the inbound queue and returns its producer side with the
    /// dispatcher that consumes it.
    pub fn channel() -> (Receiver, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Receiver::new(tx), Self::new(rx))
    }

    /// Current drain state.
    pub fn state(&self) -> DrainState {
        self.state
    }

    /// Whether the host should await [`next`](Self::next).
    pub fn is_draining(&self) -> bool {
        self.state == DrainState::Draining
    }

    /// Number of items processed so far.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Starts draining.
    pub fn arm(&mut self) {
        if self.state == DrainState::Idle {
            log::debug!("[Dispatch] Draining");
        }
        self.state = DrainState::Draining;
    }

    /// Stops draining.
    pub fn disarm(&mut self) {
        if self.state == DrainState::Draining {
            log::debug!("[Dispatch] Idle");
        }
        self.state = DrainState::Idle;
    }

    /// Waits for the next inbound item.
    ///
    /// Cancel-safe: dropping the future before it resolves loses nothing.
    /// Returns `None` only once every producer is gone.
    pub async fn next(&mut self) -> Option<InboundCall> {
        self.queue.recv().await
    }

    /// Applies one inbound item.
    ///
    /// Outbound calls chained from this item are issued on `transport` before
    /// returning, so they reach the server ahead of anything triggered by
    /// later items.
    pub fn process(
        &mut self,
        call: InboundCall,
        session: &mut SessionState,
        panels: &mut Panels,
        transport: Option<&dyn Transport>,
    ) -> LifecycleEvent {
        self.processed += 1;

        match ServerEvent::decode(call) {
            Ok(ServerEvent::CharacterStatus(status)) => {
                log::debug!("[Dispatch] Character status for {}", status.name);
                panels.set_character(status.display_text());
            }
            Ok(ServerEvent::LoginToken(token)) => {
                handle_login_token(token, session, panels, transport);
            }
            Ok(ServerEvent::SessionToken(token)) => {
                if token == constants::SESSION_TOKEN_REJECTED {
                    panels.push_system(format!("User token rejected: {token}"));
                } else {
                    panels.push_system(format!("Logged in, session token is: {token}"));
                }
            }
            Ok(ServerEvent::Unknown { name, .. }) => {
                log::debug!("[Dispatch] Ignoring unknown caller {}", name);
            }
            Err(e) => {
                log::warn!("[Dispatch] Dropping undecodable item: {}", e);
                if e.caller_name() == constants::CALLER_PLAYER_STATS {
                    panels.push_system(format!("Could not read character status: {}", e.reason()));
                } else {
                    panels.push_system(format!("Could not read {}: {}", e.caller_name(), e.reason()));
                }
            }
        }

        LifecycleEvent::EventProcessed
    }

    /// Waits for one item and processes it. `None` once the queue is closed.
    pub async fn drain_one(
        &mut self,
        session: &mut SessionState,
        panels: &mut Panels,
        transport: Option<&dyn Transport>,
    ) -> Option<LifecycleEvent> {
        let call = self.next().await?;
        Some(self.process(call, session, panels, transport))
    }
}

/// Stores a delivered login token and immediately redeems it.
fn handle_login_token(
    token: String,
    session: &mut SessionState,
    panels: &mut Panels,
    transport: Option<&dyn Transport>,
) {
    if token == constants::INVALID_CREDENTIALS {
        log::info!("[Dispatch] Login rejected");
        panels.push_system(format!("Login rejected: {token}"));
        return;
    }

    if let Err(e) = session.store_auth_token(token.as_str()) {
        log::warn!("[Dispatch] Ignoring login token: {}", e);
        panels.push_system(format!("Login token ignored: {e}"));
        return;
    }
    panels.push_system(format!("Login token received: {token}"));

    let Some(transport) = transport else {
        log::warn!("[Dispatch] No transport to redeem login token");
        return;
    };
    if let Err(e) = transport.invoke(constants::METHOD_LOGIN_WITH_TOKEN, &[token]) {
        log::warn!("[Dispatch] {} failed: {}", constants::METHOD_LOGIN_WITH_TOKEN, e);
        panels.push_system(format!("Could not redeem login token: {e}"));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_arm_and_disarm() {
        let (_receiver, mut dispatcher) = EventDispatcher::channel();
        assert_eq!(dispatcher.state(), DrainState::Idle);
        dispatcher.arm();
        assert!(dispatcher.is_draining());
        dispatcher.disarm();
        assert_eq!(dispatcher.state(), DrainState::Idle);
    }

    #[test]
    fn test_session_token_notices() {
        let (_receiver, mut dispatcher) = EventDispatcher::channel();
        let mut session = SessionState::new();
        let mut panels = Panels::new();

        let event = dispatcher.process(
            InboundCall::new("ReceiveSessionToken", json!(-1)),
            &mut session,
            &mut panels,
            None,
        );
        assert_eq!(event, LifecycleEvent::EventProcessed);
        assert_eq!(panels.last_system(), Some("User token rejected: -1"));

        dispatcher.process(
            InboundCall::new("ReceiveSessionToken", json!(7)),
            &mut session,
            &mut panels,
            None,
        );
        assert_eq!(panels.last_system(), Some("Logged in, session token is: 7"));
        assert!(!session.is_authenticated());
        assert_eq!(dispatcher.processed(), 2);
    }

    #[test]
    fn test_unknown_caller_is_a_no_op() {
        let (_receiver, mut dispatcher) = EventDispatcher::channel();
        let mut session = SessionState::new();
        let mut panels = Panels::new();

        let event = dispatcher.process(
            InboundCall::new("ReceiveWeather", json!("rain")),
            &mut session,
            &mut panels,
            None,
        );
        assert_eq!(event, LifecycleEvent::EventProcessed);
        assert!(panels.system().is_empty());
        assert_eq!(panels.character(), constants::CHARACTER_PLACEHOLDER);
    }

    #[test]
    fn test_second_login_token_is_not_stored() {
        let (_receiver, mut dispatcher) = EventDispatcher::channel();
        let mut session = SessionState::new();
        let mut panels = Panels::new();
        session.store_auth_token("first").unwrap();

        dispatcher.process(
            InboundCall::new("ReceiveLoginToken", json!("second")),
            &mut session,
            &mut panels,
            None,
        );
        assert_eq!(session.auth_token(), Some("first"));
        assert_eq!(
            panels.last_system(),
            Some("Login token ignored: already logged in")
        );
    }

    #[tokio::test]
    async fn test_drain_one_returns_none_when_closed() {
        let (receiver, mut dispatcher) = EventDispatcher::channel();
        let mut session = SessionState::new();
        let mut panels = Panels::new();

        assert!(receiver.on_call("ReceiveSessionToken", json!(1)));
        drop(receiver);

        assert_eq!(
            dispatcher.drain_one(&mut session, &mut panels, None).await,
            Some(LifecycleEvent::EventProcessed)
        );
        assert_eq!(dispatcher.drain_one(&mut session, &mut panels, None).await, None);
    }
}
