//! Application state and event handling for the dreamer TUI.
//!
//! [`App`] is the single owner of session state and panel buffers. Every
//! mutation is applied here, on the host's event loop:
//!
//! - lifecycle results from the Connection Manager ([`App::handle_lifecycle`])
//! - inbound items drained by the Event Dispatcher ([`App::process_inbound`])
//! - key actions, including command submission ([`App::handle_input`])
//!
//! Anything that needs the async runtime (spawning a connect attempt or a
//! connection-lost watcher) is returned as an [`AppEffect`] for the runner to
//! carry out, which keeps `App` testable without a terminal.
//!
//! # Stage flow
//!
//! ```text
//! Starting ──connect──> Connecting ──established──> LoadingInitialData
//!    ^                      │                              │
//!    └──── retry (y) ───────┘ timeout / lost     first EventProcessed
//!                                                          v
//!                                                        Ready
//! ```

pub mod input;
pub mod panels;
pub mod state;

use std::future::Future;
use std::sync::Arc;

use anyhow::{bail, Result};
use tui_input::Input;

pub use input::{handle_key, EditAction, InputAction};
pub use panels::Panels;
pub use state::Focus;

use crate::commands::{CommandRouter, RouteOutcome};
use crate::connection::{ConnectTimeouts, ConnectionManager};
use crate::constants;
use crate::dispatch::EventDispatcher;
use crate::events::LifecycleEvent;
use crate::session::{ErrorKind, SessionState, Stage};
use crate::transport::{Connector, InboundCall};

/// Work the runner must do after an `App` method returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEffect {
    /// Nothing.
    None,
    /// Start a connect attempt via [`App::begin_connect`].
    Connect,
    /// Watch the established session for loss via
    /// [`ConnectionManager::watch_closed`].
    WatchClosed,
}

/// The client core plus the host's UI state.
#[derive(Debug)]
pub struct App {
    /// Lifecycle stage, error state and auth token.
    pub session: SessionState,
    /// Panel buffers read by the renderer.
    pub panels: Panels,
    /// Owner of the transport handle.
    pub connection: ConnectionManager,
    /// Consumer of the inbound queue.
    pub dispatcher: EventDispatcher,
    /// Command line router.
    pub router: CommandRouter,
    /// Focused panel.
    pub focus: Focus,
    /// Chat input line.
    pub chat_input: Input,
    /// Whether the retry prompt is open.
    pub retry_pending: bool,
    /// Set when the user asked to quit.
    pub quit: bool,
    /// Status bar title.
    pub title: String,
}

impl App {
    /// Creates the app from its parts.
    pub fn new(
        connection: ConnectionManager,
        dispatcher: EventDispatcher,
        title: impl Into<String>,
    ) -> Self {
        Self {
            session: SessionState::new(),
            panels: Panels::new(),
            connection,
            dispatcher,
            router: CommandRouter::new(),
            focus: Focus::default(),
            chat_input: Input::default(),
            retry_pending: false,
            quit: false,
            title: title.into(),
        }
    }

    /// Creates the app and its inbound queue for `target`.
    pub fn with_connector(
        connector: Arc<dyn Connector>,
        target: impl Into<String>,
        timeouts: ConnectTimeouts,
        title: impl Into<String>,
    ) -> Self {
        let (receiver, dispatcher) = EventDispatcher::channel();
        let connection = ConnectionManager::new(connector, target, timeouts, receiver);
        Self::new(connection, dispatcher, title)
    }

    /// Whether the app should exit.
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Moves to `Connecting` and returns the connect attempt to run.
    pub fn begin_connect(&mut self) -> impl Future<Output = LifecycleEvent> + Send + 'static {
        self.session.set_stage(Stage::Connecting);
        self.connection.connect()
    }

    /// Applies a lifecycle signal.
    ///
    /// # Errors
    ///
    /// Returns an error for `ConnectionFailed(Fatal)`; the process should
    /// exit.
    pub fn handle_lifecycle(&mut self, event: LifecycleEvent) -> Result<AppEffect> {
        match event {
            LifecycleEvent::ConnectionEstablished => {
                self.session.set_stage(Stage::LoadingInitialData);
                self.dispatcher.arm();
                self.panels.push_debug("Connected!");
                self.focus = Focus::Chat;
                Ok(AppEffect::WatchClosed)
            }
            LifecycleEvent::ConnectionFailed(ErrorKind::NoError) => Ok(AppEffect::None),
            LifecycleEvent::ConnectionFailed(kind) => {
                self.dispatcher.disarm();
                self.connection.disconnect();
                self.session.set_error(kind);

                if kind == ErrorKind::Fatal {
                    self.quit = true;
                    bail!(
                        "Fatal error while connecting to {}",
                        self.connection.target()
                    );
                }

                log::warn!("[Connection] {}; asking to retry", kind);
                self.panels.push_debug(constants::RETRY_PROMPT);
                self.retry_pending = true;
                self.focus = Focus::Debug;
                Ok(AppEffect::None)
            }
            LifecycleEvent::EventProcessed => {
                if self.session.stage() == Stage::LoadingInitialData {
                    self.session.set_stage(Stage::Ready);
                }
                Ok(AppEffect::None)
            }
        }
    }

    /// Hands one drained inbound item to the dispatcher and applies the
    /// resulting `EventProcessed`.
    pub fn process_inbound(&mut self, call: InboundCall) -> Result<AppEffect> {
        let event = self.dispatcher.process(
            call,
            &mut self.session,
            &mut self.panels,
            self.connection.transport(),
        );
        self.handle_lifecycle(event)
    }

    /// Applies a key action.
    pub fn handle_input(&mut self, action: InputAction) -> AppEffect {
        match action {
            InputAction::None => {}
            InputAction::Quit | InputAction::RetryDecline => self.quit = true,
            InputAction::Focus(focus) => self.focus = focus,
            InputAction::DumpState => {
                let line = format!(
                    "Input: {:?} (cursor {}, focus {})",
                    self.chat_input.value(),
                    self.chat_input.cursor(),
                    self.focus.display_name()
                );
                self.panels.push_debug(line);
            }
            InputAction::Submit => self.submit(),
            InputAction::Edit(edit) => self.edit(edit),
            InputAction::RetryAccept => return self.retry(),
        }
        AppEffect::None
    }

    /// User approved a retry: clear the error and start over.
    fn retry(&mut self) -> AppEffect {
        if !self.retry_pending {
            return AppEffect::None;
        }
        self.retry_pending = false;
        self.session.clear_error();
        self.session.set_stage(Stage::Starting);
        self.panels.push_debug(constants::CONNECTING_MESSAGE);
        AppEffect::Connect
    }

    fn edit(&mut self, edit: EditAction) {
        if matches!(edit, EditAction::Insert(_))
            && self.chat_input.value().chars().count() >= constants::CHAT_INPUT_CHAR_LIMIT
        {
            return;
        }
        self.chat_input.handle(edit.to_request());
    }

    /// Submits the chat input line. The line is cleared either way.
    fn submit(&mut self) {
        let line = self.chat_input.value().trim().to_string();
        self.chat_input.reset();
        if line.is_empty() {
            return;
        }

        if line.starts_with(constants::COMMAND_PREFIX) {
            self.panels.push_debug(format!("Sent command: {line}"));
            let outcome = self.router.route_line(
                &line,
                &self.session,
                &mut self.panels,
                self.connection.transport(),
            );
            if outcome == RouteOutcome::Quit {
                self.quit = true;
            }
        } else if self.session.is_authenticated() {
            self.panels.push_chat(format!("You: {line}"));
        } else {
            self.panels.push_system("You can't chat before you log in!");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::transport::{Receiver, Transport, TransportError};

    #[derive(Debug)]
    struct NoConnector;

    impl Connector for NoConnector {
        fn connect(
            &self,
            target: &str,
            _dial_timeout: Duration,
            _receiver: Receiver,
        ) -> std::result::Result<Arc<dyn Transport>, TransportError> {
            Err(TransportError::InvalidTarget(target.to_string()))
        }
    }

    fn app() -> App {
        App::with_connector(
            Arc::new(NoConnector),
            "bogus",
            ConnectTimeouts::default(),
            constants::DEFAULT_TITLE,
        )
    }

    fn type_line(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_input(InputAction::Edit(EditAction::Insert(c)));
        }
    }

    #[test]
    fn test_established_arms_dispatcher_and_focuses_chat() {
        let mut app = app();
        let effect = app
            .handle_lifecycle(LifecycleEvent::ConnectionEstablished)
            .unwrap();
        assert_eq!(effect, AppEffect::WatchClosed);
        assert_eq!(app.session.stage(), Stage::LoadingInitialData);
        assert!(app.dispatcher.is_draining());
        assert_eq!(app.focus, Focus::Chat);
        assert_eq!(app.panels.debug().last().map(String::as_str), Some("Connected!"));

        app.handle_lifecycle(LifecycleEvent::EventProcessed).unwrap();
        assert_eq!(app.session.stage(), Stage::Ready);
    }

    #[test]
    fn test_timeout_opens_retry_prompt_and_retry_restarts() {
        let mut app = app();
        app.handle_lifecycle(LifecycleEvent::ConnectionFailed(ErrorKind::ConnectionTimeout))
            .unwrap();
        assert!(app.retry_pending);
        assert_eq!(app.focus, Focus::Debug);
        assert_eq!(app.session.error_state(), ErrorKind::ConnectionTimeout);
        assert_eq!(
            app.panels.debug().last().map(String::as_str),
            Some(constants::RETRY_PROMPT)
        );

        assert_eq!(app.handle_input(InputAction::RetryAccept), AppEffect::Connect);
        assert!(!app.retry_pending);
        assert_eq!(app.session.error_state(), ErrorKind::NoError);
        assert_eq!(app.session.stage(), Stage::Starting);
    }

    #[test]
    fn test_retry_decline_quits() {
        let mut app = app();
        app.handle_lifecycle(LifecycleEvent::ConnectionFailed(ErrorKind::Unknown))
            .unwrap();
        app.handle_input(InputAction::RetryDecline);
        assert!(app.should_quit());
    }

    #[test]
    fn test_fatal_is_an_error() {
        let mut app = app();
        let result = app.handle_lifecycle(LifecycleEvent::ConnectionFailed(ErrorKind::Fatal));
        assert!(result.is_err());
        assert!(app.should_quit());
        assert!(!app.retry_pending);
    }

    #[tokio::test]
    async fn test_invalid_target_connect_is_fatal() {
        let mut app = app();
        let event = app.begin_connect().await;
        assert_eq!(event, LifecycleEvent::ConnectionFailed(ErrorKind::Fatal));
    }

    #[test]
    fn test_chat_requires_login() {
        let mut app = app();
        type_line(&mut app, "hello");
        app.handle_input(InputAction::Submit);
        assert_eq!(app.panels.last_system(), Some("You can't chat before you log in!"));
        assert!(app.panels.chat().is_empty());
        assert_eq!(app.chat_input.value(), "");

        app.session.store_auth_token("tok").unwrap();
        type_line(&mut app, "hello");
        app.handle_input(InputAction::Submit);
        assert_eq!(app.panels.chat(), &["You: hello".to_string()]);
    }

    #[test]
    fn test_command_is_echoed_to_debug() {
        let mut app = app();
        type_line(&mut app, "/charsay Bob hi");
        app.handle_input(InputAction::Submit);
        assert_eq!(
            app.panels.debug().last().map(String::as_str),
            Some("Sent command: /charsay Bob hi")
        );
        assert_eq!(
            app.panels.last_system(),
            Some("You can't do that before logging in! Use /login <user> <pass>")
        );
    }

    #[test]
    fn test_input_respects_char_limit() {
        let mut app = app();
        type_line(&mut app, &"x".repeat(constants::CHAT_INPUT_CHAR_LIMIT + 10));
        assert_eq!(
            app.chat_input.value().chars().count(),
            constants::CHAT_INPUT_CHAR_LIMIT
        );
    }

    #[test]
    fn test_dump_state() {
        let mut app = app();
        type_line(&mut app, "ab");
        app.handle_input(InputAction::DumpState);
        assert_eq!(
            app.panels.debug().last().map(String::as_str),
            Some("Input: \"ab\" (cursor 2, focus Debug)")
        );
    }
}
