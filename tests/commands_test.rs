//! Command Router: gate, arity, outbound calls.

mod common;

use common::RecordingTransport;
use dreamer::app::Panels;
use dreamer::commands::RouteOutcome;
use dreamer::transport::Transport;
use dreamer::{CommandRouter, ErrorKind, SessionState};

const UNAUTHENTICATED: &str = "You can't do that before logging in! Use /login <user> <pass>";

struct Harness {
    router: CommandRouter,
    session: SessionState,
    panels: Panels,
    transport: RecordingTransport,
}

impl Harness {
    fn new() -> Self {
        Self {
            router: CommandRouter::new(),
            session: SessionState::new(),
            panels: Panels::new(),
            transport: RecordingTransport::connected(),
        }
    }

    fn logged_in() -> Self {
        let mut h = Self::new();
        h.session.store_auth_token("tok").unwrap();
        h
    }

    fn route(&mut self, line: &str) -> RouteOutcome {
        self.router.route_line(
            line,
            &self.session,
            &mut self.panels,
            Some(&self.transport as &dyn Transport),
        )
    }

    fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.transport.calls()
    }
}

fn call(method: &str, args: &[&str]) -> (String, Vec<String>) {
    (
        method.to_string(),
        args.iter().map(|arg| (*arg).to_string()).collect(),
    )
}

#[test]
fn test_login_allowed_before_authentication() {
    let mut h = Harness::new();
    assert_eq!(h.route("/login alice secret"), RouteOutcome::Done);
    assert_eq!(h.calls(), vec![call("GetLoginToken", &["alice", "secret"])]);
    assert!(h.panels.system().is_empty());
}

#[test]
fn test_charsay_rejected_before_authentication() {
    let mut h = Harness::new();
    h.route("/charsay Bob hi");
    assert!(h.calls().is_empty());
    assert_eq!(h.panels.last_system(), Some(UNAUTHENTICATED));
}

#[test]
fn test_charsay_after_authentication() {
    let mut h = Harness::logged_in();
    h.route("/charsay Bob hi");
    assert_eq!(h.calls(), vec![call("CharSay", &["Bob", "hi"])]);
}

#[test]
fn test_login_arity() {
    let mut h = Harness::new();
    h.route("/login alice");
    assert!(h.calls().is_empty());
    assert_eq!(h.panels.last_system(), Some("Usage: /login <user> <pass>"));
}

#[test]
fn test_charsay_arity() {
    let mut h = Harness::logged_in();
    h.route("/charsay Bob");
    h.route("/charsay Bob hello there");
    assert!(h.calls().is_empty());
    assert_eq!(
        h.panels.system(),
        &[
            "Usage: /charsay <name> <message>".to_string(),
            "Usage: /charsay <name> <message>".to_string()
        ]
    );
}

#[test]
fn test_tokentest() {
    let mut h = Harness::new();
    h.route("/tokentest abc");
    assert_eq!(h.calls(), vec![call("LoginWithToken", &["abc"])]);

    h.route("/tokentest");
    assert_eq!(h.calls().len(), 1);
    assert_eq!(h.panels.last_system(), Some("Usage: /tokentest <token>"));
}

#[test]
fn test_gate_runs_before_arity_and_lookup() {
    let mut h = Harness::new();
    h.route("/charsay");
    assert_eq!(h.panels.last_system(), Some(UNAUTHENTICATED));
    h.route("/dance");
    assert_eq!(h.panels.last_system(), Some(UNAUTHENTICATED));
}

#[test]
fn test_unknown_command_notice() {
    let mut h = Harness::logged_in();
    h.route("/dance wildly");
    assert!(h.calls().is_empty());
    assert_eq!(h.panels.last_system(), Some("Unknown command: /dance"));
}

#[test]
fn test_no_outbound_calls_while_in_error() {
    let mut h = Harness::logged_in();
    h.session.set_error(ErrorKind::ConnectionTimeout);

    h.route("/charsay Bob hi");
    h.route("/login alice secret");
    assert!(h.calls().is_empty());
    assert_eq!(h.panels.last_system(), Some("Not connected to the server"));

    h.route("/clearcon");
    assert!(h.panels.system().is_empty());
}

#[test]
fn test_command_names_are_case_insensitive() {
    let mut h = Harness::new();
    h.route("/LOGIN alice secret");
    assert_eq!(h.calls(), vec![call("GetLoginToken", &["alice", "secret"])]);
}

#[test]
fn test_quit_after_login() {
    let mut h = Harness::logged_in();
    assert_eq!(h.route("/quit"), RouteOutcome::Quit);
}

#[test]
fn test_send_failure_is_reported() {
    let mut h = Harness::logged_in();
    h.transport.stop();
    h.route("/charsay Bob hi");
    assert_eq!(
        h.panels.last_system(),
        Some("Could not send command: Connection closed")
    );
}
