//! Application-wide constants for dreamer.
//!
//! This module centralizes magic numbers, wire names and user-facing strings
//! so they can be found in one place. Constants are grouped by domain.
//!
//! # Categories
//!
//! - **Timeouts**: Connect sequence and keep-alive timing
//! - **Hub names**: Remote method and caller names used on the wire
//! - **Commands**: Command prefix and the commands allowed before login
//! - **UI**: Layout percentages and initial panel text

use std::time::Duration;

// ============================================================================
// Timeouts
// ============================================================================

/// Per-attempt dial timeout for the transport connection.
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(2);

/// Overall budget for a connect attempt to reach the connected state.
///
/// When this expires the attempt is reported as a connection timeout and the
/// user is offered a retry.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay between dial attempts while a connect attempt is still live.
pub const DIAL_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Interval between SignalR keep-alive pings sent by the client.
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// TUI frame rate delay (approximately 60fps).
pub const FRAME_RATE_DELAY: Duration = Duration::from_millis(16);

/// How long the keyboard reader thread blocks in `poll` before rechecking
/// its shutdown flag.
pub const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(50);

// ============================================================================
// Hub names
// ============================================================================

/// Inbound: full character status, JSON encoded.
pub const CALLER_PLAYER_STATS: &str = "ReceivePlayerStats";

/// Inbound: login token delivery after `GetLoginToken`.
pub const CALLER_LOGIN_TOKEN: &str = "ReceiveLoginToken";

/// Inbound: session token confirmation after `LoginWithToken`.
pub const CALLER_SESSION_TOKEN: &str = "ReceiveSessionToken";

/// Inbound: generic envelope carrying `(callerName, data)` as its arguments.
pub const CALLER_ENVELOPE: &str = "ReceiveCall";

/// Outbound: exchange credentials for a login token.
pub const METHOD_GET_LOGIN_TOKEN: &str = "GetLoginToken";

/// Outbound: redeem a login token for a session.
pub const METHOD_LOGIN_WITH_TOKEN: &str = "LoginWithToken";

/// Outbound: make a character speak.
pub const METHOD_CHAR_SAY: &str = "CharSay";

/// Login token value the server sends when credentials are wrong.
pub const INVALID_CREDENTIALS: &str = "invalid_credentials";

/// Session token value the server sends when a login token is rejected.
pub const SESSION_TOKEN_REJECTED: &str = "-1";

// ============================================================================
// Commands
// ============================================================================

/// Leading character that marks a chat-input line as a local command.
pub const COMMAND_PREFIX: char = '/';

/// Commands that may run before a login token has been stored.
pub const COMMANDS_ALLOWED_UNAUTHENTICATED: &[&str] = &["login", "tokentest"];

// ============================================================================
// UI Layout
// ============================================================================

/// Percentage of screen width for the character panel.
pub const CHARACTER_PANEL_WIDTH_PERCENT: u16 = 33;

/// Percentage of the right column height used by the chat panel.
pub const CHAT_PANEL_HEIGHT_PERCENT: u16 = 67;

/// Maximum characters accepted by the chat input.
pub const CHAT_INPUT_CHAR_LIMIT: usize = 255;

/// Character panel text before any status has arrived.
pub const CHARACTER_PLACEHOLDER: &str = "Log in to view character data";

/// First line of the debug window.
pub const CONNECTING_MESSAGE: &str = "Connecting to server...";

/// Debug window prompt shown after a failed connect attempt.
pub const RETRY_PROMPT: &str = "Server Connection Failed. Retry? (Y/N)";

/// Default status bar title.
pub const DEFAULT_TITLE: &str = "NUMI'S TEST CLIENT";

/// Crate version shown in the status bar.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
