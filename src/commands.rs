//! Command Router.
//!
//! Handles chat-input lines that start with the command prefix (`/`).
//!
//! # Routing
//!
//! 1. Strip the prefix from the first token; the rest are arguments.
//! 2. Gate: anything outside `login`/`tokentest` needs a stored auth token.
//! 3. Parse into a [`Command`], checking arity.
//! 4. Run local commands directly; send remote ones through the transport,
//!    but only while the session has no outstanding error.
//!
//! Every rejection is a [`CommandError`] whose `Display` is the one-line
//! notice appended to the system panel.
//!
//! | Command                      | Auth | Effect                              |
//! |------------------------------|------|-------------------------------------|
//! | `/login <user> <pass>`       | no   | `GetLoginToken(user, pass)`         |
//! | `/tokentest <token>`         | no   | `LoginWithToken(token)`             |
//! | `/charsay <name> <message>`  | yes  | `CharSay(name, message)`            |
//! | `/clearcon`                  | yes  | clear system history                |
//! | `/clearchat`                 | yes  | clear chat history                  |
//! | `/quit`                      | yes  | quit                                |

use crate::app::Panels;
use crate::constants;
use crate::session::SessionState;
use crate::transport::{Transport, TransportError};

const USAGE_CHARSAY: &str = "/charsay <name> <message>";
const USAGE_LOGIN: &str = "/login <user> <pass>";
const USAGE_TOKENTEST: &str = "/tokentest <token>";

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Clear the system panel.
    ClearCon,
    /// Clear the chat panel.
    ClearChat,
    /// Quit the client.
    Quit,
    /// Say something as a character.
    CharSay {
        /// Character name.
        name: String,
        /// Single-word message.
        message: String,
    },
    /// Request a login token.
    Login {
        /// Account name.
        user: String,
        /// Password.
        pass: String,
    },
    /// Redeem a token directly.
    TokenTest {
        /// Token to redeem.
        token: String,
    },
}

impl Command {
    /// Parses a command name (prefix already stripped) and its arguments.
    pub fn parse(name: &str, args: &[&str]) -> Result<Self, CommandError> {
        let command = match name {
            "clearcon" => Self::ClearCon,
            "clearchat" => Self::ClearChat,
            "quit" => Self::Quit,
            "charsay" => match args {
                [name, message] => Self::CharSay {
                    name: (*name).to_string(),
                    message: (*message).to_string(),
                },
                _ => return Err(CommandError::Arity { usage: USAGE_CHARSAY }),
            },
            "login" => match args {
                [user, pass] => Self::Login {
                    user: (*user).to_string(),
                    pass: (*pass).to_string(),
                },
                _ => return Err(CommandError::Arity { usage: USAGE_LOGIN }),
            },
            "tokentest" => match args {
                [token] => Self::TokenTest {
                    token: (*token).to_string(),
                },
                _ => return Err(CommandError::Arity { usage: USAGE_TOKENTEST }),
            },
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }

    /// Remote method and arguments, or `None` for local commands.
    pub fn outbound(&self) -> Option<(&'static str, Vec<String>)> {
        match self {
            Self::ClearCon | Self::ClearChat | Self::Quit => None,
            Self::CharSay { name, message } => Some((
                constants::METHOD_CHAR_SAY,
                vec![name.clone(), message.clone()],
            )),
            Self::Login { user, pass } => Some((
                constants::METHOD_GET_LOGIN_TOKEN,
                vec![user.clone(), pass.clone()],
            )),
            Self::TokenTest { token } => {
                Some((constants::METHOD_LOGIN_WITH_TOKEN, vec![token.clone()]))
            }
        }
    }
}

/// Why a command line was not carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Authenticated-only command before login.
    Unauthenticated,
    /// Wrong number of arguments.
    Arity {
        /// Usage line for the command.
        usage: &'static str,
    },
    /// No such command.
    Unknown(String),
    /// Not connected, or the session has an outstanding error.
    Offline,
    /// The transport refused the call.
    Transport(TransportError),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(
                f,
                "You can't do that before logging in! Use {USAGE_LOGIN}"
            ),
            Self::Arity { usage } => write!(f, "Usage: {usage}"),
            Self::Unknown(name) => write!(f, "Unknown command: /{name}"),
            Self::Offline => write!(f, "Not connected to the server"),
            Self::Transport(e) => write!(f, "Could not send command: {e}"),
        }
    }
}

impl std::error::Error for CommandError {}

/// What the host should do after routing a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Nothing further.
    Done,
    /// Terminate the client.
    Quit,
}

/// Splits a submitted line into tokens on whitespace.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// Routes command lines. Stateless; all state is passed in.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandRouter;

impl CommandRouter {
    /// Creates a router.
    pub fn new() -> Self {
        Self
    }

    /// Tokenizes and routes a submitted line.
    pub fn route_line(
        &self,
        line: &str,
        session: &SessionState,
        panels: &mut Panels,
        transport: Option<&dyn Transport>,
    ) -> RouteOutcome {
        self.route(&tokenize(line), session, panels, transport)
    }

    /// Routes one command. `tokens[0]` carries the prefix.
    ///
    /// Failures are reported as a system panel notice.
    pub fn route(
        &self,
        tokens: &[&str],
        session: &SessionState,
        panels: &mut Panels,
        transport: Option<&dyn Transport>,
    ) -> RouteOutcome {
        match self.execute(tokens, session, panels, transport) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::debug!("[Commands] Rejected: {:?}", e);
                panels.push_system(e.to_string());
                RouteOutcome::Done
            }
        }
    }

    fn execute(
        &self,
        tokens: &[&str],
        session: &SessionState,
        panels: &mut Panels,
        transport: Option<&dyn Transport>,
    ) -> Result<RouteOutcome, CommandError> {
        let Some((&first, args)) = tokens.split_first() else {
            return Ok(RouteOutcome::Done);
        };
        let name = first
            .strip_prefix(constants::COMMAND_PREFIX)
            .unwrap_or(first)
            .to_ascii_lowercase();

        if !constants::COMMANDS_ALLOWED_UNAUTHENTICATED.contains(&name.as_str())
            && !session.is_authenticated()
        {
            return Err(CommandError::Unauthenticated);
        }

        let command = Command::parse(&name, args)?;

        if let Some((method, args)) = command.outbound() {
            let transport = match transport {
                Some(transport) if session.is_healthy() => transport,
                _ => return Err(CommandError::Offline),
            };
            log::info!("[Commands] /{} -> {}", name, method);
            transport
                .invoke(method, &args)
                .map_err(CommandError::Transport)?;
            return Ok(RouteOutcome::Done);
        }

        match command {
            Command::ClearCon => panels.clear_system(),
            Command::ClearChat => panels.clear_chat(),
            Command::Quit => {
                log::info!("[Commands] Quit requested");
                return Ok(RouteOutcome::Quit);
            }
            Command::CharSay { .. } | Command::Login { .. } | Command::TokenTest { .. } => {}
        }
        Ok(RouteOutcome::Done)
    }
}
