//! Session state: lifecycle stage, error state and the auth token.
//!
//! Pure data. Only the event dispatcher and the host's lifecycle handling
//! mutate it, and both run on the host's serialized event loop.

/// Coarse phase of the client session.
///
/// Monotonic on the happy path. A user-approved retry regresses
/// `Connecting` back to `Starting`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, PartialOrd, Ord)]
pub enum Stage {
    /// Nothing attempted yet, or waiting for the user to approve a retry.
    #[default]
    Starting,
    /// A connect attempt is in flight.
    Connecting,
    /// Connected; waiting for the first server event.
    LoadingInitialData,
    /// At least one server event has been processed.
    Ready,
}

impl Stage {
    /// Text for the middle of the status bar.
    pub fn status_text(self) -> &'static str {
        match self {
            Self::Starting => "L: Loading...",
            Self::Connecting => "Connecting...",
            Self::LoadingInitialData => "Connected",
            Self::Ready => "Ready",
        }
    }
}

/// Last error reported for the session.
///
/// While this is anything other than `NoError` the command router issues no
/// outbound calls.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ErrorKind {
    /// No error outstanding.
    #[default]
    NoError,
    /// The connect attempt did not reach the connected state in time.
    /// Recoverable via retry.
    ConnectionTimeout,
    /// Unrecoverable; the process terminates.
    Fatal,
    /// An established connection was lost.
    Unknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoError => write!(f, "no error"),
            Self::ConnectionTimeout => write!(f, "connection timeout"),
            Self::Fatal => write!(f, "fatal error"),
            Self::Unknown => write!(f, "connection lost"),
        }
    }
}

/// Returned when a second auth token arrives in one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthTokenError {
    /// A token is already stored; it is never replaced.
    AlreadySet,
}

impl std::fmt::Display for AuthTokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadySet => write!(f, "already logged in"),
        }
    }
}

impl std::error::Error for AuthTokenError {}

/// In-memory session state for the process lifetime.
#[derive(Debug, Default)]
pub struct SessionState {
    stage: Stage,
    error_state: ErrorKind,
    auth_token: Option<String>,
}

impl SessionState {
    /// Fresh session: `Starting`, no error, not authenticated.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Current error state.
    pub fn error_state(&self) -> ErrorKind {
        self.error_state
    }

    /// The stored auth token, if login has completed.
    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    /// Whether a token has been stored.
    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some()
    }

    /// Whether no error is outstanding.
    pub fn is_healthy(&self) -> bool {
        self.error_state == ErrorKind::NoError
    }

    /// Sets the lifecycle stage.
    pub fn set_stage(&mut self, stage: Stage) {
        if stage != self.stage {
            log::debug!("[Session] Stage {:?} -> {:?}", self.stage, stage);
        }
        self.stage = stage;
    }

    /// Records an error.
    pub fn set_error(&mut self, error: ErrorKind) {
        self.error_state = error;
    }

    /// Clears the error state (user approved a retry).
    pub fn clear_error(&mut self) {
        self.error_state = ErrorKind::NoError;
    }

    /// Stores the auth token. At most once per session.
    pub fn store_auth_token(&mut self, token: impl Into<String>) -> Result<(), AuthTokenError> {
        if self.auth_token.is_some() {
            return Err(AuthTokenError::AlreadySet);
        }
        self.auth_token = Some(token.into());
        Ok(())
    }
}
