use strum::Display;
use thiserror::Error;

/// Top-level error type for the `pfsense-api` crate.
///
/// Every layer (transport, retry executor, session, subsystem clients)
/// reports through this enum. `pfsense-core` folds these into its
/// user-facing taxonomy without discarding the underlying message.
#[derive(Debug, Error)]
pub enum Error {
    // ── Configuration ───────────────────────────────────────────────
    /// Missing password, unusable base URL, unreadable CA certificate.
    #[error("Invalid client configuration: {message}")]
    Configuration { message: String },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Authentication ──────────────────────────────────────────────
    /// Credentials rejected, or the login exchange did not establish a session.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// A login form came back where a data page was expected.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    /// A page that should carry an anti-forgery token did not.
    #[error("No anti-forgery token found on {page}")]
    MissingToken { page: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Every attempt failed without producing a response.
    #[error("No response obtained after {attempts} attempt(s){}", .last_error.as_ref().map(|e| format!(": {e}")).unwrap_or_default())]
    RetriesExhausted {
        attempts: u32,
        /// Cause reported by the final attempt, kept for diagnostics.
        last_error: Option<String>,
    },

    /// The caller cancelled the operation or its deadline elapsed.
    #[error("Operation cancelled")]
    Cancelled,

    /// A response was obtained but its status is not one the caller handles.
    #[error("Unexpected HTTP {status} from {context}")]
    UnexpectedStatus { status: u16, context: String },

    // ── Application outcomes ────────────────────────────────────────
    /// The backend rejected one or more submitted fields.
    #[error("Validation failed: {}", .messages.join("; "))]
    Validation { messages: Vec<String> },

    /// Create was called for a key that already exists.
    #[error("{kind} '{key}' already exists")]
    Conflict { kind: &'static str, key: String },

    /// Read, update or delete was called for a key that does not exist.
    #[error("{kind} '{key}' not found")]
    NotFound { kind: &'static str, key: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON decoding of a PHP evaluation result failed, with the raw body.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

/// Coarse classification of an [`Error`], stable across variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Authentication,
    SessionExpired,
    Transport,
    Validation,
    Conflict,
    NotFound,
    Cancelled,
    Protocol,
}

impl Error {
    /// Classification used for diagnostics and exit codes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } | Self::InvalidUrl(_) => ErrorKind::Configuration,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::SessionExpired => ErrorKind::SessionExpired,
            Self::Transport(_) | Self::RetriesExhausted { .. } | Self::UnexpectedStatus { .. } => {
                ErrorKind::Transport
            }
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::MissingToken { .. } | Self::Deserialization { .. } => ErrorKind::Protocol,
        }
    }

    /// Returns `true` if the session lapsed and one re-login might resolve it.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Returns `true` if this is a transient network/service failure.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::RetriesExhausted { .. } => true,
            Self::UnexpectedStatus { status, .. } => *status >= 500 && *status != 501,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
