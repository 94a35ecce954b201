// ── Core error types ──
//
// User-facing errors from pfsense-core. Consumers never match on HTTP
// statuses or scraped markup; the `From<pfsense_api::Error>` impl folds
// every lower-layer failure into one of these classes and keeps its
// message.

use thiserror::Error;

/// Error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Session ──────────────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Session expired and could not be re-established")]
    SessionExpired,

    // ── Transport ────────────────────────────────────────────────────
    #[error("Cannot reach firewall: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Request to firewall timed out")]
    Timeout,

    #[error("Operation cancelled")]
    Cancelled,

    // ── Outcomes ─────────────────────────────────────────────────────
    #[error("Validation failed: {}", .messages.join("; "))]
    ValidationFailed { messages: Vec<String> },

    #[error("{kind} '{key}' already exists")]
    Conflict { kind: String, key: String },

    #[error("{kind} '{key}' not found")]
    NotFound { kind: String, key: String },

    /// The backend answered with something the client could not interpret.
    #[error("Unexpected response: {message}")]
    Protocol { message: String },
}

impl CoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ── Conversion from the API layer ────────────────────────────────────

impl From<pfsense_api::Error> for CoreError {
    fn from(err: pfsense_api::Error) -> Self {
        use pfsense_api::Error as Api;

        match err {
            Api::Configuration { message } => Self::Config { message },
            Api::InvalidUrl(e) => Self::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Authentication { message } => Self::AuthenticationFailed { message },
            Api::SessionExpired => Self::SessionExpired,
            Api::Transport(e) => {
                if e.is_timeout() {
                    Self::Timeout
                } else {
                    Self::ConnectionFailed {
                        reason: e.to_string(),
                    }
                }
            }
            e @ Api::RetriesExhausted { .. } => Self::ConnectionFailed {
                reason: e.to_string(),
            },
            Api::Cancelled => Self::Cancelled,
            Api::Validation { messages } => Self::ValidationFailed { messages },
            Api::Conflict { kind, key } => Self::Conflict {
                kind: kind.to_owned(),
                key,
            },
            Api::NotFound { kind, key } => Self::NotFound {
                kind: kind.to_owned(),
                key,
            },
            e @ Api::UnexpectedStatus { .. } if e.is_transient() => {
                Self::ConnectionFailed {
                    reason: e.to_string(),
                }
            }
            e @ (Api::UnexpectedStatus { .. } | Api::MissingToken { .. }) => Self::Protocol {
                message: e.to_string(),
            },
            Api::Deserialization { message, body: _ } => Self::Protocol { message },
        }
    }
}
