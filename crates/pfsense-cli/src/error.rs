//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use pfsense_config::ConfigError;
use pfsense_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const APPLY_FAILED: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the firewall")]
    #[diagnostic(
        code(pfsense::connection_failed),
        help(
            "{reason}\n\
             Check the URL and that the web interface is reachable.\n\
             Self-signed certificate? Try --insecure (-k) or set ca_cert in your profile."
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(pfsense::timeout),
        help("Increase the per-request timeout with --timeout, or --deadline for the whole command.")
    )]
    Timeout,

    #[error("Operation cancelled")]
    #[diagnostic(code(pfsense::cancelled))]
    Cancelled,

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(pfsense::auth_failed),
        help(
            "Verify the user name and password for profile '{profile}'.\n\
             Run: pfsense config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("Session expired and could not be re-established")]
    #[diagnostic(
        code(pfsense::session_expired),
        help("Another login may be evicting this session. Retry the command.")
    )]
    SessionExpired,

    #[error("No password configured for profile '{profile}'")]
    #[diagnostic(
        code(pfsense::no_credentials),
        help(
            "Configure credentials with: pfsense config init\n\
             Or set the PFSENSE_PASSWORD environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(pfsense::not_found),
        help("Run: pfsense {list_command} to see what exists")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{resource_type} '{identifier}' already exists")]
    #[diagnostic(
        code(pfsense::conflict),
        help("Use update instead of create, or pick another name.")
    )]
    Conflict {
        resource_type: String,
        identifier: String,
    },

    #[error("The firewall rejected the change")]
    #[diagnostic(code(pfsense::rejected), help("{messages}"))]
    Rejected { messages: String },

    #[error("Unexpected response from the firewall: {message}")]
    #[diagnostic(
        code(pfsense::protocol),
        help("Run with -vv to see the requests. The web interface may be a different version.")
    )]
    Protocol { message: String },

    // ── Apply ────────────────────────────────────────────────────────

    #[error("Change saved, but applying the {subsystem} failed")]
    #[diagnostic(
        code(pfsense::apply_failed),
        help(
            "{reason}\n\
             The change is committed but not live. Run: pfsense {retry_command}"
        )
    )]
    ApplyFailed {
        subsystem: String,
        reason: String,
        retry_command: String,
    },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(pfsense::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(pfsense::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: pfsense config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(pfsense::config))]
    Config(Box<figment::Error>),

    #[error("Keyring access failed: {reason}")]
    #[diagnostic(
        code(pfsense::keyring),
        help("Store the password in the profile or PFSENSE_PASSWORD instead.")
    )]
    Keyring { reason: String },

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(pfsense::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::SessionExpired | Self::NoCredentials { .. } => {
                exit_code::AUTH
            }
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Timeout | Self::Cancelled => exit_code::TIMEOUT,
            Self::ApplyFailed { .. } => exit_code::APPLY_FAILED,
            Self::Validation { .. }
            | Self::Rejected { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::Protocol { .. } | Self::Config(_) | Self::Keyring { .. } | Self::Io(_) => {
                exit_code::GENERAL
            }
        }
    }
}

/// The list subcommand that shows entities of a kind.
fn list_command(kind: &str) -> String {
    match kind {
        "config file" => "dns config-files list",
        "domain override" => "dns overrides list",
        "ip alias" => "firewall aliases list",
        _ => "--help",
    }
    .into()
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config { message } => CliError::Validation {
                field: "configuration".into(),
                reason: message,
            },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: "current".into(),
                message,
            },
            CoreError::SessionExpired => CliError::SessionExpired,
            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed { reason },
            CoreError::Timeout => CliError::Timeout,
            CoreError::Cancelled => CliError::Cancelled,
            CoreError::ValidationFailed { messages } => CliError::Rejected {
                messages: messages.join("\n"),
            },
            CoreError::Conflict { kind, key } => CliError::Conflict {
                resource_type: kind,
                identifier: key,
            },
            CoreError::NotFound { kind, key } => CliError::NotFound {
                list_command: list_command(&kind),
                resource_type: kind,
                identifier: key,
            },
            CoreError::Protocol { message } => CliError::Protocol { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound {
                name,
                available: "(see: pfsense config profiles)".into(),
            },
            ConfigError::Serialization(e) => CliError::Validation {
                field: "config".into(),
                reason: e.to_string(),
            },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Keyring(e) => CliError::Keyring {
                reason: e.to_string(),
            },
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}
