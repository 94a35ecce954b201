// ── Runtime connection configuration ──
//
// Describes how to reach one firewall: address, credentials, TLS and
// retry tuning. Never touches disk; the CLI builds a `ControllerConfig`
// from its profile and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use pfsense_api::retry::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_MAX_WAIT, DEFAULT_RETRY_MIN_WAIT, RetryPolicy,
};
use pfsense_api::session::{DEFAULT_URL, DEFAULT_USERNAME};
use pfsense_api::transport::TlsMode;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::CoreError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (factory self-signed certificate).
    DangerAcceptInvalid,
}

impl From<&TlsVerification> for TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => Self::Verify,
            TlsVerification::CustomCa(path) => Self::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => Self::DangerAcceptInvalid,
        }
    }
}

/// Backoff bounds and attempt budget for every exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    pub min_wait: Duration,
    pub max_wait: Duration,
    /// Retries after the first attempt. Negative means no retries.
    pub max_attempts: i32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            min_wait: DEFAULT_RETRY_MIN_WAIT,
            max_wait: DEFAULT_RETRY_MAX_WAIT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl From<RetrySettings> for RetryPolicy {
    fn from(settings: RetrySettings) -> Self {
        Self {
            min_wait: settings.min_wait,
            max_wait: settings.max_wait,
            max_attempts: settings.max_attempts,
        }
    }
}

/// Configuration for connecting to a single firewall.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Web interface URL (e.g., `https://192.168.1.1`).
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    pub tls: TlsVerification,
    /// Per-exchange timeout.
    pub timeout: Duration,
    pub retry: RetrySettings,
}

impl ControllerConfig {
    /// Start from the defaults with the one required field.
    pub fn builder(password: SecretString) -> ControllerConfigBuilder {
        ControllerConfigBuilder {
            url: None,
            username: DEFAULT_USERNAME.to_owned(),
            password,
            tls: TlsVerification::default(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetrySettings::default(),
        }
    }

    /// Reject configurations the session client could never use.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !matches!(self.url.scheme(), "http" | "https") || self.url.host_str().is_none() {
            return Err(CoreError::Config {
                message: format!("url must be an http(s) address, got {}", self.url),
            });
        }
        if self.username.trim().is_empty() {
            return Err(CoreError::Config {
                message: "username must not be empty".into(),
            });
        }
        if self.password.expose_secret().is_empty() {
            return Err(CoreError::Config {
                message: "password is required".into(),
            });
        }
        if self.retry.min_wait > self.retry.max_wait {
            return Err(CoreError::Config {
                message: format!(
                    "retry min wait ({:?}) exceeds max wait ({:?})",
                    self.retry.min_wait, self.retry.max_wait
                ),
            });
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct ControllerConfigBuilder {
    url: Option<String>,
    username: String,
    password: SecretString,
    tls: TlsVerification,
    timeout: Duration,
    retry: RetrySettings,
}

impl ControllerConfigBuilder {
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn tls(mut self, tls: TlsVerification) -> Self {
        self.tls = tls;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    pub fn build(self) -> Result<ControllerConfig, CoreError> {
        let raw = self.url.as_deref().unwrap_or(DEFAULT_URL);
        let url = Url::parse(raw).map_err(|e| CoreError::Config {
            message: format!("invalid url '{raw}': {e}"),
        })?;
        let config = ControllerConfig {
            url,
            username: self.username,
            password: self.password,
            tls: self.tls,
            timeout: self.timeout,
            retry: self.retry,
        };
        config.validate()?;
        Ok(config)
    }
}
