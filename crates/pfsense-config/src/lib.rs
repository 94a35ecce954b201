//! Shared configuration for the pfsense CLI.
//!
//! TOML profiles, password resolution (env + plaintext + keyring), and
//! translation to `pfsense_core::ControllerConfig`. The CLI layers its
//! flag overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pfsense_core::{ControllerConfig, CoreError, RetrySettings, TlsVerification};

/// Keyring service name under which profile passwords are stored.
pub const KEYRING_SERVICE: &str = "pfsense";
/// Password fallback consulted after a profile's own `password_env`.
pub const PASSWORD_ENV: &str = "PFSENSE_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<CoreError> for ConfigError {
    fn from(err: CoreError) -> Self {
        Self::Validation {
            field: "profile".into(),
            reason: err.to_string(),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named firewall profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub insecure: bool,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_retry_min_wait_ms")]
    pub retry_min_wait_ms: u64,

    #[serde(default = "default_retry_max_wait_ms")]
    pub retry_max_wait_ms: u64,

    /// Retries after the first attempt.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            insecure: false,
            timeout: default_timeout(),
            retry_min_wait_ms: default_retry_min_wait_ms(),
            retry_max_wait_ms: default_retry_max_wait_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_retry_min_wait_ms() -> u64 {
    1_000
}
fn default_retry_max_wait_ms() -> u64 {
    5_000
}
fn default_max_attempts() -> i32 {
    3
}
fn default_url() -> String {
    "https://192.168.1.1".into()
}

/// A named firewall profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Web interface base URL.
    #[serde(default = "default_url")]
    pub url: String,

    /// Login name (defaults to `admin`).
    pub username: Option<String>,

    /// Password (plaintext, prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Accept any TLS certificate.
    pub insecure: Option<bool>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    pub timeout: Option<u64>,
    pub retry_min_wait_ms: Option<u64>,
    pub retry_max_wait_ms: Option<u64>,
    pub max_attempts: Option<i32>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            url: default_url(),
            username: None,
            password: None,
            password_env: None,
            insecure: None,
            ca_cert: None,
            timeout: None,
            retry_min_wait_ms: None,
            retry_max_wait_ms: None,
            max_attempts: None,
        }
    }
}

impl Config {
    /// Name of the profile to use when none is given explicitly.
    pub fn active_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "pfsense", "pfsense").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("pfsense");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, still layering `PFSENSE_` environment
/// on top (`PFSENSE_DEFAULTS__TIMEOUT=60`). A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PFSENSE_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_user(profile_name: &str) -> String {
    format!("{profile_name}/password")
}

fn keyring_password(profile_name: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name))
        .and_then(|entry| entry.get_password())
        .ok()
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name))?;
    entry.set_password(password)?;
    Ok(())
}

/// Resolve the password: the profile's `password_env`, then
/// `PFSENSE_PASSWORD`, then the plaintext value, then the keyring.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    resolve_password_from(
        profile,
        profile_name,
        |var| std::env::var(var).ok(),
        keyring_password,
    )
}

fn resolve_password_from(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    let found = profile
        .password_env
        .as_deref()
        .and_then(&env)
        .or_else(|| env(PASSWORD_ENV))
        .or_else(|| profile.password.clone())
        .or_else(|| keyring(profile_name))
        .filter(|pw| !pw.is_empty());

    found
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
}

/// TLS mode for a profile: insecure wins, then a custom CA, then strict.
pub fn profile_tls(profile: &Profile, defaults: &Defaults) -> TlsVerification {
    if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    }
}

/// Retry tuning for a profile, falling back to the global defaults.
pub fn profile_retry(profile: &Profile, defaults: &Defaults) -> RetrySettings {
    RetrySettings {
        min_wait: Duration::from_millis(
            profile
                .retry_min_wait_ms
                .unwrap_or(defaults.retry_min_wait_ms),
        ),
        max_wait: Duration::from_millis(
            profile
                .retry_max_wait_ms
                .unwrap_or(defaults.retry_max_wait_ms),
        ),
        max_attempts: profile.max_attempts.unwrap_or(defaults.max_attempts),
    }
}

/// Build a `ControllerConfig` from a profile, with no flag overrides.
pub fn profile_to_controller_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ControllerConfig, ConfigError> {
    let password = resolve_password(profile, profile_name)?;
    build_controller_config(profile, defaults, password)
}

fn build_controller_config(
    profile: &Profile,
    defaults: &Defaults,
    password: SecretString,
) -> Result<ControllerConfig, ConfigError> {
    let mut builder = ControllerConfig::builder(password)
        .url(profile.url.clone())
        .tls(profile_tls(profile, defaults))
        .timeout(Duration::from_secs(
            profile.timeout.unwrap_or(defaults.timeout),
        ))
        .retry(profile_retry(profile, defaults));
    if let Some(ref username) = profile.username {
        builder = builder.username(username.clone());
    }
    Ok(builder.build()?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn profile_env_var_wins() {
        let profile = Profile {
            password: Some("plain".into()),
            password_env: Some("FW_PW".into()),
            ..Profile::default()
        };
        let env = |var: &str| match var {
            "FW_PW" => Some("from-profile-env".to_owned()),
            PASSWORD_ENV => Some("from-global-env".to_owned()),
            _ => None,
        };
        let pw = resolve_password_from(&profile, "default", env, no_env).unwrap();
        assert_eq!(pw.expose_secret(), "from-profile-env");
    }

    #[test]
    fn global_env_beats_plaintext() {
        let profile = Profile {
            password: Some("plain".into()),
            ..Profile::default()
        };
        let env = |var: &str| (var == PASSWORD_ENV).then(|| "from-global-env".to_owned());
        let pw = resolve_password_from(&profile, "default", env, no_env).unwrap();
        assert_eq!(pw.expose_secret(), "from-global-env");
    }

    #[test]
    fn keyring_is_last_resort() {
        let profile = Profile::default();
        let keyring = |name: &str| (name == "lab").then(|| "from-keyring".to_owned());
        let pw = resolve_password_from(&profile, "lab", no_env, keyring).unwrap();
        assert_eq!(pw.expose_secret(), "from-keyring");
    }

    #[test]
    fn missing_password_is_reported() {
        let err = resolve_password_from(&Profile::default(), "lab", no_env, no_env).unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { profile } if profile == "lab"));
    }

    #[test]
    fn profile_overrides_defaults() {
        let defaults = Defaults::default();
        let profile = Profile {
            url: "https://fw.lab:8443".into(),
            username: Some("ops".into()),
            insecure: Some(true),
            timeout: Some(5),
            max_attempts: Some(0),
            ..Profile::default()
        };
        let config =
            build_controller_config(&profile, &defaults, SecretString::from("pw".to_owned()))
                .unwrap();
        assert_eq!(config.url.as_str(), "https://fw.lab:8443/");
        assert_eq!(config.username, "ops");
        assert_eq!(config.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.retry.max_attempts, 0);
        assert_eq!(config.retry.min_wait, Duration::from_secs(1));
    }

    #[test]
    fn ca_cert_selects_custom_ca() {
        let profile = Profile {
            ca_cert: Some(PathBuf::from("/etc/ssl/fw.pem")),
            ..Profile::default()
        };
        assert_eq!(
            profile_tls(&profile, &Defaults::default()),
            TlsVerification::CustomCa(PathBuf::from("/etc/ssl/fw.pem"))
        );
        assert_eq!(
            profile_tls(&Profile::default(), &Defaults::default()),
            TlsVerification::SystemDefaults
        );
    }

    #[test]
    fn config_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.profiles.insert(
            "lab".into(),
            Profile {
                url: "https://10.0.0.1".into(),
                password_env: Some("LAB_PW".into()),
                ..Profile::default()
            },
        );
        cfg.default_profile = Some("lab".into());
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.active_profile_name(), "lab");
        let lab = &loaded.profiles["lab"];
        assert_eq!(lab.url, "https://10.0.0.1");
        assert_eq!(lab.password_env.as_deref(), Some("LAB_PW"));
        assert_eq!(loaded.defaults.max_attempts, 3);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert!(loaded.profiles.is_empty());
        assert_eq!(loaded.defaults.timeout, 30);
    }
}
