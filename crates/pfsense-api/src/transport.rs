// Transport configuration for building reqwest::Client instances.
//
// One client per session: a private cookie jar, the TLS verification
// mode, and reqwest's connection pool. No retry and no authentication
// logic lives here.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;

use crate::error::Error;

const USER_AGENT: &str = concat!("pfsense-api/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsMode {
    /// Use the system certificate store.
    #[default]
    Verify,
    /// Trust a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (appliances ship self-signed by default).
    DangerAcceptInvalid,
}

impl TlsMode {
    /// Map the plain "verify TLS" toggle onto a mode.
    pub fn from_verify(verify: bool) -> Self {
        if verify {
            Self::Verify
        } else {
            Self::DangerAcceptInvalid
        }
    }
}

/// Transport configuration for building the session's HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    /// Per-exchange timeout. The caller's cancellation token bounds the
    /// whole operation.
    pub timeout: Duration,
    /// Idle pooled connections kept per host.
    pub pool_max_idle_per_host: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::Verify,
            timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 8,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` bound to a fresh, private cookie jar.
    ///
    /// The jar is returned alongside the client so the session can
    /// inspect it; dropping both discards the session cookies.
    pub fn build_client(&self) -> Result<(reqwest::Client, Arc<Jar>), Error> {
        let jar = Arc::new(Jar::default());

        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .cookie_provider(Arc::clone(&jar));

        match &self.tls {
            TlsMode::Verify => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path).map_err(|e| Error::Configuration {
                    message: format!("failed to read CA cert {}: {e}", path.display()),
                })?;
                let cert =
                    reqwest::Certificate::from_pem(&cert_pem).map_err(|e| Error::Configuration {
                        message: format!("invalid CA cert {}: {e}", path.display()),
                    })?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        let client = builder.build().map_err(|e| Error::Configuration {
            message: format!("failed to build HTTP client: {e}"),
        })?;

        Ok((client, jar))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_toggle_maps_to_mode() {
        assert_eq!(TlsMode::from_verify(true), TlsMode::Verify);
        assert_eq!(TlsMode::from_verify(false), TlsMode::DangerAcceptInvalid);
        assert_eq!(TlsMode::default(), TlsMode::Verify);
    }

    #[test]
    fn missing_ca_file_is_configuration_error() {
        let config = TransportConfig {
            tls: TlsMode::CustomCa("/nonexistent/ca.pem".into()),
            ..TransportConfig::default()
        };
        let err = config.build_client().err();
        assert!(matches!(err, Some(Error::Configuration { .. })), "{err:?}");
    }
}
