// ── Controller facade ──
//
// Owns the one session to a firewall and hands out subsystem handles
// that share it. Nothing runs in the background: every call is driven
// by the caller and honours the caller's cancellation token.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use pfsense_api::{
    Apply, ConfigFiles, Credentials, DnsResolverClient, DomainOverrides, FirewallClient,
    IpAliases, RetryPolicy, SessionClient, SystemClient, SystemVersion, TransportConfig,
};

use crate::commit::Staged;
use crate::config::ControllerConfig;
use crate::error::CoreError;

/// The main entry point for consumers.
///
/// Cheap to clone; clones share the session, so one login serves them
/// all and form submissions stay serialized.
#[derive(Clone)]
pub struct Controller {
    config: Arc<ControllerConfig>,
    session: Arc<SessionClient>,
}

impl Controller {
    /// Validate the configuration and prepare a session. Does not
    /// contact the firewall; the first operation logs in.
    pub fn new(config: ControllerConfig) -> Result<Self, CoreError> {
        config.validate()?;

        let transport = TransportConfig {
            tls: (&config.tls).into(),
            timeout: config.timeout,
            ..TransportConfig::default()
        };
        let credentials = Credentials {
            username: config.username.clone(),
            password: config.password.clone(),
        };
        let session = SessionClient::new(
            config.url.clone(),
            credentials,
            transport,
            RetryPolicy::from(config.retry),
        )?;
        debug!(url = %config.url, user = %config.username, "controller ready");

        Ok(Self {
            config: Arc::new(config),
            session: Arc::new(session),
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// The shared session, for callers that need the raw subsystem clients.
    pub fn session(&self) -> &Arc<SessionClient> {
        &self.session
    }

    fn dns_resolver(&self) -> DnsResolverClient {
        DnsResolverClient::new(Arc::clone(&self.session))
    }

    fn firewall(&self) -> FirewallClient {
        FirewallClient::new(Arc::clone(&self.session))
    }

    // ── Entity kinds ─────────────────────────────────────────────────

    pub fn config_files(&self) -> Staged<ConfigFiles, DnsResolverClient> {
        let dns = self.dns_resolver();
        Staged::new(dns.config_files(), dns)
    }

    pub fn domain_overrides(&self) -> Staged<DomainOverrides, DnsResolverClient> {
        let dns = self.dns_resolver();
        Staged::new(dns.domain_overrides(), dns)
    }

    pub fn ip_aliases(&self) -> Staged<IpAliases, FirewallClient> {
        let firewall = self.firewall();
        Staged::new(firewall.ip_aliases(), firewall)
    }

    // ── Subsystem actions ────────────────────────────────────────────

    /// Apply pending DNS resolver changes.
    pub async fn apply_dns_resolver(&self, cancel: &CancellationToken) -> Result<(), CoreError> {
        Ok(self.dns_resolver().apply(cancel).await?)
    }

    /// Reload the firewall filter so alias changes take effect.
    pub async fn reload_firewall_filter(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(), CoreError> {
        Ok(self.firewall().apply(cancel).await?)
    }

    pub async fn system_version(
        &self,
        cancel: &CancellationToken,
    ) -> Result<SystemVersion, CoreError> {
        Ok(SystemClient::new(Arc::clone(&self.session))
            .version(cancel)
            .await?)
    }

    /// End the session. Safe to call when never logged in.
    pub async fn logout(&self, cancel: &CancellationToken) -> Result<(), CoreError> {
        Ok(self.session.logout(cancel).await?)
    }
}
