// System information
//
// Read-only. The package subsystem reports the installed and the latest
// available base system version; the latter requires the firewall to
// reach its update mirror and comes back empty when it cannot.

use std::sync::Arc;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::Error;
use crate::models::SystemVersion;
use crate::php;
use crate::session::{SessionClient, reauth_once};

const VERSION_SCRIPT: &str = "$v = get_system_pkg_version();\n\
     if (is_array($v)) { $result = ['current' => $v['installed_version'] ?? '', 'latest' => $v['version'] ?? '']; }";

#[derive(Debug, Deserialize)]
struct RawVersion {
    #[serde(default)]
    current: String,
    #[serde(default)]
    latest: String,
}

#[derive(Clone)]
pub struct SystemClient {
    session: Arc<SessionClient>,
}

impl SystemClient {
    pub fn new(session: Arc<SessionClient>) -> Self {
        Self { session }
    }

    /// Installed and latest available system version.
    pub async fn version(&self, cancel: &CancellationToken) -> Result<SystemVersion, Error> {
        reauth_once(|| self.version_once(cancel)).await
    }

    async fn version_once(&self, cancel: &CancellationToken) -> Result<SystemVersion, Error> {
        let raw: Option<RawVersion> = php::eval(&self.session, VERSION_SCRIPT, cancel).await?;
        let raw = raw.ok_or_else(|| Error::Deserialization {
            message: "system version information unavailable".into(),
            body: String::new(),
        })?;
        debug!(current = %raw.current, latest = %raw.latest, "read system version");
        Ok(SystemVersion {
            current: raw.current,
            latest: raw.latest,
        })
    }
}
