// Firewall subsystem
//
// Alias edits land in the config immediately but the packet filter keeps
// its old tables until the ruleset is reloaded.

mod ip_alias;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub use ip_alias::IpAliases;

use crate::error::Error;
use crate::resource::Apply;
use crate::session::{SessionClient, SessionRequest, reauth_once};

const RELOAD_PATH: &str = "/status_filter_reload.php";

/// Entry point for the firewall subsystem.
#[derive(Clone)]
pub struct FirewallClient {
    session: Arc<SessionClient>,
}

impl FirewallClient {
    pub fn new(session: Arc<SessionClient>) -> Self {
        Self { session }
    }

    pub fn ip_aliases(&self) -> IpAliases {
        IpAliases::new(Arc::clone(&self.session))
    }

    async fn reload_once(&self, cancel: &CancellationToken) -> Result<(), Error> {
        debug!("reloading firewall filter");
        let request = SessionRequest::post(RELOAD_PATH).field("reloadfilter", "Reload Filter");
        self.session
            .send(request, cancel)
            .await?
            .error_for_status(RELOAD_PATH)?
            .error_for_input()?;
        info!("firewall filter reloaded");
        Ok(())
    }
}

impl Apply for FirewallClient {
    const SUBSYSTEM: &'static str = "firewall";

    async fn apply(&self, cancel: &CancellationToken) -> Result<(), Error> {
        reauth_once(|| self.reload_once(cancel)).await
    }
}
