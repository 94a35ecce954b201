// DNS resolver (Unbound) subsystem
//
// Config files and domain overrides are staged on the backend; nothing
// reaches the running resolver until `apply` regenerates its config and
// restarts it.

mod config_file;
mod domain_override;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub use config_file::ConfigFiles;
pub use domain_override::DomainOverrides;

use crate::error::Error;
use crate::resource::Apply;
use crate::session::{SessionClient, SessionRequest, reauth_once};

pub(crate) const UNBOUND_PATH: &str = "/services_unbound.php";

/// Entry point for the DNS resolver subsystem.
#[derive(Clone)]
pub struct DnsResolverClient {
    session: Arc<SessionClient>,
}

impl DnsResolverClient {
    pub fn new(session: Arc<SessionClient>) -> Self {
        Self { session }
    }

    pub fn config_files(&self) -> ConfigFiles {
        ConfigFiles::new(Arc::clone(&self.session))
    }

    pub fn domain_overrides(&self) -> DomainOverrides {
        DomainOverrides::new(Arc::clone(&self.session))
    }

    async fn apply_once(&self, cancel: &CancellationToken) -> Result<(), Error> {
        debug!("applying DNS resolver changes");
        let request = SessionRequest::post(UNBOUND_PATH).field("apply", "Apply Changes");
        self.session
            .send(request, cancel)
            .await?
            .error_for_status(UNBOUND_PATH)?
            .error_for_input()?;
        info!("DNS resolver changes applied");
        Ok(())
    }
}

impl Apply for DnsResolverClient {
    const SUBSYSTEM: &'static str = "dns resolver";

    async fn apply(&self, cancel: &CancellationToken) -> Result<(), Error> {
        reauth_once(|| self.apply_once(cancel)).await
    }
}
