// Domain overrides
//
// Stored in the config as an ordered list; the edit and delete pages
// address an entry by its position, so every mutation resolves the
// domain to an index first.

use std::sync::Arc;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::UNBOUND_PATH;
use crate::error::Error;
use crate::models::DomainOverride;
use crate::php;
use crate::resource::Resource;
use crate::session::{SessionClient, SessionRequest, reauth_once};

const EDIT_PATH: &str = "/services_unbound_domainoverride_edit.php";
const LIST_SCRIPT: &str =
    "$result = array_values(config_get_path('unbound/domainoverrides', []) ?: []);";

/// A domain override as the config stores it.
#[derive(Debug, Deserialize)]
struct RawOverride {
    #[serde(default)]
    domain: String,
    #[serde(default)]
    ip: String,
    #[serde(default)]
    descr: Option<String>,
    #[serde(default)]
    tls_hostname: Option<String>,
    /// Present (with any value) when TLS forwarding is on.
    #[serde(default)]
    forward_tls_upstream: Option<serde_json::Value>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl From<RawOverride> for DomainOverride {
    fn from(raw: RawOverride) -> Self {
        Self {
            domain: raw.domain,
            ip_address: raw.ip,
            tls_queries: raw
                .forward_tls_upstream
                .is_some_and(|v| !v.is_null() && v != serde_json::Value::Bool(false)),
            tls_hostname: non_empty(raw.tls_hostname),
            description: non_empty(raw.descr),
        }
    }
}

fn form_fields(entity: &DomainOverride) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("domain", entity.domain.clone()),
        ("server", entity.ip_address.clone()),
    ];
    if entity.tls_queries {
        fields.push(("forward_tls_upstream", "yes".into()));
    }
    fields.push(("tls_hostname", entity.tls_hostname.clone().unwrap_or_default()));
    fields.push(("descr", entity.description.clone().unwrap_or_default()));
    fields.push(("save", "Save".into()));
    fields
}

/// CRUD for DNS resolver domain overrides.
#[derive(Clone)]
pub struct DomainOverrides {
    session: Arc<SessionClient>,
}

impl DomainOverrides {
    pub fn new(session: Arc<SessionClient>) -> Self {
        Self { session }
    }

    /// All overrides, in config order.
    pub async fn list(&self, cancel: &CancellationToken) -> Result<Vec<DomainOverride>, Error> {
        reauth_once(|| self.list_once(cancel)).await
    }

    async fn list_once(&self, cancel: &CancellationToken) -> Result<Vec<DomainOverride>, Error> {
        let raw: Vec<RawOverride> = php::eval(&self.session, LIST_SCRIPT, cancel).await?;
        debug!(count = raw.len(), "listed domain overrides");
        Ok(raw.into_iter().map(DomainOverride::from).collect())
    }

    /// Position of `domain` in the stored list.
    async fn locate(
        &self,
        domain: &str,
        cancel: &CancellationToken,
    ) -> Result<(usize, DomainOverride), Error> {
        self.list_once(cancel)
            .await?
            .into_iter()
            .enumerate()
            .find(|(_, o)| o.domain == domain)
            .ok_or_else(|| Error::NotFound {
                kind: Self::KIND,
                key: domain.to_owned(),
            })
    }

    async fn save(
        &self,
        entity: &DomainOverride,
        id: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let mut request = SessionRequest::post(EDIT_PATH).fields(form_fields(entity));
        if let Some(id) = id {
            request = request.field("id", id.to_string());
        }
        self.session
            .send(request, cancel)
            .await?
            .error_for_status(EDIT_PATH)?
            .error_for_input()?;
        Ok(())
    }

    /// Conflict check and save. Once the save is accepted the record
    /// exists, so the read-back must not repeat this step.
    async fn submit_new(
        &self,
        entity: &DomainOverride,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let existing = self.list_once(cancel).await?;
        if existing.iter().any(|o| o.domain == entity.domain) {
            return Err(Error::Conflict {
                kind: Self::KIND,
                key: entity.domain.clone(),
            });
        }
        self.save(entity, None, cancel).await
    }

    async fn submit_existing(
        &self,
        entity: &DomainOverride,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let (id, _) = self.locate(&entity.domain, cancel).await?;
        self.save(entity, Some(id), cancel).await
    }

    async fn read_back(
        &self,
        domain: &str,
        cancel: &CancellationToken,
    ) -> Result<DomainOverride, Error> {
        reauth_once(|| async move { Ok(self.locate(domain, cancel).await?.1) }).await
    }

    async fn delete_once(&self, domain: &str, cancel: &CancellationToken) -> Result<(), Error> {
        let (id, _) = self.locate(domain, cancel).await?;
        let request = SessionRequest::post(UNBOUND_PATH)
            .field("act", "del")
            .field("type", "doverride")
            .field("id", id.to_string());
        self.session
            .send(request, cancel)
            .await?
            .error_for_status(UNBOUND_PATH)?
            .error_for_input()?;
        Ok(())
    }
}

impl Resource for DomainOverrides {
    type Entity = DomainOverride;

    const KIND: &'static str = "domain override";

    fn key(entity: &DomainOverride) -> &str {
        &entity.domain
    }

    async fn create(
        &self,
        entity: &DomainOverride,
        cancel: &CancellationToken,
    ) -> Result<DomainOverride, Error> {
        reauth_once(|| self.submit_new(entity, cancel)).await?;
        info!(domain = %entity.domain, "domain override created");
        self.read_back(&entity.domain, cancel).await
    }

    async fn read(&self, key: &str, cancel: &CancellationToken) -> Result<DomainOverride, Error> {
        self.read_back(key, cancel).await
    }

    async fn update(
        &self,
        entity: &DomainOverride,
        cancel: &CancellationToken,
    ) -> Result<DomainOverride, Error> {
        reauth_once(|| self.submit_existing(entity, cancel)).await?;
        info!(domain = %entity.domain, "domain override updated");
        self.read_back(&entity.domain, cancel).await
    }

    async fn delete(&self, key: &str, cancel: &CancellationToken) -> Result<(), Error> {
        reauth_once(|| self.delete_once(key, cancel)).await?;
        info!(domain = key, "domain override deleted");
        Ok(())
    }
}
