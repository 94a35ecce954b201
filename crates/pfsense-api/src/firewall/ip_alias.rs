// IP aliases
//
// The config keeps every alias kind (host, network, port, url, ...) in one
// list. Only host and network aliases are managed here, but names are
// unique across all kinds, so conflict checks look at the whole list.
// An entry's addresses are stored space-separated and their descriptions
// `||`-separated, position for position.

use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::Error;
use crate::models::{IpAlias, IpAliasEntry, IpAliasType};
use crate::php;
use crate::resource::Resource;
use crate::session::{SessionClient, SessionRequest, reauth_once};

const EDIT_PATH: &str = "/firewall_aliases_edit.php";
const LIST_PATH: &str = "/firewall_aliases.php";
const LIST_SCRIPT: &str = "$result = array_values(config_get_path('aliases/alias', []) ?: []);";
const DETAIL_SEPARATOR: &str = "||";

/// An alias as the config stores it.
#[derive(Debug, Clone, Deserialize)]
struct RawAlias {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    alias_type: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    descr: String,
    #[serde(default)]
    detail: String,
}

impl RawAlias {
    /// Host or network, the kinds this module manages.
    fn is_ip(&self) -> bool {
        IpAliasType::from_str(&self.alias_type).is_ok()
    }
}

impl TryFrom<RawAlias> for IpAlias {
    type Error = Error;

    fn try_from(raw: RawAlias) -> Result<Self, Error> {
        let alias_type =
            IpAliasType::from_str(&raw.alias_type).map_err(|_| Error::Deserialization {
                message: format!(
                    "alias {} has type {:?}, expected host or network",
                    raw.name, raw.alias_type
                ),
                body: String::new(),
            })?;

        let mut details = raw.detail.split(DETAIL_SEPARATOR);
        let entries = raw
            .address
            .split_whitespace()
            .map(|address| IpAliasEntry {
                address: address.to_owned(),
                description: details
                    .next()
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(str::to_owned),
            })
            .collect();

        Ok(Self {
            name: raw.name,
            description: Some(raw.descr).filter(|d| !d.is_empty()),
            alias_type,
            entries,
        })
    }
}

fn form_fields(alias: &IpAlias) -> Vec<(String, String)> {
    let mut fields = vec![
        ("name".to_owned(), alias.name.clone()),
        (
            "descr".to_owned(),
            alias.description.clone().unwrap_or_default(),
        ),
        ("type".to_owned(), alias.alias_type.to_string()),
    ];
    for (i, entry) in alias.entries.iter().enumerate() {
        let (address, subnet) = match entry.address.split_once('/') {
            Some((address, bits)) => (address, bits),
            None => (entry.address.as_str(), ""),
        };
        fields.push((format!("address{i}"), address.to_owned()));
        fields.push((format!("address_subnet{i}"), subnet.to_owned()));
        fields.push((
            format!("detail{i}"),
            entry.description.clone().unwrap_or_default(),
        ));
    }
    fields.push(("save".to_owned(), "Save".to_owned()));
    fields
}

/// CRUD for host and network aliases.
#[derive(Clone)]
pub struct IpAliases {
    session: Arc<SessionClient>,
}

impl IpAliases {
    pub fn new(session: Arc<SessionClient>) -> Self {
        Self { session }
    }

    /// Host and network aliases, in config order. Other kinds are skipped.
    pub async fn list(&self, cancel: &CancellationToken) -> Result<Vec<IpAlias>, Error> {
        reauth_once(|| async move {
            let aliases = self
                .raw_list(cancel)
                .await?
                .into_iter()
                .filter(RawAlias::is_ip)
                .map(IpAlias::try_from)
                .collect::<Result<Vec<_>, _>>()?;
            debug!(count = aliases.len(), "listed ip aliases");
            Ok(aliases)
        })
        .await
    }

    async fn raw_list(&self, cancel: &CancellationToken) -> Result<Vec<RawAlias>, Error> {
        php::eval(&self.session, LIST_SCRIPT, cancel).await
    }

    /// Config position of the host or network alias called `name`. An
    /// alias of any other kind with that name is not found.
    async fn locate(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<(usize, IpAlias), Error> {
        let (id, raw) = self
            .raw_list(cancel)
            .await?
            .into_iter()
            .enumerate()
            .find(|(_, a)| a.name == name && a.is_ip())
            .ok_or_else(|| Error::NotFound {
                kind: Self::KIND,
                key: name.to_owned(),
            })?;
        Ok((id, IpAlias::try_from(raw)?))
    }

    async fn read_back(&self, name: &str, cancel: &CancellationToken) -> Result<IpAlias, Error> {
        reauth_once(|| async move { Ok(self.locate(name, cancel).await?.1) }).await
    }

    async fn save(
        &self,
        alias: &IpAlias,
        id: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let mut request = SessionRequest::post(EDIT_PATH).fields(form_fields(alias));
        if let Some(id) = id {
            request = request
                .field("id", id.to_string())
                .field("origname", alias.name.as_str());
        }
        self.session
            .send(request, cancel)
            .await?
            .error_for_status(EDIT_PATH)?
            .error_for_input()?;
        Ok(())
    }

    /// Names are unique across every alias kind, so the conflict check
    /// covers the whole list.
    async fn submit_new(&self, alias: &IpAlias, cancel: &CancellationToken) -> Result<(), Error> {
        let existing = self.raw_list(cancel).await?;
        if existing.iter().any(|a| a.name == alias.name) {
            return Err(Error::Conflict {
                kind: Self::KIND,
                key: alias.name.clone(),
            });
        }
        self.save(alias, None, cancel).await
    }

    async fn submit_existing(
        &self,
        alias: &IpAlias,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let (id, _) = self.locate(&alias.name, cancel).await?;
        self.save(alias, Some(id), cancel).await
    }

    async fn delete_once(&self, name: &str, cancel: &CancellationToken) -> Result<(), Error> {
        let (id, _) = self.locate(name, cancel).await?;
        let request = SessionRequest::post(LIST_PATH)
            .field("act", "del")
            .field("tab", "ip")
            .field("id", id.to_string());
        self.session
            .send(request, cancel)
            .await?
            .error_for_status(LIST_PATH)?
            .error_for_input()?;
        Ok(())
    }
}

impl Resource for IpAliases {
    type Entity = IpAlias;

    const KIND: &'static str = "ip alias";

    fn key(entity: &IpAlias) -> &str {
        &entity.name
    }

    async fn create(&self, entity: &IpAlias, cancel: &CancellationToken) -> Result<IpAlias, Error> {
        reauth_once(|| self.submit_new(entity, cancel)).await?;
        info!(name = %entity.name, kind = %entity.alias_type, "ip alias created");
        self.read_back(&entity.name, cancel).await
    }

    async fn read(&self, key: &str, cancel: &CancellationToken) -> Result<IpAlias, Error> {
        self.read_back(key, cancel).await
    }

    async fn update(&self, entity: &IpAlias, cancel: &CancellationToken) -> Result<IpAlias, Error> {
        reauth_once(|| self.submit_existing(entity, cancel)).await?;
        info!(name = %entity.name, "ip alias updated");
        self.read_back(&entity.name, cancel).await
    }

    async fn delete(&self, key: &str, cancel: &CancellationToken) -> Result<(), Error> {
        reauth_once(|| self.delete_once(key, cancel)).await?;
        info!(name = key, "ip alias deleted");
        Ok(())
    }
}
