// Domain entities
//
// Values handed in by callers are already validated; the client treats
// every field as opaque. Each entity is identified by a natural key that
// never changes after creation.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// An Unbound include file under the resolver's `conf.d` directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// File name; the natural key.
    pub name: String,
    /// Unbound clauses, written verbatim.
    pub content: String,
}

/// A domain whose lookups are sent to a specific upstream server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainOverride {
    /// Overridden domain; the natural key.
    pub domain: String,
    /// Upstream server address, optionally with `@port`.
    pub ip_address: String,
    /// Query the upstream over TLS.
    #[serde(default)]
    pub tls_queries: bool,
    /// Hostname used to verify the upstream certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IpAliasType {
    Host,
    Network,
}

/// One address in an alias: an IP or FQDN for hosts, a CIDR for networks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpAliasEntry {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A named group of hosts or networks usable in firewall rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpAlias {
    /// Alias name; the natural key.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub alias_type: IpAliasType,
    #[serde(default)]
    pub entries: Vec<IpAliasEntry>,
}

/// Installed and latest available system versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemVersion {
    pub current: String,
    pub latest: String,
}
