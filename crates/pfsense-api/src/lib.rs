// pfsense-api: Async Rust client for the pfSense web management interface

pub mod dns_resolver;
pub mod error;
pub mod firewall;
pub mod markup;
pub mod models;
pub mod resource;
pub mod retry;
pub mod session;
pub mod system;
pub mod transport;

mod auth;
mod php;

pub use dns_resolver::{ConfigFiles, DnsResolverClient, DomainOverrides};
pub use error::{Error, ErrorKind};
pub use firewall::{FirewallClient, IpAliases};
pub use models::{ConfigFile, DomainOverride, IpAlias, IpAliasEntry, IpAliasType, SystemVersion};
pub use resource::{Apply, Resource};
pub use retry::RetryPolicy;
pub use session::{Credentials, SessionClient, SessionPhase, SessionRequest};
pub use system::SystemClient;
pub use transport::{TlsMode, TransportConfig};
