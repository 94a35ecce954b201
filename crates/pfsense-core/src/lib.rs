//! Control-plane layer between `pfsense-api` and the CLI.
//!
//! - **[`Controller`]** owns the single session to a firewall and hands out
//!   per-kind handles that share it.
//! - **[`Staged`]** pairs an entity kind with its subsystem apply, so a
//!   mutation is published only after it succeeds and only when
//!   [`MutationOptions::apply`] is set. The result is a [`Committed`] value
//!   whose [`ApplyStatus`] reports the apply separately.
//! - **[`CoreError`]** is the user-facing error taxonomy.

pub mod commit;
pub mod config;
pub mod controller;
pub mod error;

pub use commit::{ApplyStatus, Committed, MutationOptions, Staged};
pub use config::{ControllerConfig, ControllerConfigBuilder, RetrySettings, TlsVerification};
pub use controller::Controller;
pub use error::CoreError;

// Domain types come straight from the API layer.
pub use pfsense_api::{
    ConfigFile, DomainOverride, IpAlias, IpAliasEntry, IpAliasType, Resource, SystemVersion,
};
