// Capability interfaces
//
// Every entity kind is reachable through the same four operations, and
// every subsystem through one apply. How a given backend version maps
// them onto pages is private to the implementing type.

#![allow(async_fn_in_trait)]

use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// Create/read/update/delete for one entity kind.
pub trait Resource {
    type Entity: Clone;

    /// Human-readable kind name used in errors and logs.
    const KIND: &'static str;

    /// The entity's natural key.
    fn key(entity: &Self::Entity) -> &str;

    /// Submit a new record. Fails with [`Error::Conflict`] if the key exists.
    async fn create(
        &self,
        entity: &Self::Entity,
        cancel: &CancellationToken,
    ) -> Result<Self::Entity, Error>;

    /// Current state of the record. Fails with [`Error::NotFound`] if absent.
    async fn read(&self, key: &str, cancel: &CancellationToken) -> Result<Self::Entity, Error>;

    /// Replace the record wholesale. Fails with [`Error::NotFound`] if absent.
    async fn update(
        &self,
        entity: &Self::Entity,
        cancel: &CancellationToken,
    ) -> Result<Self::Entity, Error>;

    /// Remove the record. Fails with [`Error::NotFound`] if absent.
    async fn delete(&self, key: &str, cancel: &CancellationToken) -> Result<(), Error>;
}

/// The single commit action of a subsystem.
pub trait Apply {
    /// Subsystem name used in errors and logs.
    const SUBSYSTEM: &'static str;

    /// Make the running configuration match the staged draft. Succeeds
    /// when nothing is pending.
    async fn apply(&self, cancel: &CancellationToken) -> Result<(), Error>;
}
