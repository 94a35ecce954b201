// ── Mutation + apply coordination ──
//
// Every mutation may be followed by its subsystem's apply. Apply runs
// only after the mutation succeeded and only when the caller asked for
// it. A failed apply never turns a committed mutation into an error:
// both outcomes are reported side by side.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use pfsense_api::{Apply, Resource};

use crate::error::CoreError;

/// Per-call mutation options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationOptions {
    /// Apply the subsystem's staged changes after a successful mutation.
    pub apply: bool,
}

impl Default for MutationOptions {
    fn default() -> Self {
        Self { apply: true }
    }
}

impl MutationOptions {
    pub fn staged_only() -> Self {
        Self { apply: false }
    }
}

/// What happened to the apply that follows a mutation.
#[derive(Debug)]
pub enum ApplyStatus {
    /// The caller asked not to apply.
    Skipped,
    Applied,
    /// The mutation is committed; the running config was not updated.
    Failed(CoreError),
}

impl ApplyStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// A committed mutation and the outcome of the apply that followed it.
#[derive(Debug)]
pub struct Committed<T> {
    pub value: T,
    pub apply: ApplyStatus,
}

impl<T> Committed<T> {
    pub fn apply_error(&self) -> Option<&CoreError> {
        match &self.apply {
            ApplyStatus::Failed(e) => Some(e),
            ApplyStatus::Skipped | ApplyStatus::Applied => None,
        }
    }
}

/// One entity kind paired with the subsystem apply that publishes it.
#[derive(Clone)]
pub struct Staged<R, A> {
    resource: R,
    applier: A,
}

impl<R, A> Staged<R, A>
where
    R: Resource,
    A: Apply,
{
    pub fn new(resource: R, applier: A) -> Self {
        Self { resource, applier }
    }

    /// The underlying resource client, for operations beyond CRUD.
    pub fn resource(&self) -> &R {
        &self.resource
    }

    pub async fn create(
        &self,
        entity: &R::Entity,
        options: MutationOptions,
        cancel: &CancellationToken,
    ) -> Result<Committed<R::Entity>, CoreError> {
        let created = self.resource.create(entity, cancel).await?;
        Ok(self.commit(created, options, cancel).await)
    }

    pub async fn read(&self, key: &str, cancel: &CancellationToken) -> Result<R::Entity, CoreError> {
        Ok(self.resource.read(key, cancel).await?)
    }

    pub async fn update(
        &self,
        entity: &R::Entity,
        options: MutationOptions,
        cancel: &CancellationToken,
    ) -> Result<Committed<R::Entity>, CoreError> {
        let updated = self.resource.update(entity, cancel).await?;
        Ok(self.commit(updated, options, cancel).await)
    }

    pub async fn delete(
        &self,
        key: &str,
        options: MutationOptions,
        cancel: &CancellationToken,
    ) -> Result<Committed<()>, CoreError> {
        self.resource.delete(key, cancel).await?;
        Ok(self.commit((), options, cancel).await)
    }

    async fn commit<T>(
        &self,
        value: T,
        options: MutationOptions,
        cancel: &CancellationToken,
    ) -> Committed<T> {
        if !options.apply {
            return Committed {
                value,
                apply: ApplyStatus::Skipped,
            };
        }
        let apply = match self.applier.apply(cancel).await {
            Ok(()) => {
                info!(subsystem = A::SUBSYSTEM, kind = R::KIND, "changes applied");
                ApplyStatus::Applied
            }
            Err(e) => {
                warn!(subsystem = A::SUBSYSTEM, kind = R::KIND, error = %e, "apply failed after committed change");
                ApplyStatus::Failed(e.into())
            }
        };
        Committed { value, apply }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use pfsense_api::Error;

    use super::*;

    #[derive(Default)]
    struct MemoryStore {
        items: Mutex<BTreeMap<String, String>>,
        reject: bool,
    }

    impl Resource for &MemoryStore {
        type Entity = (String, String);

        const KIND: &'static str = "note";

        fn key(entity: &Self::Entity) -> &str {
            &entity.0
        }

        async fn create(
            &self,
            entity: &Self::Entity,
            _cancel: &CancellationToken,
        ) -> Result<Self::Entity, Error> {
            if self.reject {
                return Err(Error::Validation {
                    messages: vec!["rejected".into()],
                });
            }
            let mut items = self.items.lock().unwrap();
            if items.contains_key(&entity.0) {
                return Err(Error::Conflict {
                    kind: Self::KIND,
                    key: entity.0.clone(),
                });
            }
            items.insert(entity.0.clone(), entity.1.clone());
            Ok(entity.clone())
        }

        async fn read(
            &self,
            key: &str,
            _cancel: &CancellationToken,
        ) -> Result<Self::Entity, Error> {
            self.items
                .lock()
                .unwrap()
                .get(key)
                .map(|v| (key.to_owned(), v.clone()))
                .ok_or_else(|| Error::NotFound {
                    kind: Self::KIND,
                    key: key.to_owned(),
                })
        }

        async fn update(
            &self,
            entity: &Self::Entity,
            _cancel: &CancellationToken,
        ) -> Result<Self::Entity, Error> {
            let mut items = self.items.lock().unwrap();
            let Some(slot) = items.get_mut(&entity.0) else {
                return Err(Error::NotFound {
                    kind: Self::KIND,
                    key: entity.0.clone(),
                });
            };
            slot.clone_from(&entity.1);
            Ok(entity.clone())
        }

        async fn delete(&self, key: &str, _cancel: &CancellationToken) -> Result<(), Error> {
            self.items
                .lock()
                .unwrap()
                .remove(key)
                .map(|_| ())
                .ok_or_else(|| Error::NotFound {
                    kind: Self::KIND,
                    key: key.to_owned(),
                })
        }
    }

    #[derive(Default)]
    struct CountingApply {
        calls: AtomicU32,
        fail: bool,
    }

    impl Apply for &CountingApply {
        const SUBSYSTEM: &'static str = "notes";

        async fn apply(&self, _cancel: &CancellationToken) -> Result<(), Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(Error::UnexpectedStatus {
                    status: 500,
                    context: "apply".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn note(key: &str, body: &str) -> (String, String) {
        (key.to_owned(), body.to_owned())
    }

    #[tokio::test]
    async fn create_applies_by_default() {
        let store = MemoryStore::default();
        let applier = CountingApply::default();
        let staged = Staged::new(&store, &applier);

        let committed = staged
            .create(&note("a", "1"), MutationOptions::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(committed.value, note("a", "1"));
        assert!(matches!(committed.apply, ApplyStatus::Applied));
        assert_eq!(applier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn update_and_delete_skip_apply_when_not_requested() {
        let store = MemoryStore::default();
        let applier = CountingApply::default();
        let staged = Staged::new(&store, &applier);
        let cancel = CancellationToken::new();
        let off = MutationOptions::staged_only();

        staged.create(&note("a", "1"), off, &cancel).await.unwrap();
        let updated = staged.update(&note("a", "2"), off, &cancel).await.unwrap();
        let deleted = staged.delete("a", off, &cancel).await.unwrap();

        assert!(matches!(updated.apply, ApplyStatus::Skipped));
        assert!(matches!(deleted.apply, ApplyStatus::Skipped));
        assert_eq!(applier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_mutation_never_applies() {
        let store = MemoryStore {
            reject: true,
            ..MemoryStore::default()
        };
        let applier = CountingApply::default();
        let staged = Staged::new(&store, &applier);
        let cancel = CancellationToken::new();

        let err = staged
            .create(&note("a", "1"), MutationOptions::default(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailed { .. }));

        let err = staged
            .delete("missing", MutationOptions::default(), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        assert_eq!(applier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn apply_failure_is_reported_beside_committed_value() {
        let store = MemoryStore::default();
        let applier = CountingApply {
            fail: true,
            ..CountingApply::default()
        };
        let staged = Staged::new(&store, &applier);
        let cancel = CancellationToken::new();

        let committed = staged
            .create(&note("a", "1"), MutationOptions::default(), &cancel)
            .await
            .unwrap();

        assert_eq!(committed.value, note("a", "1"));
        assert!(committed.apply.is_failed());
        assert!(matches!(
            committed.apply_error(),
            Some(CoreError::ConnectionFailed { .. })
        ));
        // The mutation stuck even though apply failed.
        assert_eq!(staged.read("a", &cancel).await.unwrap(), note("a", "1"));
    }

    #[tokio::test]
    async fn create_on_existing_key_conflicts() {
        let store = MemoryStore::default();
        let applier = CountingApply::default();
        let staged = Staged::new(&store, &applier);
        let cancel = CancellationToken::new();
        let off = MutationOptions::staged_only();

        staged.create(&note("a", "1"), off, &cancel).await.unwrap();
        let err = staged.create(&note("a", "2"), off, &cancel).await.unwrap_err();

        assert!(matches!(err, CoreError::Conflict { .. }), "{err:?}");
    }
}
