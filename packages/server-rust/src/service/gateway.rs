//! Operation gateway: one entry point per logical operation.
//!
//! Every operation follows the same sequence:
//! `received -> validated -> locked -> backend-invoked -> unlocked -> responded`.
//! Validation is pure and happens before locking. Single-object operations
//! (read-one, create, update, delete, file mutations) hold the object's
//! resource key for the duration of the backend call. Once the key is held,
//! the backend call runs on its own task together with the guard, so a
//! caller that gives up (timeout, disconnect) cannot cut a multi-step write
//! short and release the key over a half-written object. Bulk reads and
//! searches span many objects and take no lock. Backend errors are never
//! retried here; they are classified and surfaced.

use std::future::Future;
use std::sync::Arc;

use easystore_core::{
    new_object_id, Components, EasyStore, EasyStoreObject, ObjectBlob, ObjectFields, StoreError,
    StoreResult,
};
use tokio::task::JoinError;
use tracing::{error, info, warn};

use super::drain::drain;
use super::locks::{resource_key, LockError, LockRegistry, ResourceGuard};
use super::outcome::{report, Outcome};
use super::validate::{check_namespace, check_update, ValidationError};

/// Vtag assumed when a delete does not supply one. Never matches a real
/// vtag, so such deletes are always rejected as stale.
pub const UNKNOWN_VTAG: &str = "unknown";

/// Failure of a gateway operation.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("{source}")]
    Store {
        outcome: Outcome,
        #[source]
        source: StoreError,
    },

    /// The task running a locked backend call panicked or was aborted.
    #[error("backend call did not complete: {0}")]
    Aborted(#[from] JoinError),
}

impl GatewayError {
    /// Caller-visible classification of this failure.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Validation(_) => Outcome::BadParameter,
            Self::Lock(_) => Outcome::LockTimeout,
            Self::Store { outcome, .. } => *outcome,
            Self::Aborted(_) => Outcome::Internal,
        }
    }
}

/// Result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Fronts an [`EasyStore`] with per-object serialization.
#[derive(Clone)]
pub struct ObjectGateway {
    store: Arc<dyn EasyStore>,
    locks: Arc<LockRegistry>,
}

impl ObjectGateway {
    #[must_use]
    pub fn new(store: Arc<dyn EasyStore>, locks: Arc<LockRegistry>) -> Self {
        Self { store, locks }
    }

    /// The lock registry this gateway serializes on.
    #[must_use]
    pub fn locks(&self) -> &Arc<LockRegistry> {
        &self.locks
    }

    async fn lock(&self, key: &str) -> GatewayResult<ResourceGuard> {
        self.locks.acquire(key).await.map_err(|err| {
            error!(key, "{err}");
            GatewayError::Lock(err)
        })
    }

    fn store_error(operation: &'static str, key: &str, source: StoreError) -> GatewayError {
        let outcome = report(operation, key, &source);
        GatewayError::Store { outcome, source }
    }

    fn rejected(operation: &'static str, err: ValidationError) -> GatewayError {
        warn!(
            operation,
            outcome = Outcome::BadParameter.as_str(),
            details = %err.details(),
            "{err}"
        );
        GatewayError::Validation(err)
    }

    /// Runs `call` on a separate task that owns `guard`. The call and the
    /// release complete even if the awaiting caller is dropped.
    async fn run_locked<T, F>(
        guard: ResourceGuard,
        operation: &'static str,
        call: F,
    ) -> GatewayResult<T>
    where
        T: Send + 'static,
        F: Future<Output = StoreResult<T>> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let result = call.await;
            let key = guard.key().to_string();
            drop(guard);
            result.map_err(|e| Self::store_error(operation, &key, e))
        });
        task.await.map_err(|err| {
            error!(operation, "{err}");
            GatewayError::Aborted(err)
        })?
    }

    /// Reads one object with the requested components.
    ///
    /// # Errors
    ///
    /// Lock timeout or a classified backend failure.
    pub async fn get_object(
        &self,
        ns: &str,
        id: &str,
        components: Components,
    ) -> GatewayResult<EasyStoreObject> {
        let key = resource_key(ns, id);
        info!(key = %key, %components, "get object");

        let guard = self.lock(&key).await?;
        let store = Arc::clone(&self.store);
        let (ns, id) = (ns.to_string(), id.to_string());
        Self::run_locked(guard, "get", async move {
            store.get_by_key(&ns, &id, components).await
        })
        .await
    }

    /// Reads many objects by identifier, in backend order. Takes no lock.
    ///
    /// # Errors
    ///
    /// A classified backend failure, including one raised mid-drain.
    pub async fn get_objects(
        &self,
        ns: &str,
        ids: &[String],
        components: Components,
    ) -> GatewayResult<Vec<EasyStoreObject>> {
        info!(ns, ids = %ids.join(","), %components, "get objects");

        let mut cursor = self
            .store
            .get_by_keys(ns, ids, components)
            .await
            .map_err(|e| Self::store_error("get-many", ns, e))?;
        drain(cursor.as_mut()).map_err(|e| Self::store_error("get-many", ns, e))
    }

    /// Finds objects by field values. Takes no lock.
    ///
    /// # Errors
    ///
    /// A classified backend failure, including one raised mid-drain.
    pub async fn search_objects(
        &self,
        ns: &str,
        query: &ObjectFields,
        components: Components,
    ) -> GatewayResult<Vec<EasyStoreObject>> {
        info!(ns, terms = query.len(), %components, "search objects");

        let mut cursor = self
            .store
            .get_by_fields(ns, query, components)
            .await
            .map_err(|e| Self::store_error("search", ns, e))?;
        drain(cursor.as_mut()).map_err(|e| Self::store_error("search", ns, e))
    }

    /// Creates an object and returns its base identity with the new vtag.
    ///
    /// An object without an identifier gets one minted here so that the
    /// create can be serialized on its resource key like any other write.
    ///
    /// # Errors
    ///
    /// Namespace mismatch, lock timeout, or a classified backend failure.
    pub async fn create_object(
        &self,
        ns: &str,
        mut obj: EasyStoreObject,
    ) -> GatewayResult<EasyStoreObject> {
        check_namespace(ns, &obj).map_err(|e| Self::rejected("create", e))?;
        if obj.id.is_empty() {
            obj.id = new_object_id();
        }

        let key = resource_key(ns, &obj.id);
        info!(key = %key, "create object");

        let guard = self.lock(&key).await?;
        let store = Arc::clone(&self.store);
        let created =
            Self::run_locked(guard, "create", async move { store.create(obj).await }).await?;
        Ok(created.project(Components::BASE))
    }

    /// Replaces the selected components of an object and returns its base
    /// identity with the new vtag.
    ///
    /// The backend makes the authoritative vtag comparison; a stale vtag
    /// surfaces as [`Outcome::StaleVtag`].
    ///
    /// # Errors
    ///
    /// Body/path mismatch, lock timeout, or a classified backend failure.
    pub async fn update_object(
        &self,
        ns: &str,
        id: &str,
        obj: EasyStoreObject,
        components: Components,
    ) -> GatewayResult<EasyStoreObject> {
        check_update(ns, id, &obj).map_err(|e| Self::rejected("update", e))?;

        let key = resource_key(ns, id);
        info!(key = %key, vtag = %obj.vtag, %components, "update object");

        let guard = self.lock(&key).await?;
        let store = Arc::clone(&self.store);
        let updated = Self::run_locked(guard, "update", async move {
            store.update(obj, components).await
        })
        .await?;
        Ok(updated.project(Components::BASE))
    }

    /// Deletes an object if `vtag` is current.
    ///
    /// # Errors
    ///
    /// Lock timeout or a classified backend failure.
    pub async fn delete_object(&self, ns: &str, id: &str, vtag: &str) -> GatewayResult<()> {
        let key = resource_key(ns, id);
        info!(key = %key, vtag, "delete object");

        let guard = self.lock(&key).await?;
        let store = Arc::clone(&self.store);
        let target = EasyStoreObject::proxy(ns, id, vtag);
        Self::run_locked(guard, "delete", async move {
            store.delete(target, Components::ALL).await.map(|_| ())
        })
        .await
    }

    /// Attaches a new file to an object.
    ///
    /// # Errors
    ///
    /// Lock timeout or a classified backend failure.
    pub async fn create_file(&self, ns: &str, id: &str, file: ObjectBlob) -> GatewayResult<()> {
        let key = resource_key(ns, id);
        info!(key = %key, file = %file.name, "create file");

        let guard = self.lock(&key).await?;
        let store = Arc::clone(&self.store);
        let (ns, id) = (ns.to_string(), id.to_string());
        Self::run_locked(guard, "file-create", async move {
            store.file_create(&ns, &id, file).await
        })
        .await
    }

    /// Replaces an existing file.
    ///
    /// # Errors
    ///
    /// Lock timeout or a classified backend failure.
    pub async fn update_file(&self, ns: &str, id: &str, file: ObjectBlob) -> GatewayResult<()> {
        let key = resource_key(ns, id);
        info!(key = %key, file = %file.name, "update file");

        let guard = self.lock(&key).await?;
        let store = Arc::clone(&self.store);
        let (ns, id) = (ns.to_string(), id.to_string());
        Self::run_locked(guard, "file-update", async move {
            store.file_update(&ns, &id, file).await
        })
        .await
    }

    /// Renames a file.
    ///
    /// # Errors
    ///
    /// Lock timeout or a classified backend failure.
    pub async fn rename_file(
        &self,
        ns: &str,
        id: &str,
        old_name: &str,
        new_name: &str,
    ) -> GatewayResult<()> {
        let key = resource_key(ns, id);
        info!(key = %key, old_name, new_name, "rename file");

        let guard = self.lock(&key).await?;
        let store = Arc::clone(&self.store);
        let (ns, id) = (ns.to_string(), id.to_string());
        let (old_name, new_name) = (old_name.to_string(), new_name.to_string());
        Self::run_locked(guard, "file-rename", async move {
            store.file_rename(&ns, &id, &old_name, &new_name).await
        })
        .await
    }

    /// Removes a file.
    ///
    /// # Errors
    ///
    /// Lock timeout or a classified backend failure.
    pub async fn delete_file(&self, ns: &str, id: &str, name: &str) -> GatewayResult<()> {
        let key = resource_key(ns, id);
        info!(key = %key, name, "delete file");

        let guard = self.lock(&key).await?;
        let store = Arc::clone(&self.store);
        let (ns, id, name) = (ns.to_string(), id.to_string(), name.to_string());
        Self::run_locked(guard, "file-delete", async move {
            store.file_delete(&ns, &id, &name).await
        })
        .await
    }

    /// Probes backend reachability. Never panics; failures are returned.
    ///
    /// # Errors
    ///
    /// The backend's own failure.
    pub async fn check(&self) -> Result<(), StoreError> {
        self.store.check().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use easystore_core::{ObjectCursor, StoreResult};

    use super::*;
    use crate::storage::MemoryStore;

    /// Wraps a store and records how many backend calls overlap per run.
    struct OverlapStore {
        inner: MemoryStore,
        active: AtomicUsize,
        max_active: AtomicUsize,
        delay: Duration,
    }

    impl OverlapStore {
        fn new(delay: Duration) -> Self {
            Self {
                inner: MemoryStore::new(),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
                delay,
            }
        }

        async fn enter(&self) {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
        }

        fn leave(&self) {
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl EasyStore for OverlapStore {
        async fn create(&self, obj: EasyStoreObject) -> StoreResult<EasyStoreObject> {
            self.enter().await;
            let r = self.inner.create(obj).await;
            self.leave();
            r
        }

        async fn get_by_key(
            &self,
            ns: &str,
            id: &str,
            components: Components,
        ) -> StoreResult<EasyStoreObject> {
            self.enter().await;
            let r = self.inner.get_by_key(ns, id, components).await;
            self.leave();
            r
        }

        async fn get_by_keys(
            &self,
            ns: &str,
            ids: &[String],
            components: Components,
        ) -> StoreResult<Box<dyn ObjectCursor>> {
            self.inner.get_by_keys(ns, ids, components).await
        }

        async fn get_by_fields(
            &self,
            ns: &str,
            query: &ObjectFields,
            components: Components,
        ) -> StoreResult<Box<dyn ObjectCursor>> {
            self.inner.get_by_fields(ns, query, components).await
        }

        async fn update(
            &self,
            obj: EasyStoreObject,
            components: Components,
        ) -> StoreResult<EasyStoreObject> {
            self.enter().await;
            let r = self.inner.update(obj, components).await;
            self.leave();
            r
        }

        async fn delete(
            &self,
            obj: EasyStoreObject,
            components: Components,
        ) -> StoreResult<EasyStoreObject> {
            self.enter().await;
            let r = self.inner.delete(obj, components).await;
            self.leave();
            r
        }

        async fn file_create(&self, ns: &str, id: &str, file: ObjectBlob) -> StoreResult<()> {
            self.enter().await;
            let r = self.inner.file_create(ns, id, file).await;
            self.leave();
            r
        }

        async fn file_update(&self, ns: &str, id: &str, file: ObjectBlob) -> StoreResult<()> {
            self.enter().await;
            let r = self.inner.file_update(ns, id, file).await;
            self.leave();
            r
        }

        async fn file_rename(
            &self,
            ns: &str,
            id: &str,
            old_name: &str,
            new_name: &str,
        ) -> StoreResult<()> {
            self.enter().await;
            let r = self.inner.file_rename(ns, id, old_name, new_name).await;
            self.leave();
            r
        }

        async fn file_delete(&self, ns: &str, id: &str, name: &str) -> StoreResult<()> {
            self.enter().await;
            let r = self.inner.file_delete(ns, id, name).await;
            self.leave();
            r
        }

        async fn check(&self) -> StoreResult<()> {
            self.inner.check().await
        }
    }

    fn gateway_over(store: Arc<dyn EasyStore>) -> ObjectGateway {
        ObjectGateway::new(store, Arc::new(LockRegistry::new()))
    }

    fn book(id: &str) -> EasyStoreObject {
        let mut fields = ObjectFields::new();
        fields.insert("title".to_string(), id.to_string());
        EasyStoreObject::proxy("lib", id, "")
            .with_fields(fields)
            .with_files(vec![ObjectBlob::new("a.txt", "text/plain", b"a".to_vec())])
            .with_metadata(ObjectBlob::new("md", "application/json", b"{}".to_vec()))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn same_key_backend_calls_never_overlap() {
        let counted = Arc::new(OverlapStore::new(Duration::from_millis(5)));
        let gateway = gateway_over(counted.clone());
        gateway.create_object("lib", book("a1")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..12 {
            let gateway = gateway.clone();
            handles.push(tokio::spawn(async move {
                let name = format!("f{i}.txt");
                gateway
                    .create_file("lib", "a1", ObjectBlob::new(name, "text/plain", vec![]))
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(counted.max_active.load(Ordering::SeqCst), 1);
        let obj = gateway.get_object("lib", "a1", Components::FILES).await.unwrap();
        assert_eq!(obj.files.unwrap().len(), 13, "no file write was lost");
    }

    /// A full-object rewrite whose every component is tagged with `tag`.
    fn revision(id: &str, tag: &str, vtag: &str) -> EasyStoreObject {
        let mut fields = ObjectFields::new();
        fields.insert("title".to_string(), tag.to_string());
        EasyStoreObject::proxy("lib", id, vtag)
            .with_fields(fields)
            .with_files(vec![ObjectBlob::new(
                format!("{tag}.txt"),
                "text/plain",
                tag.as_bytes().to_vec(),
            )])
            .with_metadata(ObjectBlob::new(
                format!("md-{tag}"),
                "application/json",
                b"{}".to_vec(),
            ))
    }

    fn assert_written_by(obj: &EasyStoreObject, tag: &str) {
        assert_eq!(obj.fields.as_ref().unwrap()["title"], tag);
        let files: Vec<_> = obj.files.as_ref().unwrap().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(files, [format!("{tag}.txt")]);
        assert_eq!(obj.metadata.as_ref().unwrap().name, format!("md-{tag}"));
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_update_still_completes_whole() {
        let store = Arc::new(MemoryStore::with_step_latency(Duration::from_millis(50)));
        let gateway = gateway_over(store);
        let created = gateway
            .create_object("lib", revision("a1", "old", ""))
            .await
            .unwrap();

        // the caller gives up after the first of several write steps
        let abandoned = tokio::time::timeout(
            Duration::from_millis(75),
            gateway.update_object("lib", "a1", revision("a1", "new", &created.vtag), Components::ALL),
        )
        .await;
        assert!(abandoned.is_err());

        let after = gateway.get_object("lib", "a1", Components::ALL).await.unwrap();
        assert_ne!(after.vtag, created.vtag);
        assert_written_by(&after, "new");
        assert!(!gateway.locks().is_locked(&resource_key("lib", "a1")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_have_one_winner_per_generation() {
        let gateway = gateway_over(Arc::new(MemoryStore::with_step_latency(
            Duration::from_millis(5),
        )));
        gateway
            .create_object("lib", revision("a1", "seed", ""))
            .await
            .unwrap();

        for generation in 0..3 {
            let current = gateway.get_object("lib", "a1", Components::BASE).await.unwrap();

            let mut handles = Vec::new();
            for writer in 0..8 {
                let gateway = gateway.clone();
                let tag = format!("g{generation}w{writer}");
                let obj = revision("a1", &tag, &current.vtag);
                handles.push(tokio::spawn(async move {
                    let result = gateway.update_object("lib", "a1", obj, Components::ALL).await;
                    (tag, result)
                }));
            }

            let mut winners = Vec::new();
            for h in handles {
                let (tag, result) = h.await.unwrap();
                match result {
                    Ok(updated) => winners.push((tag, updated.vtag)),
                    Err(err) => assert_eq!(err.outcome(), Outcome::StaleVtag),
                }
            }
            assert_eq!(winners.len(), 1, "generation {generation}");

            let (tag, vtag) = &winners[0];
            let stored = gateway.get_object("lib", "a1", Components::ALL).await.unwrap();
            assert_eq!(&stored.vtag, vtag);
            assert_written_by(&stored, tag);
        }
    }

    #[tokio::test]
    async fn slashed_names_address_distinct_objects() {
        let gateway = gateway_over(Arc::new(MemoryStore::new()));
        gateway
            .create_object("a/b", EasyStoreObject::proxy("a/b", "c", ""))
            .await
            .unwrap();

        let err = gateway
            .get_object("a", "b/c", Components::BASE)
            .await
            .unwrap_err();
        assert_eq!(err.outcome(), Outcome::NotFound);

        gateway
            .create_object("a", EasyStoreObject::proxy("a", "b/c", ""))
            .await
            .unwrap();
        let found = gateway.get_object("a/b", "c", Components::BASE).await.unwrap();
        assert_eq!((found.ns.as_str(), found.id.as_str()), ("a/b", "c"));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn validation_rejections_are_logged_as_warnings() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let _default = tracing::subscriber::set_default(subscriber);

        let gateway = gateway_over(Arc::new(MemoryStore::new()));
        gateway
            .create_object("lib", EasyStoreObject::proxy("other", "a1", ""))
            .await
            .unwrap_err();
        gateway
            .update_object("lib", "a1", EasyStoreObject::proxy("lib", "zz", "v1"), Components::ALL)
            .await
            .unwrap_err();

        let out = String::from_utf8_lossy(&logs.0.lock()).into_owned();
        assert!(out.contains("WARN"), "{out}");
        assert!(out.contains("inconsistent namespaces in request other/lib"), "{out}");
        assert!(out.contains("inconsistent id in request zz/a1"), "{out}");
        assert!(out.contains("bad-parameter"), "{out}");
    }

    #[tokio::test]
    async fn update_without_vtag_is_stale() {
        let gateway = gateway_over(Arc::new(MemoryStore::new()));
        gateway.create_object("lib", book("a1")).await.unwrap();

        let err = gateway
            .update_object("lib", "a1", book("a1"), Components::ALL)
            .await
            .unwrap_err();
        assert_eq!(err.outcome(), Outcome::StaleVtag);
        assert_eq!(gateway.locks().acquisitions(&resource_key("lib", "a1")), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn different_keys_overlap_freely() {
        let counted = Arc::new(OverlapStore::new(Duration::from_millis(50)));
        let gateway = gateway_over(counted.clone());

        let mut handles = Vec::new();
        for i in 0..4 {
            let gateway = gateway.clone();
            handles.push(tokio::spawn(async move {
                gateway.create_object("lib", book(&format!("b{i}"))).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert!(counted.max_active.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn namespace_mismatch_rejected_before_locking() {
        let gateway = gateway_over(Arc::new(MemoryStore::new()));
        let body = EasyStoreObject::proxy("other", "a1", "v1");

        let err = gateway
            .update_object("lib", "a1", body, Components::ALL)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Validation(ValidationError::InconsistentNamespace { .. })
        ));
        assert_eq!(err.outcome(), Outcome::BadParameter);
        assert_eq!(gateway.locks().acquisitions(&resource_key("lib", "a1")), 0);
        assert!(gateway.locks().is_empty());
    }

    #[tokio::test]
    async fn create_namespace_mismatch_rejected() {
        let gateway = gateway_over(Arc::new(MemoryStore::new()));
        let err = gateway
            .create_object("lib", EasyStoreObject::new("other"))
            .await
            .unwrap_err();
        assert_eq!(err.outcome(), Outcome::BadParameter);
        assert!(gateway.locks().is_empty());
    }

    #[tokio::test]
    async fn stale_update_conflicts_and_leaves_vtag_unchanged() {
        let gateway = gateway_over(Arc::new(MemoryStore::new()));
        let created = gateway.create_object("lib", book("a1")).await.unwrap();

        let first = gateway.get_object("lib", "a1", Components::BASE).await.unwrap();
        assert_eq!(first.vtag, created.vtag);

        // a successful update moves the vtag on
        let mut change = book("a1");
        change.vtag = first.vtag.clone();
        let updated = gateway
            .update_object("lib", "a1", change, Components::FIELDS)
            .await
            .unwrap();
        assert_ne!(updated.vtag, first.vtag);

        // reusing the old vtag is now stale
        let mut stale = book("a1");
        stale.vtag = first.vtag.clone();
        let err = gateway
            .update_object("lib", "a1", stale, Components::ALL)
            .await
            .unwrap_err();
        assert_eq!(err.outcome(), Outcome::StaleVtag);

        let again = gateway.get_object("lib", "a1", Components::BASE).await.unwrap();
        assert_eq!(again.vtag, updated.vtag);
    }

    #[tokio::test]
    async fn create_then_read_with_and_without_components() {
        let gateway = gateway_over(Arc::new(MemoryStore::new()));
        let created = gateway.create_object("lib", book("a1")).await.unwrap();
        assert_eq!(created.components(), Components::BASE);
        assert!(!created.vtag.is_empty());

        let all = gateway
            .get_object("lib", "a1", Components::decode("all"))
            .await
            .unwrap();
        assert!(all.fields.is_some());
        assert!(all.files.is_some());
        assert!(all.metadata.is_some());

        let base = gateway
            .get_object("lib", "a1", Components::decode(""))
            .await
            .unwrap();
        assert_eq!(base.components(), Components::BASE);
        assert_eq!(base.id, "a1");
    }

    #[tokio::test]
    async fn create_without_id_mints_one() {
        let gateway = gateway_over(Arc::new(MemoryStore::new()));
        let created = gateway
            .create_object("lib", EasyStoreObject::proxy("lib", "", ""))
            .await
            .unwrap();
        assert!(created.id.starts_with("oid:"));
        assert_eq!(gateway.locks().acquisitions(&resource_key("lib", &created.id)), 1);
    }

    #[tokio::test]
    async fn delete_with_unknown_vtag_is_stale() {
        let gateway = gateway_over(Arc::new(MemoryStore::new()));
        let created = gateway.create_object("lib", book("a1")).await.unwrap();

        let err = gateway
            .delete_object("lib", "a1", UNKNOWN_VTAG)
            .await
            .unwrap_err();
        assert_eq!(err.outcome(), Outcome::StaleVtag);

        gateway.delete_object("lib", "a1", &created.vtag).await.unwrap();
        let err = gateway
            .get_object("lib", "a1", Components::BASE)
            .await
            .unwrap_err();
        assert_eq!(err.outcome(), Outcome::NotFound);
    }

    #[tokio::test]
    async fn failures_release_the_lock() {
        let gateway = gateway_over(Arc::new(MemoryStore::new()));
        let key = resource_key("lib", "ghost");

        let err = gateway
            .get_object("lib", "ghost", Components::BASE)
            .await
            .unwrap_err();
        assert_eq!(err.outcome(), Outcome::NotFound);
        assert!(!gateway.locks().is_locked(&key));
        assert_eq!(gateway.locks().acquisitions(&key), 1);
    }

    #[tokio::test]
    async fn bulk_reads_and_search_take_no_locks() {
        let gateway = gateway_over(Arc::new(MemoryStore::new()));
        for id in ["a", "b", "c"] {
            gateway.create_object("lib", book(id)).await.unwrap();
        }
        let locks_before = gateway.locks().len();

        let ids = vec!["b".to_string(), "a".to_string()];
        let found = gateway.get_objects("lib", &ids, Components::ALL).await.unwrap();
        let got: Vec<_> = found.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(got, ["b", "a"]);

        let mut query = ObjectFields::new();
        query.insert("title".to_string(), "c".to_string());
        let found = gateway.search_objects("lib", &query, Components::BASE).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "c");

        assert_eq!(gateway.locks().len(), locks_before);
        assert_eq!(gateway.locks().acquisitions(&resource_key("lib", "a")), 1);
    }

    #[tokio::test]
    async fn lock_timeout_is_distinct_from_backend_failure() {
        let locks = Arc::new(LockRegistry::with_timeout(Some(Duration::from_millis(20))));
        let gateway = ObjectGateway::new(Arc::new(MemoryStore::new()), Arc::clone(&locks));
        gateway.create_object("lib", book("a1")).await.unwrap();

        let _held = locks.acquire(&resource_key("lib", "a1")).await.unwrap();
        let err = gateway
            .get_object("lib", "a1", Components::BASE)
            .await
            .unwrap_err();
        assert_eq!(err.outcome(), Outcome::LockTimeout);
        assert!(matches!(err, GatewayError::Lock(_)));
    }

    #[tokio::test]
    async fn file_operations_are_classified() {
        let gateway = gateway_over(Arc::new(MemoryStore::new()));
        gateway.create_object("lib", book("a1")).await.unwrap();

        let err = gateway.delete_file("lib", "a1", "missing").await.unwrap_err();
        assert_eq!(err.outcome(), Outcome::FileNotFound);

        let err = gateway
            .create_file("lib", "a1", ObjectBlob::new("a.txt", "text/plain", vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.outcome(), Outcome::AlreadyExists);

        gateway.rename_file("lib", "a1", "a.txt", "b.txt").await.unwrap();
        gateway
            .update_file("lib", "a1", ObjectBlob::new("b.txt", "text/plain", b"x".to_vec()))
            .await
            .unwrap();
        gateway.delete_file("lib", "a1", "b.txt").await.unwrap();
    }

    #[tokio::test]
    async fn unavailable_backend_is_reported_per_call() {
        let store = Arc::new(MemoryStore::new());
        let gateway = gateway_over(store.clone());
        store.set_offline(true);

        assert!(gateway.check().await.is_err());
        let err = gateway
            .get_object("lib", "a1", Components::BASE)
            .await
            .unwrap_err();
        assert_eq!(err.outcome(), Outcome::Internal);

        store.set_offline(false);
        assert!(gateway.check().await.is_ok());
    }
}
