//! In-memory [`EasyStore`] backed by [`DashMap`].
//!
//! Mirrors the behaviour of a real multi-backend engine closely enough to
//! exercise the gateway: updates touch fields, files, metadata and the vtag
//! as separate steps, yielding to the runtime in between, so two unguarded
//! updates to the same object can interleave. The vtag comparison is done
//! once, up front, exactly like the engine it stands in for.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use easystore_core::{
    new_object_id, Components, EasyStore, EasyStoreObject, ObjectBlob, ObjectCursor,
    ObjectFields, StoreError, StoreResult, VecCursor,
};
use tracing::debug;

use crate::service::locks::resource_key;

/// In-memory object store.
pub struct MemoryStore {
    objects: DashMap<String, EasyStoreObject>,
    step_latency: Duration,
    offline: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store whose write steps only yield.
    #[must_use]
    pub fn new() -> Self {
        Self::with_step_latency(Duration::ZERO)
    }

    /// Creates an empty store that sleeps `step_latency` between write steps.
    #[must_use]
    pub fn with_step_latency(step_latency: Duration) -> Self {
        Self {
            objects: DashMap::new(),
            step_latency,
            offline: AtomicBool::new(false),
        }
    }

    /// Simulates losing (or regaining) the physical backends.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    /// Number of stored objects across all namespaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn ensure_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::Relaxed) {
            Err(StoreError::Unavailable("backend is offline".to_string()))
        } else {
            Ok(())
        }
    }

    async fn pause(&self) {
        if self.step_latency.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.step_latency).await;
        }
    }

    /// Verifies the object exists and `vtag` is current.
    fn check_vtag(&self, key: &str, vtag: &str) -> StoreResult<()> {
        let current = self
            .objects
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        if current.vtag == vtag {
            Ok(())
        } else {
            Err(StoreError::StaleVtag(format!(
                "{key}: supplied {vtag}, current {}",
                current.vtag
            )))
        }
    }

    /// Applies one write step to a stored object.
    fn apply<F>(&self, key: &str, step: F) -> StoreResult<()>
    where
        F: FnOnce(&mut EasyStoreObject) -> StoreResult<()>,
    {
        let mut obj = self
            .objects
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        step(&mut *obj)
    }

    /// Final step of every mutation: mint a new vtag.
    fn restamp(&self, key: &str) -> StoreResult<EasyStoreObject> {
        let mut obj = self
            .objects
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        obj.vtag = new_vtag();
        obj.modified = Some(Utc::now());
        Ok(obj.clone())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn new_vtag() -> String {
    format!("vtag:{}", uuid::Uuid::new_v4().simple())
}

fn stamp_blob(mut blob: ObjectBlob) -> ObjectBlob {
    let now = Utc::now();
    blob.created.get_or_insert(now);
    blob.modified = Some(now);
    blob
}

fn matches_query(obj: &EasyStoreObject, query: &ObjectFields) -> bool {
    let Some(fields) = obj.fields.as_ref() else {
        return query.is_empty();
    };
    query
        .iter()
        .all(|(name, value)| fields.get(name).is_some_and(|v| v == value))
}

#[async_trait]
impl EasyStore for MemoryStore {
    async fn create(&self, obj: EasyStoreObject) -> StoreResult<EasyStoreObject> {
        self.ensure_online()?;
        if obj.ns.is_empty() {
            return Err(StoreError::BadParameter("namespace is empty".to_string()));
        }

        let now = Utc::now();
        let id = if obj.id.is_empty() { new_object_id() } else { obj.id };
        let stored = EasyStoreObject {
            vtag: new_vtag(),
            created: Some(now),
            modified: Some(now),
            fields: Some(obj.fields.unwrap_or_default()),
            files: Some(obj.files.unwrap_or_default().into_iter().map(stamp_blob).collect()),
            metadata: obj.metadata.map(stamp_blob),
            ..EasyStoreObject::proxy(obj.ns, id, "")
        };

        let key = resource_key(&stored.ns, &stored.id);
        match self.objects.entry(key) {
            Entry::Occupied(e) => Err(StoreError::AlreadyExists(e.key().clone())),
            Entry::Vacant(e) => {
                debug!(key = %e.key(), "object created");
                Ok(e.insert(stored).clone())
            }
        }
    }

    async fn get_by_key(
        &self,
        ns: &str,
        id: &str,
        components: Components,
    ) -> StoreResult<EasyStoreObject> {
        self.ensure_online()?;
        let key = resource_key(ns, id);
        self.objects
            .get(&key)
            .map(|obj| obj.clone().project(components))
            .ok_or(StoreError::NotFound(key))
    }

    async fn get_by_keys(
        &self,
        ns: &str,
        ids: &[String],
        components: Components,
    ) -> StoreResult<Box<dyn ObjectCursor>> {
        self.ensure_online()?;
        let found: Vec<_> = ids
            .iter()
            .filter_map(|id| self.objects.get(&resource_key(ns, id)))
            .map(|obj| obj.clone().project(components))
            .collect();
        Ok(Box::new(VecCursor::new(found)))
    }

    async fn get_by_fields(
        &self,
        ns: &str,
        query: &ObjectFields,
        components: Components,
    ) -> StoreResult<Box<dyn ObjectCursor>> {
        self.ensure_online()?;
        let mut found: Vec<_> = self
            .objects
            .iter()
            .filter(|entry| entry.ns == ns && matches_query(entry.value(), query))
            .map(|entry| entry.value().clone().project(components))
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(Box::new(VecCursor::new(found)))
    }

    async fn update(
        &self,
        obj: EasyStoreObject,
        components: Components,
    ) -> StoreResult<EasyStoreObject> {
        self.ensure_online()?;
        let key = resource_key(&obj.ns, &obj.id);
        self.check_vtag(&key, &obj.vtag)?;

        if components.contains(Components::FIELDS) {
            self.pause().await;
            let fields = obj.fields.unwrap_or_default();
            self.apply(&key, |stored| {
                stored.fields = Some(fields);
                Ok(())
            })?;
        }
        if components.contains(Components::FILES) {
            self.pause().await;
            let files: Vec<_> = obj.files.unwrap_or_default().into_iter().map(stamp_blob).collect();
            self.apply(&key, |stored| {
                stored.files = Some(files);
                Ok(())
            })?;
        }
        if components.contains(Components::METADATA) {
            self.pause().await;
            let metadata = obj.metadata.map(stamp_blob);
            self.apply(&key, |stored| {
                stored.metadata = metadata;
                Ok(())
            })?;
        }

        self.pause().await;
        let updated = self.restamp(&key)?;
        debug!(key = %key, vtag = %updated.vtag, "object updated");
        Ok(updated.project(components))
    }

    async fn delete(
        &self,
        obj: EasyStoreObject,
        components: Components,
    ) -> StoreResult<EasyStoreObject> {
        self.ensure_online()?;
        let key = resource_key(&obj.ns, &obj.id);
        self.check_vtag(&key, &obj.vtag)?;

        self.pause().await;
        let (_, removed) = self
            .objects
            .remove(&key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        debug!(key = %key, "object deleted");
        Ok(removed.project(components))
    }

    async fn file_create(&self, ns: &str, id: &str, file: ObjectBlob) -> StoreResult<()> {
        self.ensure_online()?;
        let key = resource_key(ns, id);
        self.apply(&key, |stored| {
            let files = stored.files.get_or_insert_with(Vec::new);
            if files.iter().any(|f| f.name == file.name) {
                return Err(StoreError::AlreadyExists(format!("{key}: file {}", file.name)));
            }
            files.push(stamp_blob(file));
            Ok(())
        })?;
        self.pause().await;
        self.restamp(&key).map(|_| ())
    }

    async fn file_update(&self, ns: &str, id: &str, file: ObjectBlob) -> StoreResult<()> {
        self.ensure_online()?;
        let key = resource_key(ns, id);
        self.apply(&key, |stored| {
            let slot = stored
                .files
                .get_or_insert_with(Vec::new)
                .iter_mut()
                .find(|f| f.name == file.name)
                .ok_or_else(|| StoreError::FileNotFound(format!("{key}: {}", file.name)))?;
            let created = slot.created;
            *slot = stamp_blob(ObjectBlob { created, ..file });
            Ok(())
        })?;
        self.pause().await;
        self.restamp(&key).map(|_| ())
    }

    async fn file_rename(
        &self,
        ns: &str,
        id: &str,
        old_name: &str,
        new_name: &str,
    ) -> StoreResult<()> {
        self.ensure_online()?;
        if new_name.is_empty() {
            return Err(StoreError::BadParameter("new file name is empty".to_string()));
        }
        let key = resource_key(ns, id);
        self.apply(&key, |stored| {
            let files = stored.files.get_or_insert_with(Vec::new);
            if files.iter().any(|f| f.name == new_name) {
                return Err(StoreError::AlreadyExists(format!("{key}: file {new_name}")));
            }
            let file = files
                .iter_mut()
                .find(|f| f.name == old_name)
                .ok_or_else(|| StoreError::FileNotFound(format!("{key}: {old_name}")))?;
            file.name = new_name.to_string();
            file.modified = Some(Utc::now());
            Ok(())
        })?;
        self.pause().await;
        self.restamp(&key).map(|_| ())
    }

    async fn file_delete(&self, ns: &str, id: &str, name: &str) -> StoreResult<()> {
        self.ensure_online()?;
        let key = resource_key(ns, id);
        self.apply(&key, |stored| {
            let files = stored.files.get_or_insert_with(Vec::new);
            let before = files.len();
            files.retain(|f| f.name != name);
            if files.len() == before {
                return Err(StoreError::FileNotFound(format!("{key}: {name}")));
            }
            Ok(())
        })?;
        self.pause().await;
        self.restamp(&key).map(|_| ())
    }

    async fn check(&self) -> StoreResult<()> {
        self.ensure_online()
    }
}
