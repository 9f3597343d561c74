use async_trait::async_trait;

use crate::components::Components;
use crate::cursor::ObjectCursor;
use crate::error::StoreResult;
use crate::object::{EasyStoreObject, ObjectBlob, ObjectFields};

/// Storage engine that durably persists objects, fields, metadata and files.
///
/// Writes are multi-step and not transactional: callers that need
/// per-object atomicity must serialize operations on the same object
/// themselves. The engine owns the authoritative vtag comparison and
/// reports [`StoreError::StaleVtag`](crate::StoreError::StaleVtag) when a
/// supplied vtag does not match current state.
///
/// Implementations must be safe for concurrent use by many callers.
#[async_trait]
pub trait EasyStore: Send + Sync {
    /// Persists a new object, assigning its vtag and timestamps.
    async fn create(&self, obj: EasyStoreObject) -> StoreResult<EasyStoreObject>;

    /// Loads one object with the requested components populated.
    async fn get_by_key(
        &self,
        ns: &str,
        id: &str,
        components: Components,
    ) -> StoreResult<EasyStoreObject>;

    /// Loads many objects by identifier.
    async fn get_by_keys(
        &self,
        ns: &str,
        ids: &[String],
        components: Components,
    ) -> StoreResult<Box<dyn ObjectCursor>>;

    /// Finds objects whose fields contain every name/value pair in `query`.
    async fn get_by_fields(
        &self,
        ns: &str,
        query: &ObjectFields,
        components: Components,
    ) -> StoreResult<Box<dyn ObjectCursor>>;

    /// Replaces the selected components of an existing object.
    async fn update(
        &self,
        obj: EasyStoreObject,
        components: Components,
    ) -> StoreResult<EasyStoreObject>;

    /// Removes an object. `obj` only needs identity and vtag.
    async fn delete(
        &self,
        obj: EasyStoreObject,
        components: Components,
    ) -> StoreResult<EasyStoreObject>;

    /// Attaches a new file to an object.
    async fn file_create(&self, ns: &str, id: &str, file: ObjectBlob) -> StoreResult<()>;

    /// Replaces an existing file with the same name.
    async fn file_update(&self, ns: &str, id: &str, file: ObjectBlob) -> StoreResult<()>;

    /// Renames an existing file.
    async fn file_rename(
        &self,
        ns: &str,
        id: &str,
        old_name: &str,
        new_name: &str,
    ) -> StoreResult<()>;

    /// Removes a file from an object.
    async fn file_delete(&self, ns: &str, id: &str, name: &str) -> StoreResult<()>;

    /// Verifies the engine and its physical backends are reachable.
    async fn check(&self) -> StoreResult<()>;
}
