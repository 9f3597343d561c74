//! `EasyStore` core: the object model, component masks, result cursors and
//! the storage engine contract.

pub mod components;
pub mod cursor;
pub mod error;
pub mod object;
pub mod traits;

pub use components::Components;
pub use cursor::{ObjectCursor, VecCursor};
pub use error::{StoreError, StoreResult};
pub use object::{new_object_id, EasyStoreObject, ObjectBlob, ObjectFields};
pub use traits::EasyStore;
