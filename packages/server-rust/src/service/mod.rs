//! Per-object serialized access to a backend store.
//!
//! The pipeline every operation runs through:
//!
//! 1. **Validation** (`validate`): body/path consistency, before any lock
//! 2. **Locking** (`locks`): one exclusive lock per `ns/id` resource key
//! 3. **Execution** (`gateway`): one backend call while the lock is held
//! 4. **Draining** (`drain`): bulk cursors flattened to ordered lists
//! 5. **Classification** (`outcome`): backend failures mapped and logged

pub mod config;
pub mod drain;
pub mod gateway;
pub mod locks;
pub mod outcome;
pub mod validate;

pub use config::ServiceConfig;
pub use drain::drain;
pub use gateway::{GatewayError, GatewayResult, ObjectGateway, UNKNOWN_VTAG};
pub use locks::{resource_key, LockError, LockRegistry, ResourceGuard};
pub use outcome::{report, Outcome};
pub use validate::{check_namespace, check_update, ValidationError};
