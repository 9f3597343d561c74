//! HTTP handler definitions.
//!
//! Defines `AppState` (the shared state carried through axum extractors)
//! and re-exports every handler for router assembly.

pub mod error;
pub mod files;
pub mod health;
pub mod objects;

pub use error::ApiError;
pub use files::{create_file_handler, delete_file_handler, rename_file_handler, update_file_handler};
pub use health::{favicon_handler, healthcheck_handler, version_handler};
pub use objects::{
    create_object_handler, delete_object_handler, get_object_handler, get_objects_handler,
    search_objects_handler, update_object_handler,
};

use std::sync::Arc;

use crate::network::ShutdownController;
use crate::service::ObjectGateway;

/// Shared application state passed to all handlers via `State` extraction.
///
/// Cloning is cheap: the gateway and controller are both `Arc`-backed.
#[derive(Clone)]
pub struct AppState {
    pub gateway: ObjectGateway,
    pub shutdown: Arc<ShutdownController>,
}
