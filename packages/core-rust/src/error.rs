use thiserror::Error;

/// Failures reported by an [`EasyStore`](crate::EasyStore) backend.
///
/// Backends that only have free-text failures (e.g. relayed from a remote
/// engine) use [`StoreError::Other`]; callers classify those by message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("bad parameter: {0}")]
    BadParameter(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("deserialize failure: {0}")]
    Deserialize(String),

    #[error("stale vtag: {0}")]
    StaleVtag(String),

    #[error("object already exists: {0}")]
    AlreadyExists(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Other(String),
}

/// Result alias for backend calls.
pub type StoreResult<T> = Result<T, StoreError>;
