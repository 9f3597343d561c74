//! Consistency checks between path-derived identifiers and request bodies.
//!
//! All checks are pure and run before any lock is taken or backend call is
//! made, so rejected requests never contend the lock registry.

use easystore_core::EasyStoreObject;

/// A request whose body disagrees with its path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("inconsistent namespaces in request {body}/{path}")]
    InconsistentNamespace { body: String, path: String },

    #[error("inconsistent id in request {body}/{path}")]
    InconsistentId { body: String, path: String },
}

impl ValidationError {
    /// Short caller-facing message.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::InconsistentNamespace { .. } => "Inconsistent namespaces",
            Self::InconsistentId { .. } => "Inconsistent id",
        }
    }

    /// Caller-facing details naming the conflicting values.
    #[must_use]
    pub fn details(&self) -> String {
        match self {
            Self::InconsistentNamespace { body, path } | Self::InconsistentId { body, path } => {
                format!("{body}/{path}")
            }
        }
    }
}

/// Checks the body namespace matches the path namespace.
///
/// # Errors
///
/// Returns [`ValidationError::InconsistentNamespace`] on mismatch.
pub fn check_namespace(path_ns: &str, body: &EasyStoreObject) -> Result<(), ValidationError> {
    if body.ns == path_ns {
        Ok(())
    } else {
        Err(ValidationError::InconsistentNamespace {
            body: body.ns.clone(),
            path: path_ns.to_string(),
        })
    }
}

/// Checks an update body against its path: namespace, then identifier.
/// The vtag is not inspected; whether it is current is the backend's call.
///
/// # Errors
///
/// Returns the first inconsistency found.
pub fn check_update(
    path_ns: &str,
    path_id: &str,
    body: &EasyStoreObject,
) -> Result<(), ValidationError> {
    check_namespace(path_ns, body)?;
    if body.id != path_id {
        return Err(ValidationError::InconsistentId {
            body: body.id.clone(),
            path: path_id.to_string(),
        });
    }
    Ok(())
}
