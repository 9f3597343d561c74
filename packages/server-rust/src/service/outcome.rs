//! Classification of backend failures into caller-visible outcomes.

use easystore_core::StoreError;
use http::StatusCode;
use tracing::{error, warn};

/// Caller-visible failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    BadParameter,
    NotFound,
    FileNotFound,
    Deserialize,
    StaleVtag,
    AlreadyExists,
    LockTimeout,
    Internal,
}

// Order matters: earlier entries win when a message matches several.
const TEXT_VOCABULARY: &[(&str, Outcome)] = &[
    ("bad parameter", Outcome::BadParameter),
    ("file not found", Outcome::FileNotFound),
    ("not found", Outcome::NotFound),
    ("stale", Outcome::StaleVtag),
    ("already exists", Outcome::AlreadyExists),
    ("deserialize", Outcome::Deserialize),
];

impl Outcome {
    /// Classifies a backend failure.
    ///
    /// Structured variants map directly. Free-text failures are matched by
    /// case-insensitive substring against a fixed vocabulary, checking
    /// bad-parameter, then not-found, then conflicts, then deserialize, and
    /// falling through to [`Outcome::Internal`].
    #[must_use]
    pub fn classify(err: &StoreError) -> Self {
        match err {
            StoreError::BadParameter(_) => Self::BadParameter,
            StoreError::NotFound(_) => Self::NotFound,
            StoreError::FileNotFound(_) => Self::FileNotFound,
            StoreError::Deserialize(_) => Self::Deserialize,
            StoreError::StaleVtag(_) => Self::StaleVtag,
            StoreError::AlreadyExists(_) => Self::AlreadyExists,
            StoreError::Unavailable(_) => Self::Internal,
            StoreError::Other(text) => Self::classify_text(text),
        }
    }

    fn classify_text(text: &str) -> Self {
        let text = text.to_ascii_lowercase();
        TEXT_VOCABULARY
            .iter()
            .find(|(needle, _)| text.contains(needle))
            .map_or(Self::Internal, |(_, outcome)| *outcome)
    }

    /// HTTP status reported for this outcome.
    #[must_use]
    pub fn status(self) -> StatusCode {
        match self {
            Self::BadParameter | Self::Deserialize => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::FileNotFound => StatusCode::NOT_FOUND,
            Self::StaleVtag | Self::AlreadyExists => StatusCode::CONFLICT,
            Self::LockTimeout => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Expected, recoverable outcomes are logged as warnings.
    #[must_use]
    pub fn is_expected(self) -> bool {
        matches!(
            self,
            Self::BadParameter
                | Self::NotFound
                | Self::FileNotFound
                | Self::StaleVtag
                | Self::AlreadyExists
        )
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BadParameter => "bad-parameter",
            Self::NotFound => "not-found",
            Self::FileNotFound => "file-not-found",
            Self::Deserialize => "deserialize",
            Self::StaleVtag => "stale-vtag",
            Self::AlreadyExists => "already-exists",
            Self::LockTimeout => "lock-timeout",
            Self::Internal => "internal",
        }
    }
}

/// Classifies a backend failure and logs it with matching severity.
#[must_use]
pub fn report(operation: &'static str, key: &str, err: &StoreError) -> Outcome {
    let outcome = Outcome::classify(err);
    if outcome.is_expected() {
        warn!(operation, key, outcome = outcome.as_str(), "{err}");
    } else {
        error!(operation, key, outcome = outcome.as_str(), "{err}");
    }
    outcome
}
