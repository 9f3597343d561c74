//! Mapping of operation failures onto HTTP responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use crate::service::{GatewayError, Outcome};

/// Failure body for every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub details: String,
}

/// A request that failed before or during its operation.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The body could not be deserialized into the expected shape.
    #[error("request is malformed or unsupported: {0}")]
    Malformed(String),

    /// The body exceeded the configured size limit.
    #[error("request body too large: {0}")]
    TooLarge(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let details = rejection.body_text();
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            warn!("rejecting oversized request: {details}");
            return Self::TooLarge(details);
        }
        error!(outcome = Outcome::Deserialize.as_str(), "unable to parse request: {details}");
        Self::Malformed(details)
    }
}

impl ApiError {
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Malformed(_) => Outcome::Deserialize,
            Self::TooLarge(_) => Outcome::BadParameter,
            Self::Gateway(err) => err.outcome(),
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => self.outcome().status(),
        }
    }

    fn body(&self) -> ErrorBody {
        let (message, details) = match self {
            Self::Malformed(details) => ("Request is malformed or unsupported", details.clone()),
            Self::TooLarge(details) => ("Request body too large", details.clone()),
            Self::Gateway(GatewayError::Validation(err)) => (err.message(), err.details()),
            Self::Gateway(GatewayError::Lock(err)) => ("Resource busy", err.to_string()),
            Self::Gateway(GatewayError::Store { outcome, source }) => {
                (outcome_message(*outcome), source.to_string())
            }
            Self::Gateway(err @ GatewayError::Aborted(_)) => ("Internal error", err.to_string()),
        };
        ErrorBody {
            message: message.to_string(),
            details,
        }
    }
}

fn outcome_message(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::BadParameter => "Bad parameter",
        Outcome::NotFound => "Object not found",
        Outcome::FileNotFound => "File not found",
        Outcome::Deserialize => "Unable to deserialize object",
        Outcome::StaleVtag => "Stale object",
        Outcome::AlreadyExists => "Object already exists",
        Outcome::LockTimeout => "Resource busy",
        Outcome::Internal => "Internal error",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
