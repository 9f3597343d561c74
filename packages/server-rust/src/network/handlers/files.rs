//! File sub-resource endpoints. Every mutation answers 204 with no body.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use easystore_core::ObjectBlob;
use serde::Deserialize;

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

/// `POST /{ns}/{id}/file`
pub async fn create_file_handler(
    State(state): State<AppState>,
    Path((ns, id)): Path<(String, String)>,
    body: Result<Json<ObjectBlob>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(file) = body?;
    state.gateway.create_file(&ns, &id, file).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /{ns}/{id}/file`
pub async fn update_file_handler(
    State(state): State<AppState>,
    Path((ns, id)): Path<(String, String)>,
    body: Result<Json<ObjectBlob>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(file) = body?;
    state.gateway.update_file(&ns, &id, file).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /{ns}/{id}/file/{name}/rename` with `{"name": new}`
pub async fn rename_file_handler(
    State(state): State<AppState>,
    Path((ns, id, name)): Path<(String, String, String)>,
    body: Result<Json<RenameRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(rename) = body?;
    state
        .gateway
        .rename_file(&ns, &id, &name, &rename.name)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /{ns}/{id}/file/{name}`
pub async fn delete_file_handler(
    State(state): State<AppState>,
    Path((ns, id, name)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    state.gateway.delete_file(&ns, &id, &name).await?;
    Ok(StatusCode::NO_CONTENT)
}
