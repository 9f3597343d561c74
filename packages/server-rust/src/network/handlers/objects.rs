//! Object CRUD, bulk read and search endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use easystore_core::{Components, EasyStoreObject, ObjectFields};
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState};
use crate::service::UNKNOWN_VTAG;

/// Single-object reads populate nothing beyond the base identity unless asked.
const READ_ONE_DEFAULT_HINT: &str = "none";
/// Bulk reads, searches and updates cover every component unless narrowed.
const DEFAULT_HINT: &str = "all";

#[derive(Debug, Default, Deserialize)]
pub struct AttribsQuery {
    pub attribs: Option<String>,
}

impl AttribsQuery {
    fn components(&self, default_hint: &str) -> Components {
        Components::decode(self.attribs.as_deref().unwrap_or(default_hint))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct VtagQuery {
    pub vtag: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GetObjectsRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub results: Vec<EasyStoreObject>,
}

/// `GET /{ns}/{id}`
pub async fn get_object_handler(
    State(state): State<AppState>,
    Path((ns, id)): Path<(String, String)>,
    Query(query): Query<AttribsQuery>,
) -> Result<Json<EasyStoreObject>, ApiError> {
    let components = query.components(READ_ONE_DEFAULT_HINT);
    let obj = state.gateway.get_object(&ns, &id, components).await?;
    Ok(Json(obj))
}

/// `PUT /{ns}` with `{"ids": [...]}`
pub async fn get_objects_handler(
    State(state): State<AppState>,
    Path(ns): Path<String>,
    Query(query): Query<AttribsQuery>,
    body: Result<Json<GetObjectsRequest>, JsonRejection>,
) -> Result<Json<ResultsResponse>, ApiError> {
    let Json(request) = body?;
    let results = state
        .gateway
        .get_objects(&ns, &request.ids, query.components(DEFAULT_HINT))
        .await?;
    Ok(Json(ResultsResponse { results }))
}

/// `PUT /{ns}/search` with a field map
pub async fn search_objects_handler(
    State(state): State<AppState>,
    Path(ns): Path<String>,
    Query(query): Query<AttribsQuery>,
    body: Result<Json<ObjectFields>, JsonRejection>,
) -> Result<Json<ResultsResponse>, ApiError> {
    let Json(fields) = body?;
    let results = state
        .gateway
        .search_objects(&ns, &fields, query.components(DEFAULT_HINT))
        .await?;
    Ok(Json(ResultsResponse { results }))
}

/// `POST /{ns}`
pub async fn create_object_handler(
    State(state): State<AppState>,
    Path(ns): Path<String>,
    body: Result<Json<EasyStoreObject>, JsonRejection>,
) -> Result<(StatusCode, Json<EasyStoreObject>), ApiError> {
    let Json(obj) = body?;
    let created = state.gateway.create_object(&ns, obj).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /{ns}/{id}`
pub async fn update_object_handler(
    State(state): State<AppState>,
    Path((ns, id)): Path<(String, String)>,
    Query(query): Query<AttribsQuery>,
    body: Result<Json<EasyStoreObject>, JsonRejection>,
) -> Result<Json<EasyStoreObject>, ApiError> {
    let Json(obj) = body?;
    let updated = state
        .gateway
        .update_object(&ns, &id, obj, query.components(DEFAULT_HINT))
        .await?;
    Ok(Json(updated))
}

/// `DELETE /{ns}/{id}?vtag=`
pub async fn delete_object_handler(
    State(state): State<AppState>,
    Path((ns, id)): Path<(String, String)>,
    Query(query): Query<VtagQuery>,
) -> Result<StatusCode, ApiError> {
    let vtag = query.vtag.as_deref().unwrap_or(UNKNOWN_VTAG);
    state.gateway.delete_object(&ns, &id, vtag).await?;
    Ok(StatusCode::NO_CONTENT)
}
