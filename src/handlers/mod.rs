//! CRUD handlers shared by every resource.
//!
//! Each handler reads the resource descriptor from router state, performs a
//! single store call and maps the outcome to a response.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::ResourceDescriptor;
use crate::store::RecordStore;
use crate::utils::error::{Access, AppError};
use crate::utils::response::{created, empty_success, success};
use crate::validation::{validate_create, validate_update};

#[derive(Clone)]
pub struct ResourceState {
    pub store: Arc<dyn RecordStore>,
    pub resource: &'static ResourceDescriptor,
}

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    success(HealthPayload {
        status: "ok",
        service: "nss-api",
    })
}

fn parse_id(resource: &ResourceDescriptor, raw: &str, access: Access) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| {
        let message = format!(
            "Cast to Uuid failed for value \"{raw}\" at path \"_id\" for model \"{}\"",
            resource.singular
        );
        match access {
            Access::Read => AppError::InternalServerError(message),
            Access::Write => AppError::ValidationError(message),
        }
    })
}

fn read_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::ValidationError(rejection.body_text()))
}

pub async fn list_records(State(state): State<ResourceState>) -> Result<Response, AppError> {
    let ResourceState { store, resource } = state;
    let records = store
        .find_all(resource)
        .await
        .map_err(|err| AppError::from_store(resource, err, Access::Read))?;

    Ok(success(records))
}

pub async fn get_record(
    State(state): State<ResourceState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let ResourceState { store, resource } = state;
    let id = parse_id(resource, &id, Access::Read)?;

    let record = store
        .find_by_id(resource, id)
        .await
        .map_err(|err| AppError::from_store(resource, err, Access::Read))?
        .ok_or_else(|| AppError::NotFound(resource.not_found_message()))?;

    Ok(success(record))
}

pub async fn create_record(
    State(state): State<ResourceState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let ResourceState { store, resource } = state;
    let document = validate_create(resource, read_body(body)?)?;

    let record = store
        .insert(resource, document)
        .await
        .map_err(|err| AppError::from_store(resource, err, Access::Write))?;

    tracing::info!(collection = resource.collection, id = %record.id, "Record created");
    Ok(created(record))
}

pub async fn update_record(
    State(state): State<ResourceState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let ResourceState { store, resource } = state;
    let id = parse_id(resource, &id, Access::Write)?;
    let patch = validate_update(resource, read_body(body)?)?;

    let record = store
        .update_by_id(resource, id, patch)
        .await
        .map_err(|err| AppError::from_store(resource, err, Access::Write))?
        .ok_or_else(|| AppError::NotFound(resource.not_found_message()))?;

    tracing::debug!(collection = resource.collection, id = %record.id, "Record updated");
    Ok(success(record))
}

pub async fn delete_record(
    State(state): State<ResourceState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let ResourceState { store, resource } = state;
    let id = parse_id(resource, &id, Access::Read)?;

    store
        .delete_by_id(resource, id)
        .await
        .map_err(|err| AppError::from_store(resource, err, Access::Read))?
        .ok_or_else(|| AppError::NotFound(resource.not_found_message()))?;

    tracing::info!(collection = resource.collection, %id, "Record deleted");
    Ok(empty_success(resource.deleted_message()))
}
