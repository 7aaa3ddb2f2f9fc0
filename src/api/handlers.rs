//! Route handlers for the custom broker API.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::de::DeserializeOwned;
use tower::timeout::error::Elapsed;
use tower::BoxError;

use super::error::ApiError;
use super::state::AppState;
use crate::endpoints::Endpoint;
use crate::lifecycle::{
    Backup, BackupRequest, Restore, RestoreRequest, ServiceDefinitionRequest, ServiceUsage,
};

/// Decodes a JSON body. An empty body decodes as `T::default()`.
fn decode_json<T>(body: &Bytes) -> Result<T, ApiError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Maps errors of the request timeout layer.
pub(crate) fn timeout_error(err: BoxError, seconds: u64) -> ApiError {
    if err.is::<Elapsed>() {
        ApiError::Timeout { seconds }
    } else {
        ApiError::Internal(err.to_string())
    }
}

/// Fails with `InstanceNotFound` unless `instance_id` is in the graph.
async fn require_instance(state: &AppState, instance_id: &str) -> Result<(), ApiError> {
    state.resolver.instance(instance_id).await?;
    Ok(())
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> ApiError {
    ApiError::NotFound("route not found".to_string())
}

/// GET /service_instances/{instance_id}/endpoint
pub(crate) async fn handle_endpoints(
    State(state): State<Arc<AppState>>,
    Path(instance_id): Path<String>,
) -> Result<Json<Vec<Endpoint>>, ApiError> {
    tracing::info!(instance_id = %instance_id, "endpoints");
    let endpoints = state.endpoints.endpoints(&instance_id).await?;
    Ok(Json(endpoints))
}

/// GET /service_instances/{instance_id}/usage
pub(crate) async fn handle_service_usage(
    Path(instance_id): Path<String>,
) -> Result<Json<ServiceUsage>, ApiError> {
    tracing::info!(instance_id = %instance_id, "service-usage");
    Err(ApiError::NotImplemented {
        operation: "service-usage",
    })
}

/// POST /admin/service-definition
pub(crate) async fn handle_create_update_service_definition(
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    tracing::info!("create-update-service-definition");
    let _definition: ServiceDefinitionRequest = decode_json(&body)?;
    Err(ApiError::NotImplemented {
        operation: "create-update-service-definition",
    })
}

/// DELETE /admin/service-definition/{id}
pub(crate) async fn handle_delete_service_definition(
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    tracing::info!(id = %id, "delete-service-definition");
    Err(ApiError::NotImplemented {
        operation: "delete-service-definition",
    })
}

/// POST /service_instances/{instance_id}/backups
pub(crate) async fn handle_create_backup(
    State(state): State<Arc<AppState>>,
    Path(instance_id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<Backup>), ApiError> {
    tracing::info!(instance_id = %instance_id, "create-backup");
    require_instance(&state, &instance_id).await?;
    let request: BackupRequest = decode_json(&body)?;
    let backup = state.lifecycle.create_backup(&instance_id, request).await?;
    Ok((StatusCode::CREATED, Json(backup)))
}

/// GET /service_instances/{instance_id}/backups
pub(crate) async fn handle_list_backups(
    State(state): State<Arc<AppState>>,
    Path(instance_id): Path<String>,
) -> Result<Json<Vec<Backup>>, ApiError> {
    tracing::info!(instance_id = %instance_id, "list-backups");
    require_instance(&state, &instance_id).await?;
    let backups = state.lifecycle.list_backups(&instance_id).await?;
    Ok(Json(backups))
}

/// GET /service_instances/{instance_id}/backups/{backup_id}
pub(crate) async fn handle_backup(
    State(state): State<Arc<AppState>>,
    Path((instance_id, backup_id)): Path<(String, String)>,
) -> Result<Json<Backup>, ApiError> {
    tracing::info!(instance_id = %instance_id, backup_id = %backup_id, "backup");
    require_instance(&state, &instance_id).await?;
    let backup = state.lifecycle.backup(&instance_id, &backup_id).await?;
    Ok(Json(backup))
}

/// DELETE /service_instances/{instance_id}/backups/{backup_id}
pub(crate) async fn handle_delete_backup(
    State(state): State<Arc<AppState>>,
    Path((instance_id, backup_id)): Path<(String, String)>,
) -> Result<Json<String>, ApiError> {
    tracing::info!(instance_id = %instance_id, backup_id = %backup_id, "delete-backup");
    require_instance(&state, &instance_id).await?;
    let token = state.lifecycle.delete_backup(&instance_id, &backup_id).await?;
    Ok(Json(token))
}

/// POST /service_instances/{instance_id}/backups/{backup_id}/restores
pub(crate) async fn handle_restore_backup(
    State(state): State<Arc<AppState>>,
    Path((instance_id, backup_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<Restore>, ApiError> {
    tracing::info!(instance_id = %instance_id, backup_id = %backup_id, "restore-backup");
    require_instance(&state, &instance_id).await?;
    let request: RestoreRequest = decode_json(&body)?;
    if let Some(target) = &request.target_instance_id {
        require_instance(&state, target).await?;
    }
    let restore = state
        .lifecycle
        .restore_backup(&instance_id, &backup_id, request)
        .await?;
    Ok(Json(restore))
}

/// GET /service_instances/{instance_id}/backups/{backup_id}/restores/{restore_id}
pub(crate) async fn handle_restore_status(
    State(state): State<Arc<AppState>>,
    Path((instance_id, backup_id, restore_id)): Path<(String, String, String)>,
) -> Result<Json<Restore>, ApiError> {
    tracing::info!(
        instance_id = %instance_id,
        backup_id = %backup_id,
        restore_id = %restore_id,
        "restore-status"
    );
    require_instance(&state, &instance_id).await?;
    let restore = state
        .lifecycle
        .restore_status(&instance_id, &backup_id, &restore_id)
        .await?;
    Ok(Json(restore))
}

/// GET /service_instances/{instance_id}/api-docs
pub(crate) async fn handle_api_docs(
    Path(instance_id): Path<String>,
) -> Result<Json<String>, ApiError> {
    tracing::info!(instance_id = %instance_id, "api-docs");
    Err(ApiError::NotImplemented {
        operation: "api-docs",
    })
}
