use std::sync::Arc;
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use tower::timeout::TimeoutLayer;
use tower::{BoxError, ServiceBuilder};

use super::handlers::{
    handle_api_docs, handle_backup, handle_create_backup, handle_create_update_service_definition,
    handle_delete_backup, handle_delete_service_definition, handle_endpoints, handle_health,
    handle_list_backups, handle_not_found, handle_restore_backup, handle_restore_status,
    handle_service_usage, timeout_error,
};
use super::middleware::{basic_auth, limit_header_size, request_context};
use super::state::AppState;

/// Builds the application router.
///
/// Custom routes are nested under `prefix` (empty for none) and require
/// basic auth when credentials are configured. `/health` stays outside the
/// prefix and unauthenticated. Every request is bounded by the configured
/// timeout and header size limit.
pub fn build_router(state: Arc<AppState>, prefix: &str) -> Router {
    let server = state.config.get().server;
    let timeout_seconds = server.request_timeout_seconds;

    let custom = Router::new()
        .route(
            "/service_instances/{instance_id}/endpoint",
            get(handle_endpoints),
        )
        .route(
            "/service_instances/{instance_id}/usage",
            get(handle_service_usage),
        )
        .route(
            "/admin/service-definition",
            post(handle_create_update_service_definition),
        )
        .route(
            "/admin/service-definition/{id}",
            axum::routing::delete(handle_delete_service_definition),
        )
        .route(
            "/service_instances/{instance_id}/backups",
            post(handle_create_backup).get(handle_list_backups),
        )
        .route(
            "/service_instances/{instance_id}/backups/{backup_id}",
            get(handle_backup).delete(handle_delete_backup),
        )
        .route(
            "/service_instances/{instance_id}/backups/{backup_id}/restores",
            post(handle_restore_backup),
        )
        .route(
            "/service_instances/{instance_id}/backups/{backup_id}/restores/{restore_id}",
            get(handle_restore_status),
        )
        .route(
            "/service_instances/{instance_id}/api-docs",
            get(handle_api_docs),
        )
        .route_layer(from_fn_with_state(state.clone(), basic_auth))
        .with_state(state);

    let app = if prefix.is_empty() {
        custom
    } else {
        Router::new().nest(prefix, custom)
    };

    app.route("/health", get(handle_health))
        .fallback(handle_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(request_context))
                .layer(from_fn_with_state(server.max_header_bytes, limit_header_size))
                .layer(HandleErrorLayer::new(move |err: BoxError| async move {
                    timeout_error(err, timeout_seconds)
                }))
                .layer(TimeoutLayer::new(Duration::from_secs(timeout_seconds))),
        )
}
