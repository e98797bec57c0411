//! HTTP handlers for the metadata, stats and credentials routes.

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use chrono::Utc;
use ecs_local_credentials::CredentialsResponse;
use ecs_local_metadata::{v2, v3};
use serde_json::Value;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use tracing::{instrument, warn};

use crate::error::AppError;
use crate::AppState;

// ============================================================================
// Task metadata v2
// ============================================================================

#[instrument(skip(state))]
pub async fn v2_task(State(state): State<AppState>) -> Result<Json<v2::TaskResponse>, AppError> {
    let task = state.metadata.task_metadata().await?;
    Ok(Json(v2::TaskResponse::without_tags(&task)))
}

#[instrument(skip(state))]
pub async fn v2_task_with_tags(
    State(state): State<AppState>,
) -> Result<Json<v2::TaskResponse>, AppError> {
    let task = state.metadata.task_metadata().await?;
    Ok(Json(v2::TaskResponse::from(&task)))
}

#[instrument(skip(state))]
pub async fn v2_container(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<v2::ContainerResponse>, AppError> {
    let container = state.metadata.container_metadata(&id).await?;
    Ok(Json(v2::ContainerResponse::from(&container)))
}

#[instrument(skip(state))]
pub async fn v2_task_stats(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, Value>>, AppError> {
    Ok(Json(state.metadata.task_stats().await?))
}

#[instrument(skip(state))]
pub async fn v2_container_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(state.metadata.container_stats(&id).await?))
}

// ============================================================================
// Task metadata v3
// ============================================================================

/// Every local container belongs to the same task, so the identifier in the
/// path only scopes the URL and does not filter the document.
#[instrument(skip(state))]
pub async fn v3_task(
    State(state): State<AppState>,
    _identifier: Option<Path<String>>,
) -> Result<Json<v3::TaskResponse>, AppError> {
    let task = state.metadata.task_metadata().await?;
    Ok(Json(v3::TaskResponse::without_tags(&task)))
}

#[instrument(skip(state))]
pub async fn v3_task_with_tags(
    State(state): State<AppState>,
    _identifier: Option<Path<String>>,
) -> Result<Json<v3::TaskResponse>, AppError> {
    let task = state.metadata.task_metadata().await?;
    Ok(Json(v3::TaskResponse::with_tags(&task)))
}

#[instrument(skip(state))]
pub async fn v3_container(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<Json<v3::ContainerResponse>, AppError> {
    let container = state.metadata.container_metadata(&identifier).await?;
    Ok(Json(v3::ContainerResponse::from(&container)))
}

/// Bare `/v3`: the caller is the container that owns the source address.
#[instrument(skip(state))]
pub async fn v3_caller(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Result<Json<v3::ContainerResponse>, AppError> {
    let container = state.metadata.container_by_address(peer.ip()).await?;
    Ok(Json(v3::ContainerResponse::from(&container)))
}

#[instrument(skip(state))]
pub async fn v3_container_stats(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(state.metadata.container_stats(&identifier).await?))
}

#[instrument(skip(state))]
pub async fn v3_task_stats(
    State(state): State<AppState>,
    Path(_identifier): Path<String>,
) -> Result<Json<BTreeMap<String, Value>>, AppError> {
    Ok(Json(state.metadata.task_stats().await?))
}

// ============================================================================
// Credentials
// ============================================================================

#[instrument(skip(state, headers))]
pub async fn default_credentials(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CredentialsResponse>, AppError> {
    let request = state.credentials.resolve_request(None, &headers);
    Ok(Json(state.credentials.get_credentials(&request).await?))
}

#[instrument(skip(state, headers))]
pub async fn role_credentials(
    State(state): State<AppState>,
    Path(role): Path<String>,
    headers: HeaderMap,
) -> Result<Json<CredentialsResponse>, AppError> {
    let request = state.credentials.resolve_request(Some(&role), &headers);
    Ok(Json(state.credentials.get_credentials(&request).await?))
}

// ============================================================================
// Health
// ============================================================================

/// 200 while the container runtime answers, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let (status, health, runtime) = match state.metadata.check_runtime().await {
        Ok(()) => (StatusCode::OK, "healthy", "reachable"),
        Err(e) => {
            warn!("Health check could not reach the runtime: {e}");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", "unreachable")
        }
    };

    let body = serde_json::json!({
        "status": health,
        "runtime": runtime,
        "timestamp": Utc::now().to_rfc3339(),
    });

    (status, Json(body))
}
