//! HTTP surface of the local container endpoints: task metadata (v2, v3),
//! container stats and credentials.

use axum::{routing::get, Router};
use ecs_local_credentials::CredentialsService;
use ecs_local_metadata::MetadataService;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod handlers;

pub use error::AppError;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub metadata: Arc<MetadataService>,
    pub credentials: Arc<CredentialsService>,
}

impl AppState {
    pub fn new(metadata: MetadataService, credentials: CredentialsService) -> Self {
        Self {
            metadata: Arc::new(metadata),
            credentials: Arc::new(credentials),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        // Task metadata v2
        .route("/v2/metadata", get(handlers::v2_task))
        .route("/v2/metadataWithTags", get(handlers::v2_task_with_tags))
        .route("/v2/metadata/:id", get(handlers::v2_container))
        .route("/v2/stats", get(handlers::v2_task_stats))
        .route("/v2/stats/:id", get(handlers::v2_container_stats))

        // Task metadata v3, container scoped
        .route("/v3/containers/:identifier", get(handlers::v3_container))
        .route("/v3/containers/:identifier/task", get(handlers::v3_task))
        .route(
            "/v3/containers/:identifier/taskWithTags",
            get(handlers::v3_task_with_tags),
        )
        .route(
            "/v3/containers/:identifier/stats",
            get(handlers::v3_container_stats),
        )
        .route(
            "/v3/containers/:identifier/task/stats",
            get(handlers::v3_task_stats),
        )

        // Task metadata v3, caller resolved from the source address
        .route("/v3", get(handlers::v3_caller))
        .route("/v3/task", get(handlers::v3_task))
        .route("/v3/taskWithTags", get(handlers::v3_task_with_tags))

        // Credentials
        .route("/creds", get(handlers::default_credentials))
        .route("/role/*role", get(handlers::role_credentials))

        .route("/health", get(handlers::health))

        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
