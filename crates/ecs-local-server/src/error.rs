use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use ecs_local_common::EndpointError;
use ecs_local_credentials::CredentialsError;
use tracing::error;

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Internal(String),
    Credentials(CredentialsError),
}

impl From<EndpointError> for AppError {
    fn from(err: EndpointError) -> Self {
        match err {
            EndpointError::NotFound(what) => AppError::NotFound(what),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<CredentialsError> for AppError {
    fn from(err: CredentialsError) -> Self {
        AppError::Credentials(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "NotFound",
                format!("Not found: {what}"),
            ),
            AppError::Internal(msg) => {
                error!("Request failed: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalError", msg)
            }
            AppError::Credentials(err) => {
                (StatusCode::INTERNAL_SERVER_ERROR, err.code(), err.to_string())
            }
        };

        let body = serde_json::json!({
            "code": code,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}
