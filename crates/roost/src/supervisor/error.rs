//! Supervisor errors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A worker record already exists for this tenant.
    #[error("bot is already running")]
    AlreadyRunning,

    /// No worker record exists for this tenant.
    #[error("bot is not running")]
    NotRunning,

    /// Tenant id unusable as a path component.
    #[error("invalid tenant id: {0}")]
    InvalidTenant(String),

    /// The worker process could not be spawned.
    #[error("failed to spawn worker: {0}")]
    Spawn(String),

    /// A provisioned runtime descriptor could not be parsed.
    #[error("invalid runtime descriptor: {0}")]
    Descriptor(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl IntoResponse for SupervisorError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            SupervisorError::AlreadyRunning => (StatusCode::BAD_REQUEST, "already_running"),
            SupervisorError::NotRunning => (StatusCode::BAD_REQUEST, "not_running"),
            SupervisorError::InvalidTenant(_) => (StatusCode::BAD_REQUEST, "invalid_tenant"),
            SupervisorError::Spawn(_) => (StatusCode::INTERNAL_SERVER_ERROR, "spawn_failed"),
            SupervisorError::Descriptor(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "invalid_runtime_descriptor")
            }
            SupervisorError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code,
        };

        (status, Json(body)).into_response()
    }
}
