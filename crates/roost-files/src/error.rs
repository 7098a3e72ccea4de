use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileSurfaceError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Path is outside the tenant sandbox")]
    PathRejected,

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File too large: {size} bytes exceeds limit of {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Directory operation not allowed on file")]
    NotADirectory,

    #[error("File operation not allowed on directory")]
    NotAFile,

    #[error("Upload failed: {0}")]
    Upload(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl IntoResponse for FileSurfaceError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            FileSurfaceError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            FileSurfaceError::PathRejected => (StatusCode::BAD_REQUEST, "PATH_REJECTED"),
            FileSurfaceError::InvalidPath(_) => (StatusCode::BAD_REQUEST, "INVALID_PATH"),
            FileSurfaceError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            FileSurfaceError::FileTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, "FILE_TOO_LARGE")
            }
            FileSurfaceError::NotADirectory => (StatusCode::BAD_REQUEST, "NOT_A_DIRECTORY"),
            FileSurfaceError::NotAFile => (StatusCode::BAD_REQUEST, "NOT_A_FILE"),
            FileSurfaceError::Upload(_) => (StatusCode::BAD_REQUEST, "UPLOAD_FAILED"),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code,
        };

        (status, Json(body)).into_response()
    }
}
