use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::FilesState;
use crate::handlers;

/// Create the file surface routes.
///
/// The parent router must layer a middleware that injects [`crate::SandboxRoot`]
/// for the current tenant before these handlers run.
pub fn file_routes() -> Router<FilesState> {
    Router::new()
        .route("/list", get(handlers::list_files))
        .route("/view", get(handlers::view_file))
        .route("/edit", put(handlers::edit_file))
        .route("/upload", post(handlers::upload_file))
        .route("/delete", delete(handlers::delete_file))
        .route("/rename", post(handlers::rename_file))
        .route("/mkdir", put(handlers::create_dir))
        .route("/download", get(handlers::download))
}
