//! Application state shared across handlers.

use std::sync::Arc;

use roost_files::FilesState;

use crate::auth::AuthState;
use crate::supervisor::Supervisor;

/// Shared state for the API layer.
#[derive(Clone)]
pub struct AppState {
    pub supervisor: Arc<Supervisor>,
    pub auth: AuthState,
    pub files: FilesState,
}

impl AppState {
    pub fn new(supervisor: Arc<Supervisor>, auth: AuthState, files: FilesState) -> Self {
        Self {
            supervisor,
            auth,
            files,
        }
    }
}
