//! Sandboxed file surface for tenant workspaces.
//!
//! This crate provides handlers and routes for managing files inside a
//! tenant's sandbox directory. It is designed to be embedded in the roost
//! control plane: the parent application resolves the caller's tenant and
//! injects the sandbox root as a request extension before these handlers run.
//!
//! Every operation resolves its path through [`guard`] first; a path that
//! escapes the sandbox is rejected before any filesystem access occurs.

pub mod error;
pub mod guard;
pub mod handlers;
pub mod routes;

use std::path::PathBuf;
use std::sync::Arc;

pub use error::FileSurfaceError;
pub use routes::file_routes;

/// The tenant sandbox root for the current request.
///
/// Inserted into request extensions by the parent application's
/// tenant-scoping middleware. All paths in this crate resolve relative to it.
#[derive(Debug, Clone)]
pub struct SandboxRoot(pub PathBuf);

/// Configuration for the file surface.
#[derive(Debug, Clone)]
pub struct FilesConfig {
    /// Per-tenant storage quota in bytes, reported alongside directory
    /// listings. Enforcement lives with the quota collaborator, not here.
    pub storage_limit_bytes: u64,
    /// Maximum size for text view/edit operations.
    pub max_text_file_bytes: u64,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            storage_limit_bytes: 512 * 1024 * 1024,
            max_text_file_bytes: 10 * 1024 * 1024,
        }
    }
}

/// State shared across file handlers.
#[derive(Clone)]
pub struct FilesState {
    pub config: Arc<FilesConfig>,
}

impl FilesState {
    pub fn new(config: FilesConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl Default for FilesState {
    fn default() -> Self {
        Self::new(FilesConfig::default())
    }
}
