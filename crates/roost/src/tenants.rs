//! Per-tenant directory layout.
//!
//! Each tenant owns a control directory under the data dir:
//!
//! ```text
//! data_dir/tenants/<tenant_id>/
//!   sandbox/        worker cwd; the only tree file operations may touch
//!   worker.log      append-only combined stdout/stderr capture
//!   runtime.toml    optional runtime descriptor written at provisioning
//! ```
//!
//! The sandbox is the boundary the file surface and the worker are confined
//! to; the log and descriptor deliberately live beside it, out of the
//! tenant's reach.

use std::io;
use std::path::{Path, PathBuf};

/// Resolves tenant directories under the configured data dir.
#[derive(Debug, Clone)]
pub struct TenantDirs {
    data_dir: PathBuf,
}

/// A tenant id is used as a single path component; anything that could
/// change that is rejected before touching the filesystem.
pub fn validate_tenant_id(tenant_id: &str) -> bool {
    !tenant_id.is_empty()
        && tenant_id.len() <= 64
        && tenant_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl TenantDirs {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn checked(&self, tenant_id: &str) -> io::Result<PathBuf> {
        if !validate_tenant_id(tenant_id) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid tenant id: {tenant_id:?}"),
            ));
        }
        Ok(self.data_dir.join("tenants").join(tenant_id))
    }

    /// The tenant's control directory.
    pub fn tenant_dir(&self, tenant_id: &str) -> io::Result<PathBuf> {
        self.checked(tenant_id)
    }

    /// The tenant's sandbox root.
    pub fn sandbox_dir(&self, tenant_id: &str) -> io::Result<PathBuf> {
        Ok(self.checked(tenant_id)?.join("sandbox"))
    }

    /// The tenant's append-only worker log.
    pub fn log_path(&self, tenant_id: &str) -> io::Result<PathBuf> {
        Ok(self.checked(tenant_id)?.join("worker.log"))
    }

    /// The tenant's runtime descriptor, if provisioned.
    pub fn runtime_descriptor_path(&self, tenant_id: &str) -> io::Result<PathBuf> {
        Ok(self.checked(tenant_id)?.join("runtime.toml"))
    }

    /// Create the sandbox directory if missing and return it.
    pub fn ensure_sandbox(&self, tenant_id: &str) -> io::Result<PathBuf> {
        let sandbox = self.sandbox_dir(tenant_id)?;
        std::fs::create_dir_all(&sandbox)?;
        Ok(sandbox)
    }
}
