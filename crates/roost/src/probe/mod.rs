//! Resource probing for tenant workers.
//!
//! Translates an OS process id into liveness plus memory/CPU usage. The
//! supervisor treats [`ProbeResult::Unreadable`] as the one and only death
//! signal; a missing process is routine, never an error.

mod null;
mod procfs;

use std::sync::Arc;

use async_trait::async_trait;

pub use null::NullProbe;
pub use procfs::ProcfsProbe;

use crate::config::{ProbeBackend, ProbeConfig};

/// Outcome of probing a process id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbeResult {
    /// The process exists and its accounting was readable.
    Alive {
        memory_bytes: u64,
        cpu_percent: f64,
    },
    /// The process's accounting could not be read. Interpreted as death.
    Unreadable,
}

/// A pluggable liveness/usage backend.
#[async_trait]
pub trait ResourceProbe: Send + Sync {
    async fn sample(&self, pid: u32) -> ProbeResult;
}

/// Select the probe backend once at startup.
pub fn select_backend(config: &ProbeConfig) -> Arc<dyn ResourceProbe> {
    match config.backend {
        ProbeBackend::Procfs => Arc::new(ProcfsProbe::new(config)),
        ProbeBackend::Null => Arc::new(NullProbe),
        ProbeBackend::Auto => {
            #[cfg(target_os = "linux")]
            {
                Arc::new(ProcfsProbe::new(config))
            }
            #[cfg(not(target_os = "linux"))]
            {
                Arc::new(NullProbe)
            }
        }
    }
}
