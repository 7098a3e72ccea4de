//! Application configuration.
//!
//! Loaded from a TOML file with `ROOST__`-prefixed environment overrides.
//! Every section has defaults so a missing config file yields a working
//! single-host setup.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::auth::AuthConfig;

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub paths: PathsConfig,
    pub auth: AuthConfig,
    pub supervisor: SupervisorConfig,
    pub probe: ProbeConfig,
    pub files: FilesSurfaceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: off, error, warn, info, debug, trace.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Maximum file upload size in megabytes.
    pub max_upload_size_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_upload_size_mb: 100,
        }
    }
}

/// Filesystem layout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Base directory for tenant data (sandboxes, logs, runtime descriptors).
    pub data_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

/// Supervisor tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Delay between stop and start during a restart, in milliseconds.
    ///
    /// `stop` signals and returns without waiting for the old worker to
    /// exit, so the restart path inserts this grace period before spawning
    /// the replacement.
    pub restart_grace_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            restart_grace_ms: 1000,
        }
    }
}

/// Resource probe backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeBackend {
    /// Pick procfs on Linux, the null backend elsewhere.
    #[default]
    Auto,
    /// Read process accounting from /proc.
    Procfs,
    /// Liveness only; zeroed memory/CPU stats.
    Null,
}

/// Resource probe configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub backend: ProbeBackend,
    /// Interval between the two CPU-time samples, in milliseconds.
    ///
    /// A single sample cannot produce a meaningful instantaneous CPU
    /// fraction; the procfs backend reads CPU time twice this far apart.
    pub cpu_sample_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            backend: ProbeBackend::Auto,
            cpu_sample_ms: 200,
        }
    }
}

/// File surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesSurfaceConfig {
    /// Per-tenant storage quota in megabytes (advisory; reported with
    /// listings, enforced by an external collaborator).
    pub storage_limit_mb: u64,
    /// Maximum size for text view/edit operations in megabytes.
    pub max_text_file_mb: u64,
}

impl Default for FilesSurfaceConfig {
    fn default() -> Self {
        Self {
            storage_limit_mb: 512,
            max_text_file_mb: 10,
        }
    }
}

impl FilesSurfaceConfig {
    pub fn to_files_config(&self) -> roost_files::FilesConfig {
        roost_files::FilesConfig {
            storage_limit_bytes: self.storage_limit_mb * 1024 * 1024,
            max_text_file_bytes: self.max_text_file_mb * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.supervisor.restart_grace_ms, 1000);
        assert_eq!(config.probe.backend, ProbeBackend::Auto);
        assert!(config.probe.cpu_sample_ms > 0);
    }

    #[test]
    fn roundtrips_through_toml() {
        let config = AppConfig::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.server.host, config.server.host);
        assert_eq!(parsed.files.storage_limit_mb, config.files.storage_limit_mb);
    }
}
