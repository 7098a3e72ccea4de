//! Worker command resolution.
//!
//! The interpreter family and entry point are fixed at start time. A tenant
//! provisioned with an explicit `runtime.toml` descriptor gets exactly what
//! it declares; without one, the supervisor falls back to sniffing the
//! sandbox for the Python marker file and defaults to Node otherwise.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use super::error::SupervisorError;
use crate::tenants::TenantDirs;

/// Marker file whose presence selects the Python runtime when no descriptor
/// was provisioned.
const PYTHON_MARKER: &str = "bot.py";

/// Interpreter family for a tenant worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    Node,
    Python,
}

impl RuntimeKind {
    fn default_program(self) -> &'static str {
        match self {
            RuntimeKind::Node => "node",
            RuntimeKind::Python => "python3",
        }
    }

    fn default_entry(self) -> &'static str {
        match self {
            RuntimeKind::Node => "index.js",
            RuntimeKind::Python => PYTHON_MARKER,
        }
    }
}

/// Per-tenant runtime descriptor, written at provisioning time.
///
/// `program` and `entry` default from the runtime kind; `program` exists for
/// odd interpreter locations or wrapper binaries.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeDescriptor {
    pub runtime: RuntimeKind,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub entry: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

/// The resolved interpreter and entry point a worker is spawned with.
#[derive(Debug, Clone)]
pub struct CommandDescriptor {
    pub runtime: RuntimeKind,
    pub program: String,
    pub entry: String,
    pub args: Vec<String>,
}

impl CommandDescriptor {
    fn from_kind(kind: RuntimeKind) -> Self {
        Self {
            runtime: kind,
            program: kind.default_program().to_string(),
            entry: kind.default_entry().to_string(),
            args: Vec::new(),
        }
    }

    fn from_descriptor(descriptor: RuntimeDescriptor) -> Self {
        let kind = descriptor.runtime;
        Self {
            runtime: kind,
            program: descriptor
                .program
                .unwrap_or_else(|| kind.default_program().to_string()),
            entry: descriptor
                .entry
                .unwrap_or_else(|| kind.default_entry().to_string()),
            args: descriptor.args,
        }
    }
}

/// Resolve the command a tenant's worker will run.
pub async fn resolve_command(
    dirs: &TenantDirs,
    tenant_id: &str,
) -> Result<CommandDescriptor, SupervisorError> {
    let descriptor_path = dirs.runtime_descriptor_path(tenant_id)?;
    if descriptor_path.exists() {
        let raw = fs::read_to_string(&descriptor_path).await?;
        let descriptor: RuntimeDescriptor = toml::from_str(&raw).map_err(|e| {
            SupervisorError::Descriptor(format!("{}: {e}", descriptor_path.display()))
        })?;
        return Ok(CommandDescriptor::from_descriptor(descriptor));
    }

    let sandbox = dirs.sandbox_dir(tenant_id)?;
    Ok(CommandDescriptor::from_kind(sniff_runtime(&sandbox)))
}

fn sniff_runtime(sandbox: &Path) -> RuntimeKind {
    if sandbox.join(PYTHON_MARKER).exists() {
        RuntimeKind::Python
    } else {
        RuntimeKind::Node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dirs() -> (TempDir, TenantDirs) {
        let tmp = TempDir::new().unwrap();
        let dirs = TenantDirs::new(tmp.path());
        (tmp, dirs)
    }

    #[tokio::test]
    async fn python_marker_selects_python() {
        let (_tmp, dirs) = dirs();
        let sandbox = dirs.ensure_sandbox("t1").unwrap();
        std::fs::write(sandbox.join("bot.py"), b"print('hi')").unwrap();

        let command = resolve_command(&dirs, "t1").await.unwrap();
        assert_eq!(command.runtime, RuntimeKind::Python);
        assert_eq!(command.program, "python3");
        assert_eq!(command.entry, "bot.py");
    }

    #[tokio::test]
    async fn missing_marker_defaults_to_node() {
        let (_tmp, dirs) = dirs();
        dirs.ensure_sandbox("t2").unwrap();

        let command = resolve_command(&dirs, "t2").await.unwrap();
        assert_eq!(command.runtime, RuntimeKind::Node);
        assert_eq!(command.program, "node");
        assert_eq!(command.entry, "index.js");
    }

    #[tokio::test]
    async fn descriptor_overrides_sniffing() {
        let (_tmp, dirs) = dirs();
        let sandbox = dirs.ensure_sandbox("t3").unwrap();
        // Marker present, but the descriptor wins.
        std::fs::write(sandbox.join("bot.py"), b"").unwrap();
        std::fs::write(
            dirs.runtime_descriptor_path("t3").unwrap(),
            "runtime = \"node\"\nentry = \"server.js\"\nargs = [\"--trace-warnings\"]\n",
        )
        .unwrap();

        let command = resolve_command(&dirs, "t3").await.unwrap();
        assert_eq!(command.runtime, RuntimeKind::Node);
        assert_eq!(command.entry, "server.js");
        assert_eq!(command.args, vec!["--trace-warnings".to_string()]);
    }

    #[tokio::test]
    async fn descriptor_program_override() {
        let (_tmp, dirs) = dirs();
        dirs.ensure_sandbox("t4").unwrap();
        std::fs::write(
            dirs.runtime_descriptor_path("t4").unwrap(),
            "runtime = \"python\"\nprogram = \"/usr/local/bin/pypy3\"\n",
        )
        .unwrap();

        let command = resolve_command(&dirs, "t4").await.unwrap();
        assert_eq!(command.program, "/usr/local/bin/pypy3");
        assert_eq!(command.entry, "bot.py");
    }

    #[tokio::test]
    async fn malformed_descriptor_is_an_error() {
        let (_tmp, dirs) = dirs();
        dirs.ensure_sandbox("t5").unwrap();
        std::fs::write(dirs.runtime_descriptor_path("t5").unwrap(), "runtime = 7").unwrap();

        let result = resolve_command(&dirs, "t5").await;
        assert!(matches!(result, Err(SupervisorError::Descriptor(_))));
    }
}
