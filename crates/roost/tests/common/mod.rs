//! Test utilities and common setup.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;

use roost::api::{self, AppState};
use roost::auth::{AuthConfig, AuthState};
use roost::config::{ProbeBackend, ProbeConfig, SupervisorConfig};
use roost::probe;
use roost::supervisor::Supervisor;
use roost::tenants::TenantDirs;

/// Create a test AuthConfig with dev tenants and a JWT secret.
pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        dev_mode: true,
        jwt_secret: Some("test-secret-for-integration-tests-minimum-32-chars".to_string()),
        dev_tenants: vec!["alice".to_string(), "bob".to_string()],
        allowed_origins: vec![],
    }
}

/// Everything an API test needs, with the backing temp dir kept alive.
pub struct TestContext {
    pub app: Router,
    pub auth: AuthState,
    pub supervisor: Arc<Supervisor>,
    pub data_dir: TempDir,
}

/// Build a full application router backed by a temp data dir.
///
/// The probe backend is the null one so tests run without a real procfs.
pub fn test_context() -> TestContext {
    let data_dir = TempDir::new().expect("create test data dir");

    let dirs = TenantDirs::new(data_dir.path());
    let probe_backend = probe::select_backend(&ProbeConfig {
        backend: ProbeBackend::Null,
        cpu_sample_ms: 5,
    });
    let supervisor = Arc::new(Supervisor::new(
        dirs,
        probe_backend,
        &SupervisorConfig {
            restart_grace_ms: 25,
        },
    ));

    let auth = AuthState::new(test_auth_config());
    let files = roost_files::FilesState::new(roost_files::FilesConfig::default());

    let app = api::create_router_with_config(
        AppState::new(supervisor.clone(), auth.clone(), files),
        10,
    );

    TestContext {
        app,
        auth,
        supervisor,
        data_dir,
    }
}

/// Provision a runtime descriptor that runs a short shell command instead of
/// a real bot runtime, so lifecycle tests work on any machine.
pub fn provision_shell_bot(data_dir: &Path, tenant_id: &str, program: &str, entry: &str) {
    let tenant_dir = data_dir.join("tenants").join(tenant_id);
    std::fs::create_dir_all(tenant_dir.join("sandbox")).expect("create sandbox");
    let descriptor = format!("runtime = \"python\"\nprogram = \"{program}\"\nentry = \"{entry}\"\n");
    std::fs::write(tenant_dir.join("runtime.toml"), descriptor).expect("write descriptor");
}
