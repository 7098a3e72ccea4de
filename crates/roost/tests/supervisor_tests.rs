//! Supervisor lifecycle tests against real processes.
//!
//! Workers here are plain shell commands provisioned through runtime
//! descriptors, so the tests run on any unix host.

#![cfg(unix)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tempfile::TempDir;

use roost::config::{ProbeBackend, ProbeConfig, SupervisorConfig};
use roost::probe::{self, ProbeResult, ResourceProbe};
use roost::supervisor::{Supervisor, SupervisorError};
use roost::tenants::TenantDirs;

mod common;
use common::provision_shell_bot;

fn test_supervisor(data_dir: &TempDir) -> Supervisor {
    let dirs = TenantDirs::new(data_dir.path());
    let probe_backend = probe::select_backend(&ProbeConfig {
        backend: ProbeBackend::Null,
        cpu_sample_ms: 5,
    });
    Supervisor::new(
        dirs,
        probe_backend,
        &SupervisorConfig {
            restart_grace_ms: 25,
        },
    )
}

#[tokio::test]
async fn start_stop_lifecycle() {
    let data_dir = TempDir::new().unwrap();
    let supervisor = test_supervisor(&data_dir);
    provision_shell_bot(data_dir.path(), "t1", "sleep", "30");

    let pid = supervisor.start("t1").await.unwrap();
    assert!(pid > 0);

    let err = supervisor.start("t1").await.unwrap_err();
    assert!(matches!(err, SupervisorError::AlreadyRunning));

    supervisor.stop("t1").await.unwrap();

    let err = supervisor.stop("t1").await.unwrap_err();
    assert!(matches!(err, SupervisorError::NotRunning));
}

#[tokio::test]
async fn restart_spawns_a_new_worker() {
    let data_dir = TempDir::new().unwrap();
    let supervisor = test_supervisor(&data_dir);
    provision_shell_bot(data_dir.path(), "t1", "sleep", "30");

    let first_pid = supervisor.start("t1").await.unwrap();
    let second_pid = supervisor.restart("t1").await.unwrap();
    assert_ne!(first_pid, second_pid);

    supervisor.stop("t1").await.unwrap();
}

#[tokio::test]
async fn restart_without_running_worker_starts_one() {
    let data_dir = TempDir::new().unwrap();
    let supervisor = test_supervisor(&data_dir);
    provision_shell_bot(data_dir.path(), "t1", "sleep", "30");

    let pid = supervisor.restart("t1").await.unwrap();
    assert!(pid > 0);

    supervisor.stop("t1").await.unwrap();
}

#[tokio::test]
async fn status_reports_running_worker() {
    let data_dir = TempDir::new().unwrap();
    let supervisor = test_supervisor(&data_dir);
    provision_shell_bot(data_dir.path(), "t1", "sleep", "30");

    let pid = supervisor.start("t1").await.unwrap();
    let status = supervisor.status("t1").await.unwrap();
    assert!(status.running);
    assert_eq!(status.pid, Some(pid));
    assert!(status.uptime_secs.is_some());

    supervisor.stop("t1").await.unwrap();
}

#[tokio::test]
async fn exited_worker_is_evicted_on_status() {
    let data_dir = TempDir::new().unwrap();
    let supervisor = test_supervisor(&data_dir);
    provision_shell_bot(data_dir.path(), "t1", "sleep", "0");

    supervisor.start("t1").await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let status = supervisor.status("t1").await.unwrap();
    assert!(!status.running);

    // The stale record is gone, so a new start succeeds.
    provision_shell_bot(data_dir.path(), "t1", "sleep", "30");
    supervisor.start("t1").await.unwrap();
    supervisor.stop("t1").await.unwrap();
}

#[tokio::test]
async fn logs_accumulate_across_runs() {
    let data_dir = TempDir::new().unwrap();
    let supervisor = test_supervisor(&data_dir);

    let tenant_dir = data_dir.path().join("tenants").join("t1");
    std::fs::create_dir_all(tenant_dir.join("sandbox")).unwrap();
    std::fs::write(
        tenant_dir.join("runtime.toml"),
        "runtime = \"python\"\nprogram = \"sh\"\nentry = \"-c\"\nargs = [\"echo run-marker\"]\n",
    )
    .unwrap();

    supervisor.start("t1").await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    let _ = supervisor.status("t1").await.unwrap();

    supervisor.start("t1").await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let logs = supervisor.read_logs("t1").unwrap();
    assert_eq!(logs.matches("run-marker").count(), 2);
    assert!(logs.contains("starting bot"));
}

#[tokio::test]
async fn concurrent_starts_spawn_once() {
    let data_dir = TempDir::new().unwrap();
    let supervisor = Arc::new(test_supervisor(&data_dir));
    provision_shell_bot(data_dir.path(), "t1", "sleep", "30");

    let mut handles = Vec::new();
    for _ in 0..8 {
        let supervisor = supervisor.clone();
        handles.push(tokio::spawn(async move { supervisor.start("t1").await }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);

    supervisor.stop("t1").await.unwrap();
}

/// Probe that takes as long as a full CPU sampling interval would.
struct SlowProbe {
    delay: Duration,
}

#[async_trait]
impl ResourceProbe for SlowProbe {
    async fn sample(&self, _pid: u32) -> ProbeResult {
        tokio::time::sleep(self.delay).await;
        ProbeResult::Alive {
            memory_bytes: 0,
            cpu_percent: 0.0,
        }
    }
}

#[tokio::test]
async fn status_sampling_does_not_block_stop() {
    let data_dir = TempDir::new().unwrap();
    let dirs = TenantDirs::new(data_dir.path());
    let supervisor = Arc::new(Supervisor::new(
        dirs,
        Arc::new(SlowProbe {
            delay: Duration::from_secs(2),
        }),
        &SupervisorConfig {
            restart_grace_ms: 25,
        },
    ));
    provision_shell_bot(data_dir.path(), "t1", "sleep", "30");

    supervisor.start("t1").await.unwrap();

    let status_supervisor = supervisor.clone();
    let status_task = tokio::spawn(async move { status_supervisor.status("t1").await });

    // Let the status call reach the probe before stopping.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stopped_at = Instant::now();
    supervisor.stop("t1").await.unwrap();
    assert!(
        stopped_at.elapsed() < Duration::from_secs(1),
        "stop waited out the probe sample"
    );

    status_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn rejects_invalid_tenant_ids() {
    let data_dir = TempDir::new().unwrap();
    let supervisor = test_supervisor(&data_dir);

    for id in ["", "..", "a/b", "../../etc"] {
        let err = supervisor.start(id).await.unwrap_err();
        assert!(matches!(err, SupervisorError::InvalidTenant(_)), "{id:?}");
    }
}

#[tokio::test]
async fn fallback_sniffs_python_marker() {
    let data_dir = TempDir::new().unwrap();
    let supervisor = test_supervisor(&data_dir);

    // No descriptor; a bot.py in the sandbox selects the Python runtime and
    // the spawn fails only if python3 is missing. Either way it must not
    // leave a registry record behind.
    let sandbox = data_dir.path().join("tenants").join("t1").join("sandbox");
    std::fs::create_dir_all(&sandbox).unwrap();
    std::fs::write(sandbox.join("bot.py"), "import time; time.sleep(30)\n").unwrap();

    match supervisor.start("t1").await {
        Ok(_) => supervisor.stop("t1").await.unwrap(),
        Err(SupervisorError::Spawn(msg)) => assert!(msg.contains("python3")),
        Err(other) => panic!("unexpected error: {other}"),
    }
}
