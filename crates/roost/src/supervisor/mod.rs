//! Tenant process supervision.
//!
//! The supervisor owns the registry mapping tenant ids to their live worker
//! record and enforces the one-live-process-per-tenant invariant. The
//! registry is a lock table: each tenant gets a lane mutex, so
//! check-then-spawn is atomic per tenant while different tenants never block
//! one another. A record exists exactly as long as the supervisor believes
//! the process is live; a failed probe evicts the record before any status
//! is reported.

mod command;
mod error;
mod worker;

pub use command::{CommandDescriptor, RuntimeDescriptor, RuntimeKind, resolve_command};
pub use error::SupervisorError;
pub use worker::WorkerHandle;

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use log::{info, warn};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::SupervisorConfig;
use crate::logs::LogSink;
use crate::probe::{ProbeResult, ResourceProbe};
use crate::tenants::{TenantDirs, validate_tenant_id};

/// One live worker per tenant.
#[derive(Debug)]
pub struct TenantProcessRecord {
    pub tenant_id: String,
    pub worker: WorkerHandle,
    pub started_at: Instant,
    pub command: CommandDescriptor,
}

type TenantSlot = Option<TenantProcessRecord>;

/// Status view of a tenant's worker.
#[derive(Debug, Serialize)]
pub struct BotStatus {
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
}

impl BotStatus {
    fn stopped() -> Self {
        Self {
            running: false,
            uptime_secs: None,
            memory_bytes: None,
            cpu_percent: None,
            pid: None,
        }
    }
}

/// Supervisor for tenant worker processes.
pub struct Supervisor {
    dirs: TenantDirs,
    logs: LogSink,
    probe: Arc<dyn ResourceProbe>,
    registry: DashMap<String, Arc<Mutex<TenantSlot>>>,
    restart_grace: Duration,
}

impl Supervisor {
    pub fn new(dirs: TenantDirs, probe: Arc<dyn ResourceProbe>, config: &SupervisorConfig) -> Self {
        let logs = LogSink::new(dirs.clone());
        Self {
            dirs,
            logs,
            probe,
            registry: DashMap::new(),
            restart_grace: Duration::from_millis(config.restart_grace_ms),
        }
    }

    pub fn tenant_dirs(&self) -> &TenantDirs {
        &self.dirs
    }

    pub fn log_sink(&self) -> &LogSink {
        &self.logs
    }

    /// Per-tenant lane. The lane mutex serializes all registry mutations for
    /// one tenant; the DashMap shard lock is held only long enough to clone
    /// the Arc.
    fn lane(&self, tenant_id: &str) -> Arc<Mutex<TenantSlot>> {
        self.registry
            .entry(tenant_id.to_string())
            .or_default()
            .clone()
    }

    fn check_tenant(tenant_id: &str) -> Result<(), SupervisorError> {
        if !validate_tenant_id(tenant_id) {
            return Err(SupervisorError::InvalidTenant(tenant_id.to_string()));
        }
        Ok(())
    }

    /// Start the tenant's worker.
    ///
    /// Fails with `AlreadyRunning` if a record exists. The existence check
    /// and the record insert happen under the same lane lock, so two
    /// concurrent starts can never both spawn.
    pub async fn start(&self, tenant_id: &str) -> Result<u32, SupervisorError> {
        Self::check_tenant(tenant_id)?;
        let lane = self.lane(tenant_id);
        let mut slot = lane.lock().await;

        if slot.is_some() {
            return Err(SupervisorError::AlreadyRunning);
        }

        let sandbox = self.dirs.ensure_sandbox(tenant_id)?;
        let command = resolve_command(&self.dirs, tenant_id).await?;

        let _ = self.logs.append_marker(
            tenant_id,
            &format!("starting bot ({} {})", command.program, command.entry),
        );
        let log = self.logs.append_handle(tenant_id)?;

        let worker = WorkerHandle::spawn(&command, &sandbox, log)?;
        let pid = worker.pid;

        info!(
            "started worker for tenant {} (pid {}, {} {})",
            tenant_id, pid, command.program, command.entry
        );

        *slot = Some(TenantProcessRecord {
            tenant_id: tenant_id.to_string(),
            worker,
            started_at: Instant::now(),
            command,
        });

        Ok(pid)
    }

    /// Stop the tenant's worker.
    ///
    /// Sends SIGTERM through the owned handle and removes the record
    /// immediately; the removal does not wait for the process to exit.
    pub async fn stop(&self, tenant_id: &str) -> Result<(), SupervisorError> {
        Self::check_tenant(tenant_id)?;
        let lane = self.lane(tenant_id);
        let mut slot = lane.lock().await;

        let record = slot.take().ok_or(SupervisorError::NotRunning)?;

        if let Err(e) = record.worker.signal_term() {
            // The worker may already be gone; the record is dropped either way.
            warn!(
                "failed to signal worker pid {} for tenant {}: {}",
                record.worker.pid, tenant_id, e
            );
        }

        let _ = self.logs.append_marker(tenant_id, "stopping bot");
        info!(
            "stopped worker for tenant {} (pid {})",
            tenant_id, record.worker.pid
        );

        Ok(())
    }

    /// Restart the tenant's worker: stop if running, wait out the grace
    /// period, then start.
    ///
    /// `stop` returns before the old process has exited, so the grace delay
    /// keeps the old and new workers from contending for the same resources.
    /// With no worker running this behaves as a plain start.
    pub async fn restart(&self, tenant_id: &str) -> Result<u32, SupervisorError> {
        match self.stop(tenant_id).await {
            Ok(()) => {
                tokio::time::sleep(self.restart_grace).await;
            }
            Err(SupervisorError::NotRunning) => {}
            Err(e) => return Err(e),
        }

        self.start(tenant_id).await
    }

    /// Report the tenant's worker status.
    ///
    /// A record whose probe comes back unreadable is evicted before the
    /// response is built, so a crashed worker never reports as running and
    /// the next start finds no stale record. The probe itself runs outside
    /// the lane lock: sampling sleeps for the CPU interval, and holding the
    /// lane that long would stall the tenant's concurrent start/stop.
    pub async fn status(&self, tenant_id: &str) -> Result<BotStatus, SupervisorError> {
        Self::check_tenant(tenant_id)?;
        let lane = self.lane(tenant_id);

        let (pid, started_at) = {
            let mut slot = lane.lock().await;

            let Some(record) = slot.as_mut() else {
                return Ok(BotStatus::stopped());
            };

            let pid = record.worker.pid;

            // The child handle knows about exits before any probe does, and
            // it sidesteps zombie entries that still look probeable.
            if !record.worker.is_running() {
                info!(
                    "worker pid {} for tenant {} exited, evicting record",
                    pid, tenant_id
                );
                *slot = None;
                let _ = self.logs.append_marker(tenant_id, "bot process died");
                return Ok(BotStatus::stopped());
            }

            (pid, record.started_at)
        };

        match self.probe.sample(pid).await {
            ProbeResult::Unreadable => {
                let mut slot = lane.lock().await;
                // The registry may have moved on while the probe slept; only
                // evict the record that was actually probed.
                if slot.as_ref().is_some_and(|r| r.worker.pid == pid) {
                    info!(
                        "worker pid {} for tenant {} is gone, evicting record",
                        pid, tenant_id
                    );
                    if let Some(mut dead) = slot.take() {
                        dead.worker.reap();
                    }
                    let _ = self.logs.append_marker(tenant_id, "bot process died");
                }
                Ok(BotStatus::stopped())
            }
            ProbeResult::Alive {
                memory_bytes,
                cpu_percent,
            } => Ok(BotStatus {
                running: true,
                uptime_secs: Some(started_at.elapsed().as_secs()),
                memory_bytes: Some(memory_bytes),
                cpu_percent: Some(cpu_percent),
                pid: Some(pid),
            }),
        }
    }

    /// Read the tenant's accumulated worker log.
    pub fn read_logs(&self, tenant_id: &str) -> Result<String, SupervisorError> {
        Self::check_tenant(tenant_id)?;
        Ok(self.logs.read_all(tenant_id)?)
    }
}
