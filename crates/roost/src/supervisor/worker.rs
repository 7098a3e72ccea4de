//! Worker process handles.

use std::fs::File;
use std::io;
use std::path::Path;
use std::process::Stdio;

use log::{debug, warn};
use rustix::process::{Pid, Signal, kill_process};
use tokio::process::{Child, Command};

use super::command::CommandDescriptor;
use super::error::SupervisorError;

/// Owned handle to a spawned tenant worker.
///
/// The supervisor is the only component allowed to signal the process. The
/// child is spawned without `kill_on_drop` and in its own process group: a
/// worker keeps running when the control plane exits or restarts, but this
/// handle stays sufficient to signal it while the supervisor lives.
#[derive(Debug)]
pub struct WorkerHandle {
    /// Process id.
    pub pid: u32,
    child: Child,
}

impl WorkerHandle {
    /// Spawn a worker in the tenant sandbox with both output streams
    /// redirected into the append-mode log handle.
    pub fn spawn(
        command: &CommandDescriptor,
        sandbox: &Path,
        log: File,
    ) -> Result<Self, SupervisorError> {
        let stderr_log = log
            .try_clone()
            .map_err(|e| SupervisorError::Spawn(format!("cloning log handle: {e}")))?;

        let mut cmd = Command::new(&command.program);
        cmd.arg(&command.entry)
            .args(&command.args)
            .current_dir(sandbox)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(stderr_log));

        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd
            .spawn()
            .map_err(|e| SupervisorError::Spawn(format!("{} {}: {e}", command.program, command.entry)))?;

        let pid = child
            .id()
            .ok_or_else(|| SupervisorError::Spawn("spawned worker has no pid".to_string()))?;

        debug!("spawned worker pid {} ({} {})", pid, command.program, command.entry);

        Ok(Self { pid, child })
    }

    /// Send SIGTERM without waiting for exit.
    pub fn signal_term(&self) -> io::Result<()> {
        let pid = Pid::from_raw(self.pid as i32)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
        kill_process(pid, Signal::TERM).map_err(io::Error::from)
    }

    /// Collect the exit status if the worker has already exited.
    ///
    /// Called on eviction so a dead worker doesn't linger as a zombie.
    pub fn reap(&mut self) {
        match self.child.try_wait() {
            Ok(Some(status)) => debug!("reaped worker pid {}: {}", self.pid, status),
            Ok(None) => {}
            Err(e) => warn!("error reaping worker pid {}: {}", self.pid, e),
        }
    }

    /// Whether the process is still running, per the child handle.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}
