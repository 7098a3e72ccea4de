//! Fallback probe for platforms without process accounting files.
//!
//! Liveness is checked with a null signal; a live process reports zeroed
//! memory/CPU stats rather than pretending to know them.

use async_trait::async_trait;
use rustix::process::{Pid, test_kill_process};

use super::{ProbeResult, ResourceProbe};

pub struct NullProbe;

#[async_trait]
impl ResourceProbe for NullProbe {
    async fn sample(&self, pid: u32) -> ProbeResult {
        let Some(pid) = Pid::from_raw(pid as i32) else {
            return ProbeResult::Unreadable;
        };

        match test_kill_process(pid) {
            Ok(()) => ProbeResult::Alive {
                memory_bytes: 0,
                cpu_percent: 0.0,
            },
            Err(_) => ProbeResult::Unreadable,
        }
    }
}
