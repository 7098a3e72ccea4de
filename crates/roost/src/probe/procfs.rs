//! Procfs-backed resource probe.
//!
//! Memory comes from `/proc/<pid>/statm` (resident pages). CPU requires two
//! samples: `/proc/<pid>/stat` utime+stime are read twice over the configured
//! interval and the tick delta is converted to a percentage of one core.
//! Any read failure maps to `Unreadable`.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use log::trace;
use tokio::fs;

use super::{ProbeResult, ResourceProbe};
use crate::config::ProbeConfig;

pub struct ProcfsProbe {
    proc_root: PathBuf,
    sample_interval: Duration,
}

impl ProcfsProbe {
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
            sample_interval: Duration::from_millis(config.cpu_sample_ms.max(1)),
        }
    }

    /// Use an alternate procfs root (test fixtures).
    pub fn with_proc_root(mut self, proc_root: impl Into<PathBuf>) -> Self {
        self.proc_root = proc_root.into();
        self
    }

    async fn read_rss_bytes(&self, pid: u32) -> Option<u64> {
        let content = fs::read_to_string(self.proc_root.join(pid.to_string()).join("statm"))
            .await
            .ok()?;
        // statm: size resident shared text lib data dt (pages)
        let resident_pages: u64 = content.split_whitespace().nth(1)?.parse().ok()?;
        Some(resident_pages * rustix::param::page_size() as u64)
    }

    async fn read_cpu_ticks(&self, pid: u32) -> Option<u64> {
        let content = fs::read_to_string(self.proc_root.join(pid.to_string()).join("stat"))
            .await
            .ok()?;
        parse_stat_ticks(&content)
    }
}

/// Extract utime+stime (clock ticks) from a `/proc/<pid>/stat` line.
///
/// The comm field may contain spaces and parentheses, so fields are counted
/// from the last `)`. utime and stime are fields 14 and 15 overall, which
/// puts them at offsets 11 and 12 after the comm field.
fn parse_stat_ticks(stat: &str) -> Option<u64> {
    let (_, after_comm) = stat.rsplit_once(')')?;
    let fields: Vec<&str> = after_comm.split_whitespace().collect();
    // A zombie has a readable /proc entry but is no longer a live worker.
    if *fields.first()? == "Z" {
        return None;
    }
    let utime: u64 = fields.get(11)?.parse().ok()?;
    let stime: u64 = fields.get(12)?.parse().ok()?;
    Some(utime + stime)
}

#[async_trait]
impl ResourceProbe for ProcfsProbe {
    async fn sample(&self, pid: u32) -> ProbeResult {
        let Some(memory_bytes) = self.read_rss_bytes(pid).await else {
            return ProbeResult::Unreadable;
        };
        let Some(first_ticks) = self.read_cpu_ticks(pid).await else {
            return ProbeResult::Unreadable;
        };

        tokio::time::sleep(self.sample_interval).await;

        // The process may exit between samples; that still counts as dead.
        let Some(second_ticks) = self.read_cpu_ticks(pid).await else {
            return ProbeResult::Unreadable;
        };

        let ticks_per_sec = rustix::param::clock_ticks_per_second().max(1);
        let cpu_seconds = second_ticks.saturating_sub(first_ticks) as f64 / ticks_per_sec as f64;
        let cpu_percent = (cpu_seconds / self.sample_interval.as_secs_f64()) * 100.0;

        trace!(
            "probe pid {}: rss={} bytes, cpu={:.1}%",
            pid, memory_bytes, cpu_percent
        );

        ProbeResult::Alive {
            memory_bytes,
            cpu_percent,
        }
    }
}
