//! Per-tenant worker log capture.
//!
//! Each tenant has one append-only log file. The worker's stdout and stderr
//! are redirected into it at spawn time, and the supervisor writes lifecycle
//! marker lines through [`LogSink::append`]. Nothing here rotates or caps the
//! log; a separate maintenance hook owns clearing.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};

use chrono::Utc;
use log::debug;

use crate::tenants::TenantDirs;

/// Returned by [`LogSink::read_all`] when a tenant has never produced output.
pub const NO_LOGS_SENTINEL: &str = "No logs yet.";

/// Append-only capture of one worker's combined output stream.
#[derive(Debug, Clone)]
pub struct LogSink {
    dirs: TenantDirs,
}

impl LogSink {
    pub fn new(dirs: TenantDirs) -> Self {
        Self { dirs }
    }

    /// Open the tenant's log in append mode, creating it if missing.
    ///
    /// The returned handle is cloned into the worker's stdout and stderr at
    /// spawn time; appends never truncate existing content.
    pub fn append_handle(&self, tenant_id: &str) -> io::Result<File> {
        let path = self.dirs.log_path(tenant_id)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(path)
    }

    /// Append raw bytes to the tenant's log.
    pub fn append(&self, tenant_id: &str, bytes: &[u8]) -> io::Result<()> {
        let mut file = self.append_handle(tenant_id)?;
        file.write_all(bytes)?;
        file.flush()
    }

    /// Append a timestamped supervisor marker line.
    pub fn append_marker(&self, tenant_id: &str, message: &str) -> io::Result<()> {
        let line = format!("[roost {}] {}\n", Utc::now().format("%Y-%m-%d %H:%M:%S"), message);
        self.append(tenant_id, line.as_bytes())
    }

    /// Read the tenant's entire accumulated log.
    ///
    /// A tenant with no log yet gets the sentinel string, never an error.
    pub fn read_all(&self, tenant_id: &str) -> io::Result<String> {
        let path = self.dirs.log_path(tenant_id)?;
        if !path.exists() {
            debug!("no log file yet for tenant {}", tenant_id);
            return Ok(NO_LOGS_SENTINEL.to_string());
        }
        let bytes = std::fs::read(&path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sink() -> (TempDir, LogSink) {
        let tmp = TempDir::new().unwrap();
        let sink = LogSink::new(TenantDirs::new(tmp.path()));
        (tmp, sink)
    }

    #[test]
    fn read_all_without_logs_returns_sentinel() {
        let (_tmp, sink) = sink();
        assert_eq!(sink.read_all("t1").unwrap(), NO_LOGS_SENTINEL);
    }

    #[test]
    fn appends_accumulate() {
        let (_tmp, sink) = sink();
        sink.append("t1", b"first\n").unwrap();
        sink.append("t1", b"second\n").unwrap();
        assert_eq!(sink.read_all("t1").unwrap(), "first\nsecond\n");
    }

    #[test]
    fn append_handle_never_truncates() {
        let (_tmp, sink) = sink();
        sink.append("t1", b"before ").unwrap();

        let mut handle = sink.append_handle("t1").unwrap();
        handle.write_all(b"after").unwrap();
        handle.flush().unwrap();

        assert_eq!(sink.read_all("t1").unwrap(), "before after");
    }

    #[test]
    fn log_length_is_monotonic() {
        let (_tmp, sink) = sink();
        let mut last_len = 0;
        for i in 0..10 {
            sink.append("t1", format!("line {i}\n").as_bytes()).unwrap();
            let len = sink.read_all("t1").unwrap().len();
            assert!(len > last_len);
            last_len = len;
        }
    }

    #[test]
    fn markers_are_timestamped_lines() {
        let (_tmp, sink) = sink();
        sink.append_marker("t1", "starting bot").unwrap();
        let content = sink.read_all("t1").unwrap();
        assert!(content.starts_with("[roost "));
        assert!(content.contains("starting bot"));
        assert!(content.ends_with('\n'));
    }

    #[test]
    fn tenants_have_separate_logs() {
        let (_tmp, sink) = sink();
        sink.append("t1", b"one").unwrap();
        sink.append("t2", b"two").unwrap();
        assert_eq!(sink.read_all("t1").unwrap(), "one");
        assert_eq!(sink.read_all("t2").unwrap(), "two");
    }
}
