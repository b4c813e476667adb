//! Best-effort diagnostic file sink
//!
//! Every node-level failure and flush event appends a `host: <h>; message:
//! <m>` line to a fixed local file. This is observability only: write
//! failures are logged and swallowed, never propagated.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Appends diagnostic lines to a local file
#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    path: PathBuf,
}

impl DiagnosticLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one diagnostic line
    pub fn record(&self, host: &str, message: &str) {
        let line = format!("host: {}; message: {}\n", host, message);
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()));
        if let Err(e) = result {
            debug!(path = %self.path.display(), error = %e, "failed to append diagnostic line");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("debug.log");
        let log = DiagnosticLog::new(&path);

        log.record("ch-1", "connection refused");
        log.record("ch-2", "successfully written");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "host: ch-1; message: connection refused\nhost: ch-2; message: successfully written\n"
        );
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let log = DiagnosticLog::new("/nonexistent-dir/debug.log");
        // Must not panic or error
        log.record("ch-1", "dropped");
    }
}
