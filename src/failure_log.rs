//! Append-only log of failed batch items.
//!
//! Each failure is one tab-separated line:
//!
//! ```text
//! 2026-01-02T15:04:05+08:00	level=ERROR	trace-id=abc	target=scan.pdf	message=parsing failed: ...
//! ```
//!
//! Concurrent workers share one [`FailureLog`]; writes are serialised so
//! lines never interleave.

use crate::error::{normalize_trace_id, Doc2xError};
use chrono::{Local, SecondsFormat};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug)]
pub struct FailureLog {
    path: Option<PathBuf>,
    lock: Mutex<()>,
}

impl FailureLog {
    /// A log writing to `path`. An empty path disables logging.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            path: (!path.as_os_str().is_empty()).then_some(path),
            lock: Mutex::new(()),
        }
    }

    pub fn disabled() -> Self {
        Self {
            path: None,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record that `target` failed with `err`, using the error's trace id.
    pub fn record(&self, target: &str, err: &Doc2xError) -> Result<(), Doc2xError> {
        self.record_with_trace(err.trace_id().unwrap_or(""), target, &err.to_string())
    }

    /// Append one line. Creates the parent directory on first use.
    pub fn record_with_trace(
        &self,
        trace_id: &str,
        target: &str,
        message: &str,
    ) -> Result<(), Doc2xError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let line = format_line(
            &Local::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            trace_id,
            target,
            message,
        );

        // A poisoned lock only means another writer panicked mid-line.
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| Doc2xError::io(format!("create '{}'", dir.display()), e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Doc2xError::io(format!("open '{}'", path.display()), e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| Doc2xError::io(format!("append to '{}'", path.display()), e))
    }
}

fn format_line(timestamp: &str, trace_id: &str, target: &str, message: &str) -> String {
    format!(
        "{timestamp}\tlevel=ERROR\ttrace-id={}\ttarget={target}\tmessage={message}\n",
        normalize_trace_id(trace_id)
    )
}
