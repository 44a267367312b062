//! Append-only run log.
//!
//! One line per attempted action and outcome: timestamp, level, message.
//! The file outlives the run for postmortem; nothing else persists across
//! runs. Single writer, no contention.

use chrono::Utc;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
enum LogLevel {
    Info,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// The append-only log sink carried by a run.
pub struct RunLog {
    out: Box<dyn Write + Send>,
}

impl RunLog {
    /// Open (or create) a log file in append mode.
    pub fn to_file(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            out: Box::new(file),
        })
    }

    /// A log that discards everything. For dry validation and tests.
    pub fn sink() -> Self {
        Self {
            out: Box::new(io::sink()),
        }
    }

    pub fn info(&mut self, message: &str) {
        self.append(LogLevel::Info, message);
    }

    pub fn error(&mut self, message: &str) {
        self.append(LogLevel::Error, message);
    }

    fn append(&mut self, level: LogLevel, message: &str) {
        let line = format!(
            "{} {} {}\n",
            Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            level,
            message
        );
        // A log write failure must not abort the run it is describing.
        if let Err(e) = self
            .out
            .write_all(line.as_bytes())
            .and_then(|()| self.out.flush())
        {
            warn!(error = %e, "failed to append to run log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_lines_have_timestamp_and_level() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deploy.log");

        {
            let mut log = RunLog::to_file(&path).unwrap();
            log.info("resource 'storage' applied");
            log.error("step 'cluster' failed");
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(" INFO resource 'storage' applied"));
        assert!(lines[1].contains(" ERROR step 'cluster' failed"));
        // Timestamp prefix is ISO-8601 UTC
        assert!(lines[0].starts_with("20"));
        assert!(lines[0].split(' ').next().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_log_appends_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deploy.log");

        RunLog::to_file(&path).unwrap().info("first run");
        RunLog::to_file(&path).unwrap().info("second run");

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
