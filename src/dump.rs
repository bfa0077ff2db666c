//! Crash log directory: one timestamped text file per fault.
//!
//! Writes are best-effort: on the fault path a failed dump is reported to
//! stderr and forgotten, never retried. The listing and pruning side is
//! what the CLI builds on.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::Serialize;
use thiserror::Error;

use crate::record::{CrashRecord, FILE_TIMESTAMP_FORMAT, LOG_EXTENSION};

/// Errors from crash log storage.
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("crash log I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// A stored crash log, as seen by the listing side.
#[derive(Debug, Clone, Serialize)]
pub struct CrashLogEntry {
    /// Full path of the log file.
    pub path: PathBuf,
    /// Capture time parsed back out of the filename; `None` when the
    /// filename does not follow the timestamp convention.
    pub captured_at: Option<DateTime<Local>>,
    /// File size in bytes.
    pub size_bytes: u64,
}

/// Directory holding crash logs.
#[derive(Debug, Clone)]
pub struct CrashDir {
    root: PathBuf,
}

impl CrashDir {
    /// Wraps a directory path. Nothing is created until [`CrashDir::create`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory the logs live in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the directory and any missing parents.
    pub fn create(&self) -> Result<(), DumpError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Writes one record to `<root>/<yyyy-MM-dd-HH-mm-ss>.log`.
    ///
    /// Does not create the directory: if it vanished since startup the
    /// write fails and the caller decides what to do (on the fault path,
    /// nothing). A same-second collision silently replaces the earlier file.
    pub fn write(&self, record: &CrashRecord) -> Result<PathBuf, DumpError> {
        let path = self.root.join(record.log_file_name());
        fs::write(&path, record.render_log())?;
        tracing::debug!(path = %path.display(), "crash log written");
        Ok(path)
    }

    /// Lists stored logs, newest first. Files without the `.log` extension
    /// are skipped; files whose name does not parse as a timestamp sort
    /// last. A missing directory lists as empty.
    pub fn entries(&self) -> Result<Vec<CrashLogEntry>, DumpError> {
        let read_dir = match fs::read_dir(&self.root) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut entries = Vec::new();
        for dir_entry in read_dir {
            let dir_entry = dir_entry?;
            let path = dir_entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(LOG_EXTENSION) {
                continue;
            }
            entries.push(CrashLogEntry {
                captured_at: parse_file_timestamp(&path),
                size_bytes: dir_entry.metadata()?.len(),
                path,
            });
        }

        entries.sort_by(|a, b| b.captured_at.cmp(&a.captured_at));
        Ok(entries)
    }

    /// Deletes logs captured before the cutoff. Files whose name does not
    /// parse as a timestamp are left alone. Returns how many were removed.
    pub fn prune_older_than(&self, cutoff: DateTime<Local>) -> Result<usize, DumpError> {
        let mut removed = 0;
        for entry in self.entries()? {
            let Some(captured_at) = entry.captured_at else {
                continue;
            };
            if captured_at < cutoff {
                fs::remove_file(&entry.path)?;
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!(removed, root = %self.root.display(), "pruned crash logs");
        }
        Ok(removed)
    }
}

fn parse_file_timestamp(path: &Path) -> Option<DateTime<Local>> {
    let stem = path.file_stem()?.to_str()?;
    let naive = NaiveDateTime::parse_from_str(stem, FILE_TIMESTAMP_FORMAT).ok()?;
    Local.from_local_datetime(&naive).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::EnvironmentSnapshot;
    use crate::AppInfo;
    use tempfile::TempDir;

    fn record_at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, message: &str) -> CrashRecord {
        CrashRecord {
            occurred_at: Local.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap(),
            thread: "main".to_string(),
            message: message.to_string(),
            cause: None,
            location: None,
            trace: "   0: myapp::main\n".to_string(),
            environment: EnvironmentSnapshot::capture(&AppInfo::new("myapp", "1.2.3")),
        }
    }

    #[test]
    fn write_produces_expected_file() {
        let dir = TempDir::new().unwrap();
        let crash_dir = CrashDir::new(dir.path());

        let path = crash_dir
            .write(&record_at(2024, 1, 1, 12, 0, 0, "divide by zero"))
            .unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "2024-01-01-12-00-00.log"
        );
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("crash at: 2024-01-01 12:00:00\n"));
        assert!(content.contains("divide by zero"));
    }

    #[test]
    fn write_fails_when_directory_missing() {
        let dir = TempDir::new().unwrap();
        let crash_dir = CrashDir::new(dir.path().join("never-created"));

        let result = crash_dir.write(&record_at(2024, 1, 1, 12, 0, 0, "boom"));

        assert!(matches!(result, Err(DumpError::Io(_))));
    }

    #[test]
    fn entries_sort_newest_first() {
        let dir = TempDir::new().unwrap();
        let crash_dir = CrashDir::new(dir.path());

        crash_dir.write(&record_at(2024, 1, 1, 12, 0, 0, "old")).unwrap();
        crash_dir.write(&record_at(2024, 3, 5, 8, 30, 0, "new")).unwrap();
        // Unrelated files are skipped, oddly named logs sort last.
        fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();
        fs::write(dir.path().join("manual-copy.log"), "kept").unwrap();

        let entries = crash_dir.entries().unwrap();

        assert_eq!(entries.len(), 3);
        assert!(entries[0].path.ends_with("2024-03-05-08-30-00.log"));
        assert!(entries[1].path.ends_with("2024-01-01-12-00-00.log"));
        assert!(entries[2].captured_at.is_none());
    }

    #[test]
    fn entries_of_missing_directory_are_empty() {
        let dir = TempDir::new().unwrap();
        let crash_dir = CrashDir::new(dir.path().join("nope"));

        assert!(crash_dir.entries().unwrap().is_empty());
    }

    #[test]
    fn prune_removes_old_keeps_recent_and_unparseable() {
        let dir = TempDir::new().unwrap();
        let crash_dir = CrashDir::new(dir.path());

        crash_dir.write(&record_at(2023, 6, 1, 0, 0, 0, "ancient")).unwrap();
        crash_dir.write(&record_at(2024, 3, 5, 8, 30, 0, "recent")).unwrap();
        fs::write(dir.path().join("manual-copy.log"), "kept").unwrap();

        let cutoff = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let removed = crash_dir.prune_older_than(cutoff).unwrap();

        assert_eq!(removed, 1);
        let remaining = crash_dir.entries().unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(remaining
            .iter()
            .any(|e| e.path.ends_with("2024-03-05-08-30-00.log")));
        assert!(remaining.iter().any(|e| e.path.ends_with("manual-copy.log")));
    }
}
