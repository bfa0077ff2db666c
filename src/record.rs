//! Crash records and the environment snapshot taken at capture time.
//!
//! A [`CrashRecord`] is only ever constructed after a fault has already
//! happened. It is write-once: built, rendered to text, written out, and
//! discarded. Nothing in this module retains a record beyond the handling
//! call.

use std::backtrace::Backtrace;
use std::error::Error;
use std::panic::PanicHookInfo;
use std::thread;

use chrono::{DateTime, Local};

use crate::AppInfo;

/// Timestamp format used for crash log filenames.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Timestamp format used for the `crash at:` header line.
pub const HEADER_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Extension of crash log files.
pub const LOG_EXTENSION: &str = "log";

/// Static snapshot of the process environment, read fresh at capture time.
///
/// Never cached between captures: each record reflects the state at the
/// instant of its own fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSnapshot {
    /// Application name, as configured at startup.
    pub app_name: String,
    /// Application version, as configured at startup.
    pub app_version: String,
    /// Build profile the binary was produced with (e.g. `debug`, `release`).
    pub build_profile: String,
    /// Operating system family the process is running on.
    pub os: String,
    /// CPU architecture the process is running on.
    pub arch: String,
}

impl EnvironmentSnapshot {
    /// Captures a snapshot for the given application identity.
    pub fn capture(app: &AppInfo) -> Self {
        Self {
            app_name: app.name.clone(),
            app_version: app.version.clone(),
            build_profile: app.build_profile.clone(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

/// Diagnostic record of a single fault.
///
/// Immutable after construction. Identity is the derived log filename only;
/// two faults within the same second collide on it and the later write wins.
#[derive(Debug, Clone)]
pub struct CrashRecord {
    /// Local time the fault was captured.
    pub occurred_at: DateTime<Local>,
    /// Name of the thread the fault occurred on.
    pub thread: String,
    /// The fault's message text.
    pub message: String,
    /// Chained cause, when the fault carries one (error-source chains do,
    /// panics don't).
    pub cause: Option<String>,
    /// Source location of the fault, when known (`file:line:column`).
    pub location: Option<String>,
    /// Rendered stack trace captured at the fault site.
    pub trace: String,
    /// Environment snapshot taken at capture time.
    pub environment: EnvironmentSnapshot,
}

impl CrashRecord {
    /// Builds a record from a panic hook invocation.
    ///
    /// Runs on the panicking thread, so the thread name and backtrace are
    /// those of the fault itself.
    pub fn from_panic(info: &PanicHookInfo<'_>, app: &AppInfo) -> Self {
        let message = payload_message(info);
        let location = info.location().map(|loc| loc.to_string());
        Self {
            occurred_at: Local::now(),
            thread: current_thread_name(),
            message,
            cause: None,
            location,
            trace: Backtrace::force_capture().to_string(),
            environment: EnvironmentSnapshot::capture(app),
        }
    }

    /// Builds a record from an error value, walking its source chain into
    /// the `cause` field. The trace is captured at the call site.
    pub fn from_error(error: &(dyn Error + 'static), app: &AppInfo) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(err) = source {
            causes.push(err.to_string());
            source = err.source();
        }
        Self {
            occurred_at: Local::now(),
            thread: current_thread_name(),
            message: error.to_string(),
            cause: (!causes.is_empty()).then(|| causes.join(": ")),
            location: None,
            trace: Backtrace::force_capture().to_string(),
            environment: EnvironmentSnapshot::capture(app),
        }
    }

    /// Filename of the log file this record dumps to, derived from the
    /// capture instant: `yyyy-MM-dd-HH-mm-ss.log`.
    pub fn log_file_name(&self) -> String {
        format!(
            "{}.{}",
            self.occurred_at.format(FILE_TIMESTAMP_FORMAT),
            LOG_EXTENSION
        )
    }

    /// Renders the full log file content: a `crash at:` header followed by
    /// the fault and its stack trace. Header and filename timestamps derive
    /// from the same capture instant.
    pub fn render_log(&self) -> String {
        let mut out = format!(
            "crash at: {}\n",
            self.occurred_at.format(HEADER_TIMESTAMP_FORMAT)
        );
        out.push_str(&format!("thread '{}' panicked", self.thread));
        if let Some(location) = &self.location {
            out.push_str(&format!(" at {location}"));
        }
        out.push_str(&format!(":\n{}\n", self.message));
        if let Some(cause) = &self.cause {
            out.push_str(&format!("caused by: {cause}\n"));
        }
        out.push_str("stack backtrace:\n");
        out.push_str(&self.trace);
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out
    }
}

fn current_thread_name() -> String {
    thread::current()
        .name()
        .unwrap_or("<unnamed>")
        .to_string()
}

/// Extracts the panic message from the hook payload.
///
/// `panic!("...")` produces a `&str`, `panic!("{x}")` a `String`; anything
/// else (e.g. `panic_any`) has no printable form.
fn payload_message(info: &PanicHookInfo<'_>) -> String {
    if let Some(s) = info.payload().downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fmt;

    fn fixed_record() -> CrashRecord {
        CrashRecord {
            occurred_at: Local.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            thread: "main".to_string(),
            message: "divide by zero".to_string(),
            cause: None,
            location: Some("src/math.rs:42:13".to_string()),
            trace: "   0: myapp::divide\n   1: myapp::main\n".to_string(),
            environment: EnvironmentSnapshot::capture(&AppInfo::new("myapp", "1.2.3")),
        }
    }

    #[test]
    fn filename_and_header_derive_from_same_instant() {
        let record = fixed_record();

        assert_eq!(record.log_file_name(), "2024-01-01-12-00-00.log");
        assert!(record
            .render_log()
            .starts_with("crash at: 2024-01-01 12:00:00\n"));
    }

    #[test]
    fn render_log_contains_fault_details() {
        let rendered = fixed_record().render_log();

        assert!(rendered.contains("thread 'main' panicked at src/math.rs:42:13:"));
        assert!(rendered.contains("divide by zero"));
        assert!(rendered.contains("stack backtrace:"));
        assert!(rendered.contains("myapp::divide"));
        assert!(rendered.ends_with('\n'));
    }

    #[test]
    fn render_log_includes_cause_when_present() {
        let mut record = fixed_record();
        record.cause = Some("connection reset by peer".to_string());

        assert!(record
            .render_log()
            .contains("caused by: connection reset by peer\n"));
    }

    #[test]
    fn environment_snapshot_reads_process_facts() {
        let snapshot = EnvironmentSnapshot::capture(&AppInfo::new("myapp", "1.2.3"));

        assert_eq!(snapshot.app_name, "myapp");
        assert_eq!(snapshot.app_version, "1.2.3");
        assert_eq!(snapshot.os, std::env::consts::OS);
        assert_eq!(snapshot.arch, std::env::consts::ARCH);
        assert!(!snapshot.build_profile.is_empty());
    }

    #[derive(Debug)]
    struct Outer;

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "request failed")
        }
    }

    impl Error for Outer {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&Inner)
        }
    }

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "connection reset")
        }
    }

    impl Error for Inner {}

    #[test]
    fn from_error_walks_source_chain() {
        let record = CrashRecord::from_error(&Outer, &AppInfo::new("myapp", "1.2.3"));

        assert_eq!(record.message, "request failed");
        assert_eq!(record.cause.as_deref(), Some("connection reset"));
        assert!(record.location.is_none());
        assert!(!record.trace.is_empty());
    }
}
