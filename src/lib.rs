//! Crashtrap - last-resort crash capture for Rust applications
//!
//! Installs a chaining panic hook that writes a timestamped crash log and
//! hands a structured detail record to a pluggable reporter, optionally
//! raising a user-facing notice, before delegating to the previously
//! installed hook so the crash is never masked.
//!
//! # Features
//!
//! - Explicit process-scoped handle, built once at startup (no hidden global)
//! - Chaining registration: the prior hook always sees the original fault
//! - One timestamped log file per crash
//! - Fixed-identifier crash notice (a newer crash replaces, never stacks)
//! - Contract-only reporting hook with a discarding default
//!
//! # Example
//!
//! ```rust,no_run
//! use crashtrap::{AppInfo, CrashCapture, FatalAction};
//!
//! fn main() {
//!     let capture = CrashCapture::builder()
//!         .app(AppInfo::new("myapp", env!("CARGO_PKG_VERSION")))
//!         .crash_dir("/var/lib/myapp/crash")
//!         .fatal_action(FatalAction::Unwind)
//!         .build()
//!         .expect("crash capture config");
//!     capture.install().expect("install crash hook");
//!
//!     // Your application code...
//! }
//! ```

pub mod dump;
pub mod hook;
pub mod notify;
pub mod record;
pub mod report;

pub use dump::{CrashDir, CrashLogEntry, DumpError};
pub use hook::{CaptureError, CrashCapture, CrashCaptureBuilder, FatalAction};
pub use notify::{CrashNotice, Notifier, CRASH_NOTICE_ID};
pub use record::{CrashRecord, EnvironmentSnapshot};
pub use report::{CrashDetail, NullReporter, Reporter};

/// Application identity baked into every environment snapshot.
#[derive(Debug, Clone)]
pub struct AppInfo {
    /// Application name.
    pub name: String,
    /// Application version (typically `env!("CARGO_PKG_VERSION")`).
    pub version: String,
    /// Build profile; defaults to `debug`/`release` per compilation.
    pub build_profile: String,
}

impl AppInfo {
    /// Creates an identity with the compiled-in build profile.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            build_profile: default_build_profile().to_string(),
        }
    }

    /// Overrides the build profile (e.g. a distribution flavor).
    pub fn with_build_profile(mut self, profile: impl Into<String>) -> Self {
        self.build_profile = profile.into();
        self
    }
}

fn default_build_profile() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}
