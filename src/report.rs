//! Reporting hook for forwarding crash details to a collector.
//!
//! Only the contract lives here: the [`CrashDetail`] every reporter
//! receives, with a line-oriented text rendering and a JSON rendering so
//! any transport can consume it. No transport is shipped: [`NullReporter`]
//! renders the detail and sends it nowhere, standing in until an integrator
//! wires one up.

use serde::{Deserialize, Serialize};

use crate::record::{CrashRecord, HEADER_TIMESTAMP_FORMAT};

/// Structured crash detail handed to a [`Reporter`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashDetail {
    /// Capture time, formatted `yyyy-MM-dd HH:mm:ss` local.
    pub time: String,
    /// Application name.
    pub app_name: String,
    /// Application version.
    pub app_version: String,
    /// Build profile of the binary.
    pub build_profile: String,
    /// Operating system family.
    pub os: String,
    /// CPU architecture.
    pub arch: String,
    /// Faulting thread name.
    pub thread: String,
    /// Fault message.
    pub message: String,
    /// Chained cause, if the fault carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl CrashDetail {
    /// Builds the detail for a captured record.
    pub fn from_record(record: &CrashRecord) -> Self {
        Self {
            time: record
                .occurred_at
                .format(HEADER_TIMESTAMP_FORMAT)
                .to_string(),
            app_name: record.environment.app_name.clone(),
            app_version: record.environment.app_version.clone(),
            build_profile: record.environment.build_profile.clone(),
            os: record.environment.os.clone(),
            arch: record.environment.arch.clone(),
            thread: record.thread.clone(),
            message: record.message.clone(),
            cause: record.cause.clone(),
        }
    }

    /// Renders the detail as `key: value` lines, one per field.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("time: {}\n", self.time));
        out.push_str(&format!("app: {}\n", self.app_name));
        out.push_str(&format!("version: {}\n", self.app_version));
        out.push_str(&format!("profile: {}\n", self.build_profile));
        out.push_str(&format!("os: {}\n", self.os));
        out.push_str(&format!("arch: {}\n", self.arch));
        out.push_str(&format!("thread: {}\n", self.thread));
        out.push_str(&format!("message: {}\n", self.message));
        if let Some(cause) = &self.cause {
            out.push_str(&format!("cause: {cause}\n"));
        }
        out
    }

    /// Serializes the detail to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Hook invoked once per captured crash, independent of the notification
/// flag. Runs on the faulting thread; implementations must be best-effort
/// and quick; the process is about to terminate.
pub trait Reporter: Send + Sync {
    /// Forwards the detail to wherever reports go.
    fn report(&self, detail: &CrashDetail) -> anyhow::Result<()>;
}

/// Reporter with no transport: renders the detail and discards it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, detail: &CrashDetail) -> anyhow::Result<()> {
        tracing::debug!(detail = %detail.render(), "crash detail discarded (no transport configured)");
        Ok(())
    }
}
