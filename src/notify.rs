//! Notification seam for surfacing a crash to the user.
//!
//! The look-and-feel of the notification (icons, channels, localized
//! strings) belongs to the host application; this module only owns the
//! contract. Notices are fire-and-forget: the fault path does not wait for
//! user interaction, and delivery failures are adapter-specific, so the
//! trait returns `anyhow::Result`.

use chrono::{DateTime, Local};

use crate::record::CrashRecord;

/// Fixed identifier every crash notice carries.
///
/// Notification surfaces key on this id, so a second crash raised before
/// the first notice is dismissed replaces it rather than stacking.
pub const CRASH_NOTICE_ID: u32 = 0;

/// A user-facing summary of a captured crash.
#[derive(Debug, Clone)]
pub struct CrashNotice {
    /// Surface identifier; always [`CRASH_NOTICE_ID`].
    pub id: u32,
    /// Short title naming the application that crashed.
    pub title: String,
    /// One-line summary of the fault.
    pub body: String,
    /// Capture instant of the underlying record.
    pub raised_at: DateTime<Local>,
}

impl CrashNotice {
    /// Builds the notice for a captured record.
    pub fn from_record(record: &CrashRecord) -> Self {
        Self {
            id: CRASH_NOTICE_ID,
            title: format!("{} crashed", record.environment.app_name),
            body: format!("thread '{}': {}", record.thread, record.message),
            raised_at: record.occurred_at,
        }
    }
}

/// Adapter trait for whatever notification surface the host provides.
///
/// Implementations must replace an undismissed notice when a new one
/// arrives with the same `id`, and should swallow surface-level failures
/// gracefully rather than panic; this runs on the fault path.
pub trait Notifier: Send + Sync {
    /// Raises (or replaces) the crash notice.
    fn notify(&self, notice: &CrashNotice) -> anyhow::Result<()>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory notifiers used by the crate's own tests.

    use super::{CrashNotice, Notifier};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Notifier modelling a real surface: keyed by notice id, so a newer
    /// notice with the same id replaces the older one.
    #[derive(Clone, Default)]
    pub(crate) struct MemoryNotifier {
        inner: Arc<MemoryNotifierState>,
    }

    #[derive(Default)]
    struct MemoryNotifierState {
        active: Mutex<HashMap<u32, CrashNotice>>,
        raised: AtomicUsize,
    }

    impl MemoryNotifier {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Notices currently visible on the surface.
        pub(crate) fn active(&self) -> Vec<CrashNotice> {
            self.inner.active.lock().unwrap().values().cloned().collect()
        }

        /// Total notices raised, including replaced ones.
        pub(crate) fn raised_count(&self) -> usize {
            self.inner.raised.load(Ordering::SeqCst)
        }
    }

    impl Notifier for MemoryNotifier {
        fn notify(&self, notice: &CrashNotice) -> anyhow::Result<()> {
            self.inner.raised.fetch_add(1, Ordering::SeqCst);
            self.inner
                .active
                .lock()
                .unwrap()
                .insert(notice.id, notice.clone());
            Ok(())
        }
    }

    /// Notifier whose surface is permanently broken.
    #[derive(Clone, Default)]
    pub(crate) struct FailingNotifier {
        pub(crate) attempts: Arc<AtomicUsize>,
    }

    impl Notifier for FailingNotifier {
        fn notify(&self, _notice: &CrashNotice) -> anyhow::Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("notification daemon unreachable")
        }
    }
}
