//! The capture handle and its panic hook registration.
//!
//! [`CrashCapture`] is an explicit process-scoped handle built once at
//! startup; there is no hidden global accessor. Registration retains the
//! previously-installed panic hook and always delegates to it with the
//! original fault, and a process-wide flag rejects a second registration
//! outright, so a handle can never end up chained to itself.

use std::panic::{self, PanicHookInfo};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::dump::{CrashDir, DumpError};
use crate::notify::{CrashNotice, Notifier};
use crate::record::CrashRecord;
use crate::report::{CrashDetail, NullReporter, Reporter};
use crate::AppInfo;

/// One hook per process, ever. Set on the first successful [`CrashCapture::install`].
static HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Result type alias for capture operations.
pub type Result<T> = std::result::Result<T, CaptureError>;

/// Errors from building or installing a [`CrashCapture`].
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Application identity was not provided to the builder.
    #[error("application info is required")]
    MissingAppInfo,

    /// Crash directory was not provided to the builder.
    #[error("crash directory is required")]
    MissingCrashDir,

    /// The integrator did not decide what happens after delegation.
    #[error("fatal action is required: pass FatalAction::Unwind or FatalAction::Abort")]
    MissingFatalAction,

    /// The crash directory could not be created at startup.
    #[error("crash directory {path:?} is unusable")]
    CrashDirUnusable {
        /// Path that failed to create.
        path: PathBuf,
        #[source]
        source: DumpError,
    },

    /// A capture hook is already registered in this process.
    #[error("a crash capture hook is already installed in this process")]
    AlreadyInstalled,
}

/// What the installed hook does once the prior hook has run.
///
/// There is no default: whether the process must still die when every
/// chained hook has returned is an integrator decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalAction {
    /// Let the runtime continue its normal teardown (unwind or runtime
    /// abort, per the build's panic strategy).
    Unwind,
    /// Force process death, even if a later hook would have swallowed the
    /// fault. Guarantees the OS sees a crash.
    Abort,
}

/// Builder for a [`CrashCapture`] handle.
pub struct CrashCaptureBuilder {
    app: Option<AppInfo>,
    crash_dir: Option<PathBuf>,
    notify_on_crash: bool,
    notifier: Option<Box<dyn Notifier>>,
    reporter: Box<dyn Reporter>,
    fatal_action: Option<FatalAction>,
}

impl CrashCaptureBuilder {
    fn new() -> Self {
        Self {
            app: None,
            crash_dir: None,
            notify_on_crash: false,
            notifier: None,
            reporter: Box::new(NullReporter),
            fatal_action: None,
        }
    }

    /// Sets the application identity recorded in every capture.
    pub fn app(mut self, app: AppInfo) -> Self {
        self.app = Some(app);
        self
    }

    /// Sets the directory crash logs are written to.
    pub fn crash_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.crash_dir = Some(dir.into());
        self
    }

    /// Enables or disables the user-facing notice on capture. Off by
    /// default; toggleable at runtime via [`CrashCapture::set_notify_on_crash`].
    pub fn notify_on_crash(mut self, enabled: bool) -> Self {
        self.notify_on_crash = enabled;
        self
    }

    /// Sets the notification surface adapter.
    pub fn notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }

    /// Sets the reporting hook. Defaults to [`NullReporter`].
    pub fn reporter(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    /// Decides what happens after delegation to the prior hook. Required.
    pub fn fatal_action(mut self, action: FatalAction) -> Self {
        self.fatal_action = Some(action);
        self
    }

    /// Builds the handle.
    ///
    /// Creates the crash directory eagerly so a misconfigured path fails
    /// loudly here, at startup, instead of silently at fault time.
    pub fn build(self) -> Result<CrashCapture> {
        let app = self.app.ok_or(CaptureError::MissingAppInfo)?;
        let crash_dir = CrashDir::new(self.crash_dir.ok_or(CaptureError::MissingCrashDir)?);
        let fatal_action = self.fatal_action.ok_or(CaptureError::MissingFatalAction)?;

        crash_dir
            .create()
            .map_err(|source| CaptureError::CrashDirUnusable {
                path: crash_dir.root().to_path_buf(),
                source,
            })?;

        tracing::debug!(
            app = %app.name,
            crash_dir = %crash_dir.root().display(),
            ?fatal_action,
            "crash capture configured"
        );

        Ok(CrashCapture {
            inner: Arc::new(CaptureInner {
                app,
                crash_dir,
                notify_on_crash: AtomicBool::new(self.notify_on_crash),
                notifier: self.notifier,
                reporter: self.reporter,
                fatal_action,
            }),
        })
    }
}

struct CaptureInner {
    app: AppInfo,
    crash_dir: CrashDir,
    notify_on_crash: AtomicBool,
    notifier: Option<Box<dyn Notifier>>,
    reporter: Box<dyn Reporter>,
    fatal_action: FatalAction,
}

/// Process-scoped crash capture handle.
///
/// Cheap to clone; all clones share state, so a handle kept after
/// [`CrashCapture::install`] can still toggle the notification flag.
#[derive(Clone)]
pub struct CrashCapture {
    inner: Arc<CaptureInner>,
}

impl CrashCapture {
    /// Starts building a handle.
    pub fn builder() -> CrashCaptureBuilder {
        CrashCaptureBuilder::new()
    }

    /// Runtime toggle for the user-facing notice. No effect on file logging
    /// or reporting.
    pub fn set_notify_on_crash(&self, enabled: bool) {
        self.inner.notify_on_crash.store(enabled, Ordering::SeqCst);
    }

    /// Whether a capture currently raises a notice.
    pub fn notify_on_crash(&self) -> bool {
        self.inner.notify_on_crash.load(Ordering::SeqCst)
    }

    /// The post-delegation behavior this handle was built with.
    pub fn fatal_action(&self) -> FatalAction {
        self.inner.fatal_action
    }

    /// Registers this handle as the process panic hook.
    ///
    /// The previously-installed hook is retained and invoked after capture
    /// with the original fault info, unchanged; capture never masks the
    /// crash. A second install, from this or any other handle, is rejected
    /// with [`CaptureError::AlreadyInstalled`].
    pub fn install(&self) -> Result<()> {
        if HOOK_INSTALLED.swap(true, Ordering::SeqCst) {
            return Err(CaptureError::AlreadyInstalled);
        }

        let capture = self.clone();
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            capture.handle(info);
            previous(info);
            if capture.inner.fatal_action == FatalAction::Abort {
                process::abort();
            }
        }));

        tracing::info!("crash capture hook installed");
        Ok(())
    }

    /// Fault entry point: builds a record from the panic and runs the
    /// capture pipeline. Called by the installed hook on the panicking
    /// thread; callable directly for manual invocation.
    pub fn handle(&self, info: &PanicHookInfo<'_>) {
        let record = CrashRecord::from_panic(info, &self.inner.app);
        self.process(&record);
    }

    /// Captures a non-panic error through the same pipeline. The error's
    /// source chain becomes the record's cause.
    pub fn capture_error(&self, error: &(dyn std::error::Error + 'static)) {
        let record = CrashRecord::from_error(error, &self.inner.app);
        self.process(&record);
    }

    /// Runs the capture pipeline for a prebuilt record: dump, notify,
    /// report. Each step is isolated: a failure goes to stderr and the
    /// remaining steps still run. Never panics, never returns an error;
    /// this is terminal-path code and its only job is best-effort capture.
    pub fn process(&self, record: &CrashRecord) {
        if let Err(err) = self.inner.crash_dir.write(record) {
            eprintln!("crashtrap: failed to write crash log: {err}");
        }

        if self.notify_on_crash() {
            if let Some(notifier) = &self.inner.notifier {
                let notice = CrashNotice::from_record(record);
                if let Err(err) = notifier.notify(&notice) {
                    eprintln!("crashtrap: failed to raise crash notice: {err}");
                }
            }
        }

        let detail = CrashDetail::from_record(record);
        if let Err(err) = self.inner.reporter.report(&detail) {
            eprintln!("crashtrap: failed to report crash: {err}");
        }
    }
}
