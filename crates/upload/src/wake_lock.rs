//! Keeping the machine awake during an upload cycle.
//!
//! [`WakeLock`] abstracts the platform mechanism. [`WakeLockGuard`] owns the
//! held lock for one upload/poll cycle, tolerates acquisition failures and
//! re-acquires the lock when the client becomes visible again.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::WakeLockError;

/// Future returned by [`WakeLock::acquire`].
pub type AcquireFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Box<dyn HeldLock>, WakeLockError>> + Send + 'a>>;

/// A platform wake lock provider.
pub trait WakeLock: Send + Sync {
    /// Requests a new lock.
    fn acquire(&self) -> AcquireFuture<'_>;
}

/// A lock currently held; dropping it without release is allowed but may
/// leave the platform lock in place until the process exits.
pub trait HeldLock: Send {
    fn release(self: Box<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

/// Visibility of the client to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// Provider that always succeeds and does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWakeLock;

struct NoopHold;

impl HeldLock for NoopHold {
    fn release(self: Box<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async {})
    }
}

impl WakeLock for NoopWakeLock {
    fn acquire(&self) -> AcquireFuture<'_> {
        Box::pin(async { Ok(Box::new(NoopHold) as Box<dyn HeldLock>) })
    }
}

/// Provider backed by `systemd-inhibit`.
///
/// The lock is an inhibitor child process that blocks idle and sleep for as
/// long as it lives. Releasing the lock kills it. An inhibitor that exits
/// within the settle delay (e.g. denied by polkit) counts as unsupported.
#[derive(Debug, Clone)]
pub struct InhibitWakeLock {
    program: String,
    reason: String,
    settle: Duration,
}

impl Default for InhibitWakeLock {
    fn default() -> Self {
        Self {
            program: "systemd-inhibit".into(),
            reason: "Uploading dataset".into(),
            settle: Duration::from_millis(150),
        }
    }
}

impl InhibitWakeLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the inhibitor executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Sets how long the inhibitor must stay alive to count as held.
    pub fn with_settle_delay(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }
}

struct InhibitHold {
    child: Child,
}

impl HeldLock for InhibitHold {
    fn release(mut self: Box<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            if let Err(e) = self.child.kill().await {
                warn!(error = %e, "failed to stop inhibitor");
            }
        })
    }
}

impl WakeLock for InhibitWakeLock {
    fn acquire(&self) -> AcquireFuture<'_> {
        Box::pin(async move {
            let why = format!("--why={}", self.reason);
            let mut child = Command::new(&self.program)
                .args(["--what=idle:sleep", "--who=datadrop", why.as_str()])
                .args(["--mode=block", "sleep", "infinity"])
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn()?;

            tokio::time::sleep(self.settle).await;
            if let Some(status) = child.try_wait()? {
                return Err(WakeLockError::Unsupported(format!(
                    "{} exited early ({status})",
                    self.program
                )));
            }

            debug!(pid = ?child.id(), "inhibitor started");
            Ok(Box::new(InhibitHold { child }) as Box<dyn HeldLock>)
        })
    }
}

// ---------------------------------------------------------------------------
// Guard
// ---------------------------------------------------------------------------

struct Shared {
    provider: Arc<dyn WakeLock>,
    held: Mutex<Option<Box<dyn HeldLock>>>,
    /// Set between `acquire` and `release`, whether or not a lock is held.
    wanted: AtomicBool,
}

impl Shared {
    /// Acquires a fresh lock, releasing any previous one afterwards.
    async fn acquire_now(&self) {
        let mut held = self.held.lock().await;
        if !self.wanted.load(Ordering::SeqCst) {
            return;
        }
        match self.provider.acquire().await {
            Ok(lock) => {
                if let Some(previous) = held.replace(lock) {
                    previous.release().await;
                }
                debug!("wake lock acquired");
            }
            Err(e) => warn!(error = %e, "wake lock unavailable, continuing without it"),
        }
    }
}

/// Owns the wake lock for one upload cycle.
pub struct WakeLockGuard {
    shared: Arc<Shared>,
    watcher: Option<JoinHandle<()>>,
}

impl WakeLockGuard {
    pub fn new(provider: Arc<dyn WakeLock>) -> Self {
        Self {
            shared: Arc::new(Shared {
                provider,
                held: Mutex::new(None),
                wanted: AtomicBool::new(false),
            }),
            watcher: None,
        }
    }

    /// Guard that never holds a platform lock.
    pub fn noop() -> Self {
        Self::new(Arc::new(NoopWakeLock))
    }

    /// Re-acquires the lock whenever visibility goes from hidden to visible
    /// while the lock is wanted.
    pub fn watch_visibility(&mut self, mut visibility: watch::Receiver<Visibility>) {
        if let Some(handle) = self.watcher.take() {
            handle.abort();
        }
        let shared = Arc::clone(&self.shared);
        self.watcher = Some(tokio::spawn(async move {
            let mut last = *visibility.borrow_and_update();
            while visibility.changed().await.is_ok() {
                let now = *visibility.borrow_and_update();
                if last == Visibility::Hidden
                    && now == Visibility::Visible
                    && shared.wanted.load(Ordering::SeqCst)
                {
                    debug!("visible again, re-acquiring wake lock");
                    shared.acquire_now().await;
                }
                last = now;
            }
        }));
    }

    /// Acquires the lock. Failure is logged and otherwise ignored.
    pub async fn acquire(&self) {
        self.shared.wanted.store(true, Ordering::SeqCst);
        self.shared.acquire_now().await;
    }

    /// Releases the lock. Releasing a released or never-acquired lock is a
    /// no-op.
    pub async fn release(&self) {
        self.shared.wanted.store(false, Ordering::SeqCst);
        let lock = self.shared.held.lock().await.take();
        if let Some(lock) = lock {
            lock.release().await;
            debug!("wake lock released");
        }
    }

    /// Returns `true` while a platform lock is held.
    pub async fn is_held(&self) -> bool {
        self.shared.held.lock().await.is_some()
    }
}

impl Drop for WakeLockGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.watcher.take() {
            handle.abort();
        }
    }
}
