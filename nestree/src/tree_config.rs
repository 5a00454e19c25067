//! Configuration for a [`NestedTree`](crate::nested_tree::NestedTree).

use crate::common::{atomic, Atomic, Guarded};
use crate::errors::{ErrorKind, TreeError, TreeResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Tree settings.
///
/// All setters fail with `InvalidOperation` once the tree owning this
/// configuration has been opened.
///
/// | setting              | default  |
/// |----------------------|----------|
/// | `lock_timeout`       | none (wait forever) |
/// | `retry_on_conflict`  | `true`   |
/// | `verify_after_write` | `false`  |
#[derive(Clone)]
pub struct TreeConfig {
    inner: Arc<TreeConfigInner>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeConfig {
    pub fn new() -> Self {
        TreeConfig {
            inner: Arc::new(TreeConfigInner::new()),
        }
    }

    /// How long a structural operation waits for the tree lock before
    /// failing with `ConcurrencyConflict`.
    pub fn lock_timeout(&self) -> Option<Duration> {
        self.inner.lock_timeout.read_with(|timeout| *timeout)
    }

    pub fn set_lock_timeout(&self, timeout: Duration) -> TreeResult<()> {
        self.inner.set_lock_timeout(timeout)
    }

    /// Whether a store conflict is retried once from a fresh read.
    pub fn retry_on_conflict(&self) -> bool {
        self.inner.retry_on_conflict.load(Ordering::Relaxed)
    }

    pub fn set_retry_on_conflict(&self, retry: bool) -> TreeResult<()> {
        self.inner.ensure_not_configured("retry on conflict")?;
        self.inner.retry_on_conflict.store(retry, Ordering::Relaxed);
        Ok(())
    }

    /// Whether every structural operation re-checks the whole tree before
    /// it commits. Expensive; meant for debugging and tests.
    pub fn verify_after_write(&self) -> bool {
        self.inner.verify_after_write.load(Ordering::Relaxed)
    }

    pub fn set_verify_after_write(&self, verify: bool) -> TreeResult<()> {
        self.inner.ensure_not_configured("verify after write")?;
        self.inner.verify_after_write.store(verify, Ordering::Relaxed);
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.inner.configured.load(Ordering::Relaxed)
    }

    pub(crate) fn freeze(&self) {
        self.inner.configured.store(true, Ordering::Relaxed);
    }
}

struct TreeConfigInner {
    configured: AtomicBool,
    lock_timeout: Atomic<Option<Duration>>,
    retry_on_conflict: AtomicBool,
    verify_after_write: AtomicBool,
}

impl TreeConfigInner {
    fn new() -> Self {
        TreeConfigInner {
            configured: AtomicBool::from(false),
            lock_timeout: atomic(None),
            retry_on_conflict: AtomicBool::from(true),
            verify_after_write: AtomicBool::from(false),
        }
    }

    fn ensure_not_configured(&self, setting: &str) -> TreeResult<()> {
        if self.configured.load(Ordering::Relaxed) {
            log::error!("{} cannot be changed after the tree is opened", setting);
            return Err(TreeError::new(
                &format!("{} cannot be changed after the tree is opened", setting),
                ErrorKind::InvalidOperation,
            ));
        }
        Ok(())
    }

    fn set_lock_timeout(&self, timeout: Duration) -> TreeResult<()> {
        self.ensure_not_configured("Lock timeout")?;
        if timeout.is_zero() {
            log::error!("Lock timeout cannot be zero");
            return Err(TreeError::new(
                "Lock timeout cannot be zero",
                ErrorKind::ValidationError,
            ));
        }
        self.lock_timeout.write_with(|it| *it = Some(timeout));
        Ok(())
    }
}
