//! A counting semaphore implementation.

use core::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use klock::{HostPlatform, SyncPlatform};

use crate::{
    Condition,
    deadline::{Budget, Deadline},
    error::{SyncResult, sync_err},
};

/// A counting semaphore.
///
/// Holds a number of permits. [`acquire`](Self::acquire) takes one,
/// blocking while none are left; [`release`](Self::release) returns one
/// and wakes a single blocked acquirer. The count never goes negative.
pub struct Semaphore<P: SyncPlatform = HostPlatform> {
    cond: Condition<P>,
    // Written only with `cond`'s lock held.
    count: AtomicUsize,
}

impl Semaphore {
    /// Creates a new semaphore with `permits` initial permits.
    ///
    /// Fails with [`SyncError::InvalidArgument`](crate::SyncError::InvalidArgument)
    /// if `permits` is negative.
    pub fn new(permits: isize) -> SyncResult<Self> {
        Self::with_platform(HostPlatform, permits)
    }
}

impl<P: SyncPlatform> Semaphore<P> {
    /// Creates a new semaphore on `platform` with `permits` initial permits.
    pub fn with_platform(platform: P, permits: isize) -> SyncResult<Self> {
        let Ok(permits) = usize::try_from(permits) else {
            return sync_err!(InvalidArgument, "semaphore initial value must be >= 0");
        };
        log::debug!("new semaphore with {} permits", permits);
        Ok(Self {
            cond: Condition::with_platform(platform),
            count: AtomicUsize::new(permits),
        })
    }

    /// Acquires a permit.
    ///
    /// - `blocking == false`: takes a permit if one is available and
    ///   returns `Ok(false)` otherwise. A timeout is rejected with
    ///   [`SyncError::InvalidArgument`](crate::SyncError::InvalidArgument).
    /// - `blocking == true`, `timeout == None`: blocks until a permit is
    ///   available; always `Ok(true)`.
    /// - `blocking == true`, `timeout == Some(t)`: blocks for at most `t` in
    ///   total, however many times the worker is woken, and returns
    ///   `Ok(false)` if no permit became available.
    pub fn acquire(&self, blocking: bool, timeout: Option<Duration>) -> SyncResult<bool> {
        if !blocking && timeout.is_some() {
            return sync_err!(InvalidArgument, "can't specify timeout for non-blocking acquire");
        }

        let guard = self.cond.lock();
        let mut deadline = Deadline::new(self.cond.platform(), timeout);
        while self.count.load(Ordering::Relaxed) == 0 {
            if !blocking {
                return Ok(false);
            }
            match deadline.next_wait() {
                Budget::Expired => {
                    log::trace!("semaphore {:p}: acquire timed out", self);
                    return Ok(false);
                }
                budget => {
                    guard.wait(budget.timeout());
                }
            }
        }
        self.count.fetch_sub(1, Ordering::Relaxed);
        Ok(true)
    }

    /// Tries to acquire a permit without blocking.
    ///
    /// Returns `true` if a permit was acquired, `false` otherwise.
    pub fn try_acquire(&self) -> bool {
        matches!(self.acquire(false, None), Ok(true))
    }

    /// Acquires a permit, blocking for at most `timeout`.
    ///
    /// Returns `true` if a permit was acquired, `false` on timeout.
    pub fn acquire_timeout(&self, timeout: Duration) -> bool {
        matches!(self.acquire(true, Some(timeout)), Ok(true))
    }

    /// Acquires a permit and returns a guard.
    ///
    /// Blocks until a permit is available. The permit is automatically
    /// released when the guard is dropped.
    pub fn acquire_guard(&self) -> SemaphoreGuard<'_, P> {
        let guard = self.cond.lock();
        guard.wait_for(|| self.count.load(Ordering::Relaxed) > 0, None);
        self.count.fetch_sub(1, Ordering::Relaxed);
        SemaphoreGuard { sem: self }
    }

    /// Releases a permit and wakes one blocked acquirer.
    ///
    /// Note: This method allows releasing more permits than the semaphore was
    /// initialized with. Callers are responsible for ensuring balanced acquire/release.
    pub fn release(&self) {
        let guard = self.cond.lock();
        self.count.fetch_add(1, Ordering::Relaxed);
        guard.notify(1);
    }

    /// Returns the current number of available permits.
    pub fn available_permits(&self) -> usize {
        let _guard = self.cond.lock();
        self.count.load(Ordering::Relaxed)
    }
}

impl<P: SyncPlatform> fmt::Debug for Semaphore<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Semaphore")
            .field("permits", &self.count.load(Ordering::Relaxed))
            .field("waiters", &self.cond.waiter_count())
            .finish()
    }
}

/// RAII guard for a semaphore permit.
///
/// The permit is automatically released when the guard is dropped.
#[must_use = "if unused the permit will immediately be released"]
pub struct SemaphoreGuard<'a, P: SyncPlatform = HostPlatform> {
    sem: &'a Semaphore<P>,
}

impl<P: SyncPlatform> Drop for SemaphoreGuard<'_, P> {
    fn drop(&mut self) {
        self.sem.release();
    }
}
