//! A resettable event flag.

use core::{
    fmt,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use klock::{HostPlatform, SyncPlatform};

use crate::Condition;

/// An event flag.
///
/// The flag starts cleared. [`set`](Self::set) raises it and wakes every
/// waiter; until the next [`clear`](Self::clear), [`wait`](Self::wait)
/// returns `true` without blocking.
pub struct Event<P: SyncPlatform = HostPlatform> {
    cond: Condition<P>,
    // Written only with `cond`'s lock held.
    flag: AtomicBool,
}

impl Event {
    /// Creates a cleared event.
    pub fn new() -> Self {
        Self::with_platform(HostPlatform)
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: SyncPlatform> Event<P> {
    /// Creates a cleared event on `platform`.
    pub fn with_platform(platform: P) -> Self {
        Self {
            cond: Condition::with_platform(platform),
            flag: AtomicBool::new(false),
        }
    }

    /// Returns `true` if the flag is raised.
    pub fn is_set(&self) -> bool {
        let _guard = self.cond.lock();
        self.flag.load(Ordering::Relaxed)
    }

    /// Number of workers currently blocked in [`wait`](Self::wait).
    pub fn waiter_count(&self) -> usize {
        self.cond.waiter_count()
    }

    /// Raises the flag and wakes every waiter.
    pub fn set(&self) {
        let guard = self.cond.lock();
        self.flag.store(true, Ordering::Relaxed);
        guard.notify_all();
    }

    /// Lowers the flag. Later calls to [`wait`](Self::wait) block again.
    pub fn clear(&self) {
        let _guard = self.cond.lock();
        self.flag.store(false, Ordering::Relaxed);
    }

    /// Blocks until the flag is raised or `timeout` expires.
    ///
    /// Returns at once if the flag is already raised. Otherwise this waits
    /// exactly once, without retrying against a shrinking deadline, and
    /// returns the flag as observed after that wait. A `false` result means
    /// the wait timed out with the flag still lowered; retrying is left to
    /// the caller.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let guard = self.cond.lock();
        if self.flag.load(Ordering::Relaxed) {
            return true;
        }
        guard.wait(timeout);
        self.flag.load(Ordering::Relaxed)
    }
}

impl<P: SyncPlatform> fmt::Debug for Event<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("set", &self.flag.load(Ordering::Relaxed))
            .field("waiters", &self.waiter_count())
            .finish()
    }
}
