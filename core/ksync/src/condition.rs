//! A condition variable built from a raw lock and a queue of waiter tokens.

use core::{fmt, time::Duration};
use std::{collections::VecDeque, sync::Arc};

use klock::{EventLock, HostPlatform, RawLock, SyncPlatform};

use crate::{
    deadline::{Budget, Deadline},
    error::{SyncResult, sync_err},
};

/// A condition variable.
///
/// Wraps one [`RawLock`] and keeps a FIFO queue of waiter tokens. Every
/// [`wait`](Self::wait) allocates a private token from the platform, takes
/// it, queues it, and then blocks trying to take it a second time;
/// [`notify`](Self::notify) pops tokens from the front of the queue and
/// releases them. Waiters are therefore woken strictly in arrival order.
///
/// [`wait`](Self::wait), [`wait_for`](Self::wait_for),
/// [`notify`](Self::notify) and [`notify_all`](Self::notify_all) must be
/// called with the lock held, either through the raw
/// [`acquire`](Self::acquire)/[`release`](Self::release) pair or through a
/// [`ConditionGuard`] returned by [`lock`](Self::lock). The raw calls check
/// the lock state and fail with [`SyncError::LockState`] when it is free.
///
/// Ownership is checked the way the underlying lock allows: the lock must
/// be held, but a binary lock cannot tell which worker holds it.
///
/// [`SyncError::LockState`]: crate::SyncError::LockState
pub struct Condition<P: SyncPlatform = HostPlatform> {
    platform: P,
    lock: Arc<P::Lock>,
    // Only touched while `lock` is held, so this spin lock never contends.
    waiters: spin::Mutex<VecDeque<Arc<P::Lock>>>,
}

impl Condition {
    /// Creates a condition variable with a freshly allocated lock.
    pub fn new() -> Self {
        Self::with_platform(HostPlatform)
    }

    /// Creates a condition variable over an existing lock.
    ///
    /// The lock may be shared with code outside the condition; whoever
    /// holds it may wait on and notify this condition.
    pub fn with_lock(lock: Arc<EventLock>) -> Self {
        Self::with_platform_lock(HostPlatform, lock)
    }
}

impl Default for Condition {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: SyncPlatform> Condition<P> {
    /// Creates a condition variable on `platform` with a freshly allocated lock.
    pub fn with_platform(platform: P) -> Self {
        let lock = Arc::new(platform.allocate_lock());
        Self::with_platform_lock(platform, lock)
    }

    /// Creates a condition variable on `platform` over an existing lock.
    pub fn with_platform_lock(platform: P, lock: Arc<P::Lock>) -> Self {
        log::debug!("new condition over lock {:p}", Arc::as_ptr(&lock));
        Self {
            platform,
            lock,
            waiters: spin::Mutex::new(VecDeque::new()),
        }
    }

    /// The platform this condition allocates tokens and reads time from.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// The underlying lock.
    pub fn raw_lock(&self) -> &Arc<P::Lock> {
        &self.lock
    }

    /// Returns `true` if the underlying lock is held.
    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    /// Number of workers currently queued in [`wait`](Self::wait).
    ///
    /// Only stable while the lock is held.
    pub fn waiter_count(&self) -> usize {
        self.waiters.lock().len()
    }

    /// Acquires the underlying lock, blocking until it is free.
    pub fn acquire(&self) {
        self.lock.acquire();
    }

    /// Acquires the underlying lock if it is free.
    pub fn try_acquire(&self) -> bool {
        self.lock.try_acquire()
    }

    /// Acquires the underlying lock, blocking for at most `timeout`.
    pub fn acquire_timeout(&self, timeout: Duration) -> bool {
        self.lock.acquire_timeout(timeout)
    }

    /// Releases the underlying lock.
    ///
    /// Fails with [`SyncError::LockState`](crate::SyncError::LockState) if
    /// the lock is not held.
    ///
    /// Do not use this to release a lock taken through [`lock`](Self::lock):
    /// the guard would release it a second time on drop and panic. Call
    /// [`ConditionGuard::leak`] first to hand the lock over to the raw API.
    pub fn release(&self) -> SyncResult {
        self.ensure_owned("release")?;
        self.lock.release();
        Ok(())
    }

    /// Acquires the underlying lock and returns a guard that releases it.
    pub fn lock(&self) -> ConditionGuard<'_, P> {
        self.lock.acquire();
        ConditionGuard { cond: self }
    }

    /// Acquires the underlying lock if it is free.
    pub fn try_lock(&self) -> Option<ConditionGuard<'_, P>> {
        self.lock
            .try_acquire()
            .then(|| ConditionGuard { cond: self })
    }

    /// Acquires the underlying lock, blocking for at most `timeout`.
    pub fn lock_timeout(&self, timeout: Duration) -> Option<ConditionGuard<'_, P>> {
        self.lock
            .acquire_timeout(timeout)
            .then(|| ConditionGuard { cond: self })
    }

    /// Waits until notified or until `timeout` expires.
    ///
    /// Releases the lock while blocked and re-acquires it before returning,
    /// whatever the outcome. Re-acquisition is not bounded by `timeout`.
    ///
    /// Returns `Ok(true)` if woken by a notification, `Ok(false)` on timeout.
    /// A zero timeout only polls.
    pub fn wait(&self, timeout: Option<Duration>) -> SyncResult<bool> {
        self.ensure_owned("wait")?;
        Ok(self.wait_owned(timeout))
    }

    /// Waits until `predicate` returns `true` or `timeout` expires.
    ///
    /// `predicate` is evaluated with the lock held, first on entry and again
    /// after every wake, so a wake that did not change the awaited state
    /// sends the caller back to waiting. All retries share one deadline
    /// fixed by the first wait.
    ///
    /// Returns the last value of `predicate`.
    pub fn wait_for<F>(&self, predicate: F, timeout: Option<Duration>) -> SyncResult<bool>
    where
        F: FnMut() -> bool,
    {
        self.ensure_owned("wait")?;
        Ok(self.wait_for_owned(predicate, timeout))
    }

    /// Wakes up to `n` waiters, oldest first.
    ///
    /// The lock stays held by the caller; woken waiters proceed once it is
    /// released. A no-op if nobody is waiting.
    pub fn notify(&self, n: usize) -> SyncResult {
        self.ensure_owned("notify")?;
        self.notify_owned(n);
        Ok(())
    }

    /// Wakes every waiter currently queued.
    pub fn notify_all(&self) -> SyncResult {
        self.ensure_owned("notify")?;
        self.notify_owned(usize::MAX);
        Ok(())
    }

    fn ensure_owned(&self, op: &'static str) -> SyncResult {
        if self.lock.is_locked() {
            Ok(())
        } else {
            sync_err!(LockState, op)
        }
    }

    /// The wait protocol. The caller holds `lock`.
    pub(crate) fn wait_owned(&self, timeout: Option<Duration>) -> bool {
        let token = Arc::new(self.platform.allocate_lock());
        token.acquire();
        let queued = {
            let mut waiters = self.waiters.lock();
            waiters.push_back(token.clone());
            waiters.len()
        };
        log::trace!(
            "condition {:p}: waiting ({} queued, timeout {:?})",
            self,
            queued,
            timeout
        );

        self.lock.release();
        let woken = match timeout {
            None => {
                token.acquire();
                true
            }
            Some(timeout) if timeout.is_zero() => token.try_acquire(),
            Some(timeout) => token.acquire_timeout(timeout),
        };
        self.lock.acquire();

        if !woken {
            // A racing notify may already have popped the token.
            let removed = self.remove_waiter(&token);
            log::trace!(
                "condition {:p}: wait timed out (token {})",
                self,
                if removed { "withdrawn" } else { "already consumed" }
            );
        }
        woken
    }

    /// The retry loop of [`wait_for`](Self::wait_for). The caller holds `lock`.
    pub(crate) fn wait_for_owned<F>(&self, mut predicate: F, timeout: Option<Duration>) -> bool
    where
        F: FnMut() -> bool,
    {
        let mut deadline = Deadline::new(&self.platform, timeout);
        let mut result = predicate();
        while !result {
            match deadline.next_wait() {
                Budget::Expired => break,
                budget => {
                    self.wait_owned(budget.timeout());
                }
            }
            result = predicate();
        }
        result
    }

    /// Pops and releases up to `n` tokens. The caller holds `lock`.
    pub(crate) fn notify_owned(&self, n: usize) {
        let mut waiters = self.waiters.lock();
        let count = n.min(waiters.len());
        if count == 0 {
            return;
        }
        for token in waiters.drain(..count) {
            token.release();
        }
        log::trace!(
            "condition {:p}: notified {} ({} still queued)",
            self,
            count,
            waiters.len()
        );
    }

    fn remove_waiter(&self, token: &Arc<P::Lock>) -> bool {
        let mut waiters = self.waiters.lock();
        match waiters.iter().position(|w| Arc::ptr_eq(w, token)) {
            Some(idx) => {
                waiters.remove(idx);
                true
            }
            None => false,
        }
    }
}

impl<P: SyncPlatform> fmt::Debug for Condition<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("locked", &self.lock.is_locked())
            .field("waiters", &self.waiter_count())
            .finish()
    }
}

/// RAII guard holding a [`Condition`]'s lock.
///
/// The lock is released when the guard is dropped. Since the guard proves
/// ownership, its operations cannot fail.
///
/// The guard and the raw [`Condition::acquire`]/[`Condition::release`]
/// pair must not be mixed on the same acquisition; use
/// [`leak`](Self::leak) to switch from the guard to the raw API.
#[must_use = "if unused the lock will immediately be released"]
pub struct ConditionGuard<'a, P: SyncPlatform = HostPlatform> {
    cond: &'a Condition<P>,
}

impl<'a, P: SyncPlatform> ConditionGuard<'a, P> {
    /// Consumes the guard without releasing the lock.
    ///
    /// The lock stays held; the caller must release it with
    /// [`Condition::release`].
    pub fn leak(self) -> &'a Condition<P> {
        let cond = self.cond;
        core::mem::forget(self);
        cond
    }

    /// See [`Condition::wait`].
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        self.cond.wait_owned(timeout)
    }

    /// See [`Condition::wait_for`].
    pub fn wait_for<F>(&self, predicate: F, timeout: Option<Duration>) -> bool
    where
        F: FnMut() -> bool,
    {
        self.cond.wait_for_owned(predicate, timeout)
    }

    /// See [`Condition::notify`].
    pub fn notify(&self, n: usize) {
        self.cond.notify_owned(n);
    }

    /// See [`Condition::notify_all`].
    pub fn notify_all(&self) {
        self.cond.notify_owned(usize::MAX);
    }

    /// Number of queued waiters.
    pub fn waiter_count(&self) -> usize {
        self.cond.waiter_count()
    }
}

impl<P: SyncPlatform> Drop for ConditionGuard<'_, P> {
    fn drop(&mut self) {
        self.cond.lock.release();
    }
}
