//! The lock contract and the platform that provides locks and time.

use core::time::Duration;
use std::time::Instant;

use spin::Lazy;

use crate::EventLock;

/// A non-reentrant binary lock.
///
/// State is either free or held. Ownership is not tied to a worker: a lock
/// acquired by one worker may be released by another. Acquiring a lock the
/// caller already holds blocks until someone else releases it.
pub trait RawLock: Send + Sync {
    /// Blocks until the lock is acquired.
    fn acquire(&self);

    /// Acquires the lock if it is free. Never blocks.
    fn try_acquire(&self) -> bool;

    /// Blocks for at most `timeout` trying to acquire the lock.
    ///
    /// Returns `false` if the timeout expired first.
    fn acquire_timeout(&self, timeout: Duration) -> bool;

    /// Frees the lock and wakes at most one blocked acquirer.
    ///
    /// The lock must be held. Implementations may panic otherwise.
    fn release(&self);

    /// Returns `true` if the lock is currently held.
    ///
    /// The result may be stale as soon as it is returned.
    fn is_locked(&self) -> bool;
}

/// The hosting environment as seen by the synchronization core.
///
/// Supplies fresh locks (the waiter protocol allocates one per wait call)
/// and a monotonic clock for deadline arithmetic.
pub trait SyncPlatform: Send + Sync {
    /// The lock type handed out by [`allocate_lock`](Self::allocate_lock).
    type Lock: RawLock;

    /// Returns a new lock in the free state.
    fn allocate_lock(&self) -> Self::Lock;

    /// Monotonic time elapsed since an arbitrary, fixed epoch.
    fn now(&self) -> Duration;
}

static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// The default platform: [`EventLock`]s and the host's monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostPlatform;

impl SyncPlatform for HostPlatform {
    type Lock = EventLock;

    #[inline]
    fn allocate_lock(&self) -> EventLock {
        EventLock::new()
    }

    #[inline]
    fn now(&self) -> Duration {
        EPOCH.elapsed()
    }
}
