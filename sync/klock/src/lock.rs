//! The default raw lock implementation.

#[cfg(feature = "stats")]
use core::sync::atomic::AtomicU64;
use core::{
    fmt,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};
use std::time::Instant;

use event_listener::{Event, Listener};

use crate::{
    RawLock,
    util::{Spin, SpinConfig},
};

/// Statistics for lock operations (available with `stats` feature).
#[cfg(feature = "stats")]
#[derive(Debug, Default)]
pub struct LockStats {
    /// Total number of successful acquisitions
    pub total_acquires: AtomicU64,
    /// Total number of spin iterations
    pub total_spins: AtomicU64,
    /// Total number of times a worker parked
    pub total_blocks: AtomicU64,
    /// Total number of timed acquisitions that expired
    pub total_timeouts: AtomicU64,
}

/// A [`RawLock`] that parks contending workers on an [`Event`].
///
/// A contended acquisition spins according to its [`SpinConfig`], then
/// registers a listener and sleeps until a release notifies it. Release
/// notifies a single listener, so at most one parked worker wakes per
/// release.
pub struct EventLock {
    locked: AtomicBool,
    event: Event,
    config: SpinConfig,
    #[cfg(feature = "stats")]
    stats: LockStats,
}

impl EventLock {
    /// Creates a free [`EventLock`] with default spin configuration.
    #[inline(always)]
    pub const fn new() -> Self {
        Self::with_config(SpinConfig::DEFAULT)
    }

    /// Creates a free [`EventLock`] with custom spin configuration.
    #[inline(always)]
    pub const fn with_config(config: SpinConfig) -> Self {
        Self {
            locked: AtomicBool::new(false),
            event: Event::new(),
            config,
            #[cfg(feature = "stats")]
            stats: LockStats {
                total_acquires: AtomicU64::new(0),
                total_spins: AtomicU64::new(0),
                total_blocks: AtomicU64::new(0),
                total_timeouts: AtomicU64::new(0),
            },
        }
    }

    /// Returns the spin configuration of this lock.
    pub const fn config(&self) -> SpinConfig {
        self.config
    }

    /// Gets the lock statistics (only available with `stats` feature).
    ///
    /// Returns `(total_acquires, total_spins, total_blocks, total_timeouts)`.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> (u64, u64, u64, u64) {
        (
            self.stats.total_acquires.load(Ordering::Relaxed),
            self.stats.total_spins.load(Ordering::Relaxed),
            self.stats.total_blocks.load(Ordering::Relaxed),
            self.stats.total_timeouts.load(Ordering::Relaxed),
        )
    }

    /// Resets all statistics counters (only available with `stats` feature).
    ///
    /// Note: counters are reset independently, so a reset racing with lock
    /// traffic may leave them mutually inconsistent.
    #[cfg(feature = "stats")]
    pub fn reset_stats(&self) {
        self.stats.total_acquires.store(0, Ordering::Relaxed);
        self.stats.total_spins.store(0, Ordering::Relaxed);
        self.stats.total_blocks.store(0, Ordering::Relaxed);
        self.stats.total_timeouts.store(0, Ordering::Relaxed);
    }

    #[inline(always)]
    fn try_lock_fast(&self) -> bool {
        // The reason for using a strong compare_exchange is explained here:
        // https://github.com/Amanieu/parking_lot/pull/207#issuecomment-575869107
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    #[inline(always)]
    #[allow(unused_variables)]
    fn on_acquired(&self, spin: &Spin) {
        #[cfg(feature = "stats")]
        {
            self.stats.total_acquires.fetch_add(1, Ordering::Relaxed);
            self.stats
                .total_spins
                .fetch_add(spin.count() as u64, Ordering::Relaxed);
        }
    }

    /// Acquires the lock, parking until `deadline` if one is given.
    ///
    /// Returns `false` only when the deadline passed without the lock
    /// becoming available.
    fn lock_slow(&self, deadline: Option<Instant>) -> bool {
        let mut spin = Spin::new(self.config);

        loop {
            if self.try_lock_fast() {
                self.on_acquired(&spin);
                return true;
            }

            if spin.spin() {
                continue;
            }

            #[cfg(feature = "stats")]
            self.stats.total_blocks.fetch_add(1, Ordering::Relaxed);

            let listener = self.event.listen();

            // A release may have happened before the listener was registered.
            if self.try_lock_fast() {
                self.on_acquired(&spin);
                return true;
            }

            match deadline {
                None => listener.wait(),
                Some(deadline) => {
                    if listener.wait_deadline(deadline).is_none() {
                        let acquired = self.try_lock_fast();
                        if acquired {
                            self.on_acquired(&spin);
                        } else {
                            #[cfg(feature = "stats")]
                            self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
                            log::trace!("EventLock {:p}: timed acquire expired", self);
                        }
                        return acquired;
                    }
                }
            }
        }
    }

    #[inline(always)]
    fn unlock_inner(&self) {
        let was_locked = self.locked.swap(false, Ordering::Release);
        assert!(was_locked, "tried to release an EventLock that is not held");
        self.event.notify(1);
    }
}

impl Default for EventLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLock")
            .field("locked", &self.locked.load(Ordering::Relaxed))
            .field("config", &self.config)
            .finish()
    }
}

impl RawLock for EventLock {
    #[inline]
    fn acquire(&self) {
        self.lock_slow(None);
    }

    #[inline]
    fn try_acquire(&self) -> bool {
        let acquired = self.try_lock_fast();
        #[cfg(feature = "stats")]
        {
            if acquired {
                self.stats.total_acquires.fetch_add(1, Ordering::Relaxed);
            }
        }
        acquired
    }

    fn acquire_timeout(&self, timeout: Duration) -> bool {
        if timeout.is_zero() {
            return self.try_acquire();
        }
        // An unrepresentable deadline is as good as no deadline.
        self.lock_slow(Instant::now().checked_add(timeout))
    }

    #[inline]
    fn release(&self) {
        self.unlock_inner();
    }

    #[inline]
    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

unsafe impl lock_api::RawMutex for EventLock {
    type GuardMarker = lock_api::GuardSend;

    /// Initial value for an unlocked mutex.
    ///
    /// A “non-constant” const item is a legacy way to supply an initialized
    /// value to downstream static items. Can hopefully be replaced with
    /// `const fn new() -> Self` at some point.
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = EventLock::new();

    #[inline(always)]
    fn lock(&self) {
        self.lock_slow(None);
    }

    #[inline(always)]
    fn try_lock(&self) -> bool {
        RawLock::try_acquire(self)
    }

    #[inline(always)]
    unsafe fn unlock(&self) {
        self.unlock_inner();
    }

    #[inline(always)]
    fn is_locked(&self) -> bool {
        RawLock::is_locked(self)
    }
}

unsafe impl lock_api::RawMutexTimed for EventLock {
    type Duration = Duration;
    type Instant = Instant;

    #[inline]
    fn try_lock_for(&self, timeout: Duration) -> bool {
        RawLock::acquire_timeout(self, timeout)
    }

    #[inline]
    fn try_lock_until(&self, timeout: Instant) -> bool {
        self.lock_slow(Some(timeout))
    }
}

/// An alias of [`lock_api::Mutex`] over [`EventLock`].
pub type Mutex<T> = lock_api::Mutex<EventLock, T>;
/// An alias of [`lock_api::MutexGuard`] over [`EventLock`].
pub type MutexGuard<'a, T> = lock_api::MutexGuard<'a, EventLock, T>;
