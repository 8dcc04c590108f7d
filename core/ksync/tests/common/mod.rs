//! Shared helpers for the integration tests.

#![allow(dead_code)]

use core::{
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    time::Duration,
};
use std::{
    sync::Arc,
    thread,
    time::Instant,
};

use ksync::lock::{EventLock, HostPlatform, Mutex, RawLock, SyncPlatform};

/// Polls `f` until it holds, panicking after a generous limit.
pub fn wait_until(mut f: impl FnMut() -> bool) {
    let start = Instant::now();
    while !f() {
        assert!(
            start.elapsed() < Duration::from_secs(10),
            "condition not reached in time"
        );
        thread::sleep(Duration::from_millis(1));
    }
}

/// Randomly yields to shake out interleavings.
pub fn may_interrupt() {
    if fastrand::u8(0..3) == 0 {
        thread::yield_now();
    }
}

struct SimState {
    clock_ns: AtomicU64,
    step: Option<Duration>,
    timed_waits: Mutex<Vec<Duration>>,
}

/// A platform with a simulated clock.
///
/// Timed acquisitions that cannot succeed immediately do not sleep: they
/// advance the clock (by the whole timeout, or by at most `step`) and
/// report expiry. Every such acquisition is recorded.
#[derive(Clone)]
pub struct SimPlatform {
    state: Arc<SimState>,
}

impl SimPlatform {
    /// Every timed wait consumes its whole budget.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Every timed wait advances the clock by at most `step`.
    pub fn with_step(step: Duration) -> Self {
        Self::build(Some(step))
    }

    fn build(step: Option<Duration>) -> Self {
        Self {
            state: Arc::new(SimState {
                clock_ns: AtomicU64::new(0),
                step,
                timed_waits: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn advance(&self, d: Duration) {
        self.state
            .clock_ns
            .fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Timeouts passed to expired timed acquisitions, in order.
    pub fn timed_waits(&self) -> Vec<Duration> {
        self.state.timed_waits.lock().clone()
    }
}

pub struct SimLock {
    lock: EventLock,
    platform: SimPlatform,
}

impl RawLock for SimLock {
    fn acquire(&self) {
        self.lock.acquire();
    }

    fn try_acquire(&self) -> bool {
        self.lock.try_acquire()
    }

    fn acquire_timeout(&self, timeout: Duration) -> bool {
        if self.lock.try_acquire() {
            return true;
        }
        self.platform.state.timed_waits.lock().push(timeout);
        let elapsed = match self.platform.state.step {
            Some(step) => step.min(timeout),
            None => timeout,
        };
        self.platform.advance(elapsed);
        false
    }

    fn release(&self) {
        self.lock.release();
    }

    fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }
}

impl SyncPlatform for SimPlatform {
    type Lock = SimLock;

    fn allocate_lock(&self) -> SimLock {
        SimLock {
            lock: EventLock::new(),
            platform: self.clone(),
        }
    }

    fn now(&self) -> Duration {
        Duration::from_nanos(self.state.clock_ns.load(Ordering::SeqCst))
    }
}

/// A platform whose timed acquisitions block until [`open`](Self::open) is
/// called and then report expiry, whether or not the lock was released in
/// the meantime.
///
/// Lets a test release a waiter's token and then time the waiter out,
/// in that order.
#[derive(Clone, Default)]
pub struct GatedPlatform {
    gate: Arc<AtomicBool>,
}

impl GatedPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lets every pending and future timed acquisition expire.
    pub fn open(&self) {
        self.gate.store(true, Ordering::SeqCst);
    }
}

pub struct GatedLock {
    lock: EventLock,
    gate: Arc<AtomicBool>,
}

impl RawLock for GatedLock {
    fn acquire(&self) {
        self.lock.acquire();
    }

    fn try_acquire(&self) -> bool {
        self.lock.try_acquire()
    }

    fn acquire_timeout(&self, _timeout: Duration) -> bool {
        wait_until(|| self.gate.load(Ordering::SeqCst));
        false
    }

    fn release(&self) {
        self.lock.release();
    }

    fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }
}

impl SyncPlatform for GatedPlatform {
    type Lock = GatedLock;

    fn allocate_lock(&self) -> GatedLock {
        GatedLock {
            lock: EventLock::new(),
            gate: self.gate.clone(),
        }
    }

    fn now(&self) -> Duration {
        HostPlatform.now()
    }
}
