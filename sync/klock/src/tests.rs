//! Test suite for klock

use core::time::Duration;
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
        mpsc::channel,
    },
    thread,
    time::Instant,
};

use super::*;

fn may_interrupt() {
    // simulate preemption
    if fastrand::u8(0..3) == 0 {
        thread::yield_now();
    }
}

#[test]
fn smoke() {
    let lock = EventLock::new();
    assert!(!lock.is_locked());
    lock.acquire();
    assert!(lock.is_locked());
    lock.release();
    assert!(!lock.is_locked());
}

#[test]
fn try_acquire_fails_while_held() {
    let lock = EventLock::new();
    assert!(lock.try_acquire());
    assert!(!lock.try_acquire());
    lock.release();
    assert!(lock.try_acquire());
    lock.release();
}

#[test]
fn timed_acquire_expires() {
    let lock = EventLock::with_config(SpinConfig::PARK_IMMEDIATELY);
    lock.acquire();

    let start = Instant::now();
    assert!(!lock.acquire_timeout(Duration::from_millis(50)));
    assert!(start.elapsed() >= Duration::from_millis(50));
    assert!(lock.is_locked());

    assert!(!lock.acquire_timeout(Duration::ZERO));
    lock.release();
    assert!(lock.acquire_timeout(Duration::ZERO));
    lock.release();
}

#[test]
#[should_panic(expected = "not held")]
fn release_free_lock_panics() {
    let lock = EventLock::new();
    lock.release();
}

#[test]
fn release_from_another_worker() {
    let lock = Arc::new(EventLock::new());
    lock.acquire();

    let (tx, rx) = channel();
    let waiter = {
        let lock = lock.clone();
        thread::spawn(move || {
            tx.send(()).unwrap();
            lock.acquire();
        })
    };

    rx.recv().unwrap();
    thread::sleep(Duration::from_millis(20));
    lock.release();
    waiter.join().unwrap();

    // Taken by the worker, freed here.
    assert!(lock.is_locked());
    lock.release();
    assert!(!lock.is_locked());
}

#[test]
fn timed_acquire_succeeds_when_released_in_time() {
    let lock = Arc::new(EventLock::new());
    lock.acquire();

    let releaser = {
        let lock = lock.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            lock.release();
        })
    };

    assert!(lock.acquire_timeout(Duration::from_secs(5)));
    releaser.join().unwrap();
    lock.release();
}

#[test]
fn parked_workers_all_get_through() {
    const NUM_WORKERS: usize = 8;
    let lock = Arc::new(EventLock::with_config(SpinConfig::PARK_IMMEDIATELY));
    let done = Arc::new(AtomicUsize::new(0));
    lock.acquire();

    let workers: Vec<_> = (0..NUM_WORKERS)
        .map(|_| {
            let lock = lock.clone();
            let done = done.clone();
            thread::spawn(move || {
                lock.acquire();
                done.fetch_add(1, Ordering::SeqCst);
                lock.release();
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    assert_eq!(done.load(Ordering::SeqCst), 0);
    lock.release();

    for w in workers {
        w.join().unwrap();
    }
    assert_eq!(done.load(Ordering::SeqCst), NUM_WORKERS);
}

#[test]
fn mutex_lots_and_lots() {
    const NUM_TASKS: u32 = 10;
    const NUM_ITERS: u32 = 1_000;
    static M: Mutex<u32> = Mutex::new(0);

    fn inc(delta: u32) {
        for _ in 0..NUM_ITERS {
            let mut val = M.lock();
            *val += delta;
            may_interrupt();
            drop(val);
            may_interrupt();
        }
    }

    let mut handles = Vec::new();
    for _ in 0..NUM_TASKS {
        handles.push(thread::spawn(|| inc(1)));
        handles.push(thread::spawn(|| inc(2)));
    }
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(*M.lock(), NUM_ITERS * NUM_TASKS * 3);
}

#[test]
fn mutex_try_lock_for() {
    let m = Arc::new(Mutex::new(7));
    let guard = m.lock();

    let other = {
        let m = m.clone();
        thread::spawn(move || m.try_lock_for(Duration::from_millis(20)).is_none())
    };
    assert!(other.join().unwrap());

    drop(guard);
    assert_eq!(m.try_lock_for(Duration::from_millis(20)).map(|g| *g), Some(7));
}

#[test]
fn host_platform_clock_is_monotonic() {
    let platform = HostPlatform;
    let a = platform.now();
    thread::sleep(Duration::from_millis(5));
    let b = platform.now();
    assert!(b >= a + Duration::from_millis(5));

    let lock = platform.allocate_lock();
    assert!(!lock.is_locked());
}

#[test]
#[cfg(feature = "stats")]
fn lock_stats() {
    let lock = EventLock::new();
    lock.reset_stats();

    lock.acquire();
    assert!(!lock.acquire_timeout(Duration::from_millis(5)));
    lock.release();
    assert!(lock.try_acquire());
    lock.release();

    let (acquires, _, blocks, timeouts) = lock.stats();
    assert_eq!(acquires, 2);
    assert_eq!(blocks, 1);
    assert_eq!(timeouts, 1);
}
