// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! The raw lock primitive and the hosting platform it comes from.
//!
//! Everything in `ksync` is built on a single primitive: a non-reentrant
//! binary lock with blocking, non-blocking and timed acquisition, whose
//! release wakes at most one blocked acquirer. This crate describes that
//! primitive and supplies a default implementation:
//!
//! - [`RawLock`]: the contract every lock implementation must honor
//! - [`SyncPlatform`]: allocates fresh locks and reads the monotonic clock
//! - [`EventLock`]: the default [`RawLock`], parking on an
//!   [`event_listener::Event`] after a configurable spin
//! - [`HostPlatform`]: the default [`SyncPlatform`] backed by [`EventLock`]
//! - [`Mutex`]: a data-owning mutex over [`EventLock`] (via `lock_api`)
//!
//! # Examples
//!
//! ## Raw lock
//! ```
//! use core::time::Duration;
//!
//! use klock::{EventLock, RawLock};
//!
//! let lock = EventLock::new();
//! lock.acquire();
//! assert!(!lock.acquire_timeout(Duration::from_millis(10)));
//! lock.release();
//! assert!(lock.try_acquire());
//! ```
//!
//! ## Guarding a device resource
//! ```
//! use klock::Mutex;
//!
//! static PIN_LEVEL: Mutex<bool> = Mutex::new(false);
//!
//! fn toggle() {
//!     let mut level = PIN_LEVEL.lock();
//!     *level = !*level;
//! }
//! # toggle();
//! ```
//!
//! # Features
//!
//! - `stats`: Enable lock statistics tracking (acquisitions, spins, blocks, timeouts)

mod lock;
mod platform;
mod util;

#[cfg(test)]
mod tests;

#[cfg(feature = "stats")]
pub use self::lock::LockStats;
pub use self::{
    lock::{EventLock, Mutex, MutexGuard},
    platform::{HostPlatform, RawLock, SyncPlatform},
    util::SpinConfig,
};
