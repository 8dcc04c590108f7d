// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Blocking coordination primitives built on a single raw lock.
//!
//! The hosting environment provides one primitive, a binary lock (see
//! [`lock::RawLock`]). On top of it this crate provides:
//!
//! - [`Condition`]: Condition variable with FIFO wake order
//! - [`Event`]: Resettable flag that releases every waiter when raised
//! - [`Semaphore`]: Counting semaphore for resource management
//! - [`lock`]: Re-export of `klock` for the raw lock and platform
//!
//! Every primitive is generic over a [`lock::SyncPlatform`], which hands
//! out locks and reads the clock. The default is [`lock::HostPlatform`].
//!
//! # Examples
//!
//! ## Condition
//! ```
//! use std::{sync::Arc, thread};
//!
//! use ksync::{Condition, lock::Mutex};
//!
//! let cond = Arc::new(Condition::new());
//! let payload = Arc::new(Mutex::new(None));
//!
//! let receiver = {
//!     let (cond, payload) = (cond.clone(), payload.clone());
//!     thread::spawn(move || {
//!         let guard = cond.lock();
//!         guard.wait_for(|| payload.lock().is_some(), None);
//!         payload.lock().take()
//!     })
//! };
//!
//! {
//!     let guard = cond.lock();
//!     *payload.lock() = Some(42);
//!     guard.notify(1);
//! }
//! assert_eq!(receiver.join().unwrap(), Some(42));
//! ```
//!
//! ## Raw lock discipline
//! ```
//! use ksync::{Condition, SyncError};
//!
//! let cond = Condition::new();
//! assert_eq!(cond.notify(1), Err(SyncError::LockState { op: "notify" }));
//!
//! cond.acquire();
//! cond.notify(1).unwrap();
//! cond.release().unwrap();
//! ```
//!
//! ## Event
//! ```
//! use core::time::Duration;
//!
//! use ksync::Event;
//!
//! let ready = Event::new();
//! assert!(!ready.wait(Some(Duration::from_millis(10))));
//!
//! ready.set();
//! assert!(ready.wait(Some(Duration::ZERO)));
//! ```
//!
//! ## Semaphore
//! ```
//! use ksync::Semaphore;
//!
//! let sem = Semaphore::new(3).unwrap();
//! {
//!     let _guard = sem.acquire_guard();
//!     // do work with permit
//!     // permit automatically released when guard is dropped
//! }
//! assert_eq!(sem.available_permits(), 3);
//! ```
//!
//! # Features
//!
//! - `stats`: Enable lock statistics tracking in `klock`

pub use klock as lock;

mod condition;
mod deadline;
mod error;
mod event;
mod semaphore;

pub use self::{
    condition::{Condition, ConditionGuard},
    error::{SyncError, SyncResult},
    event::Event,
    semaphore::{Semaphore, SemaphoreGuard},
};
