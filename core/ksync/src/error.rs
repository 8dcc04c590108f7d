//! Error types for synchronization operations.

use core::fmt;

/// Errors returned by the synchronization primitives.
///
/// Both variants are programmer errors: they are never retried and are
/// returned to the caller immediately. A timeout is not an error; timed
/// operations report it as `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    /// An operation that requires holding the condition's lock was called
    /// while the lock was free.
    LockState {
        /// The rejected operation (`"wait"`, `"notify"`, `"release"`).
        op: &'static str,
    },

    /// An argument is outside the domain of the operation.
    InvalidArgument {
        /// What was wrong with it.
        reason: &'static str,
    },
}

impl SyncError {
    /// Returns `true` for [`SyncError::LockState`].
    pub const fn is_lock_state(&self) -> bool {
        matches!(self, Self::LockState { .. })
    }

    /// Returns `true` for [`SyncError::InvalidArgument`].
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LockState { op } => write!(f, "cannot {} on un-acquired lock", op),
            Self::InvalidArgument { reason } => write!(f, "invalid argument: {}", reason),
        }
    }
}

impl std::error::Error for SyncError {}

/// A specialized [`Result`] type with [`SyncError`] as the error type.
pub type SyncResult<T = ()> = Result<T, SyncError>;

/// Construct an [`Err(SyncError)`] while printing a warning message.
///
/// [`Err(SyncError)`]: Err
macro_rules! sync_err {
    (LockState, $op:expr) => {
        $crate::error::warn_err($crate::SyncError::LockState { op: $op })
    };
    (InvalidArgument, $reason:expr) => {
        $crate::error::warn_err($crate::SyncError::InvalidArgument { reason: $reason })
    };
}

pub(crate) use sync_err;

#[inline(never)]
pub(crate) fn warn_err<T>(err: SyncError) -> SyncResult<T> {
    log::warn!("[{:?}] {}", err, err);
    Err(err)
}
