//! Deadline bookkeeping for retrying waits.

use core::time::Duration;

use klock::SyncPlatform;

/// How long the next wait in a retry loop may block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Budget {
    /// No timeout was requested.
    Unbounded,
    /// Block for at most this long.
    Remaining(Duration),
    /// The deadline has passed; stop retrying.
    Expired,
}

impl Budget {
    /// The timeout to hand to a single wait.
    ///
    /// [`Budget::Expired`] maps to a zero timeout.
    pub(crate) fn timeout(self) -> Option<Duration> {
        match self {
            Self::Unbounded => None,
            Self::Remaining(d) => Some(d),
            Self::Expired => Some(Duration::ZERO),
        }
    }
}

/// A fixed deadline shared by every retry of a wait loop.
///
/// The end time is `now + timeout`, taken on the first call to
/// [`next_wait`](Self::next_wait); later calls hand out what is left of it,
/// so a loop that wakes early never waits longer than `timeout` in total.
pub(crate) struct Deadline<'a, P: SyncPlatform> {
    platform: &'a P,
    timeout: Option<Duration>,
    end: Option<Duration>,
}

impl<'a, P: SyncPlatform> Deadline<'a, P> {
    pub(crate) fn new(platform: &'a P, timeout: Option<Duration>) -> Self {
        Self {
            platform,
            timeout,
            end: None,
        }
    }

    /// Budget for the next wait of the loop.
    pub(crate) fn next_wait(&mut self) -> Budget {
        let Some(timeout) = self.timeout else {
            return Budget::Unbounded;
        };
        let now = self.platform.now();
        match self.end {
            None => {
                self.end = Some(now.saturating_add(timeout));
                Budget::Remaining(timeout)
            }
            Some(end) => match end.checked_sub(now) {
                Some(left) if !left.is_zero() => Budget::Remaining(left),
                _ => Budget::Expired,
            },
        }
    }
}
