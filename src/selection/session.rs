//! Lock sessions and the epoch counter that invalidates stale work.

use crate::assets::PreloadedAssets;
use crate::entropy::Roll;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One lock-to-unlock cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch(u64);

impl Epoch {
    #[inline]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared epoch counter. Starts at zero, before any lock.
#[derive(Debug, Clone, Default)]
pub(crate) struct EpochCounter(Arc<AtomicU64>);

impl EpochCounter {
    pub(crate) fn current(&self) -> Epoch {
        Epoch(self.0.load(Ordering::SeqCst))
    }

    pub(crate) fn advance(&self) -> Epoch {
        Epoch(self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub(crate) fn is_current(&self, epoch: Epoch) -> bool {
        self.current() == epoch
    }
}

/// Handle a host can trip from any thread the moment the device locks.
///
/// Tripping advances the epoch, so an unlock still waiting on the
/// remote source discards its result instead of applying it.
///
/// A trip must be followed by `on_lock`. The loaded session keeps its old
/// epoch, so an unlock without a fresh lock consumes it and is discarded.
#[derive(Debug, Clone)]
pub struct LockSignal(EpochCounter);

impl LockSignal {
    pub(crate) fn new(counter: EpochCounter) -> Self {
        Self(counter)
    }

    /// Invalidates any in-flight unlock and returns the new epoch.
    pub fn trip(&self) -> Epoch {
        let epoch = self.0.advance();
        tracing::debug!(%epoch, "Lock signalled");
        epoch
    }
}

/// State carried from a lock event to the following unlock.
#[derive(Debug, Clone)]
pub struct LockSession {
    epoch: Epoch,
    roll: Roll,
    assets: PreloadedAssets,
    locked_at: DateTime<Utc>,
}

impl LockSession {
    pub fn new(epoch: Epoch, roll: Roll, assets: PreloadedAssets) -> Self {
        Self {
            epoch,
            roll,
            assets,
            locked_at: Utc::now(),
        }
    }

    #[inline]
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    #[inline]
    pub fn roll(&self) -> Roll {
        self.roll
    }

    pub fn assets(&self) -> &PreloadedAssets {
        &self.assets
    }

    pub fn locked_at(&self) -> DateTime<Utc> {
        self.locked_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_advances() {
        let counter = EpochCounter::default();
        assert_eq!(counter.current().value(), 0);

        let first = counter.advance();
        assert!(counter.is_current(first));

        let second = counter.advance();
        assert!(second > first);
        assert!(!counter.is_current(first));
    }

    #[test]
    fn test_signal_shares_counter() {
        let counter = EpochCounter::default();
        let epoch = counter.advance();
        let signal = LockSignal::new(counter.clone());

        let tripped = signal.trip();

        assert!(!counter.is_current(epoch));
        assert!(counter.is_current(tripped));
    }
}
