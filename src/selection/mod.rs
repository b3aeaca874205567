//! Two-stage wallpaper selection.
//!
//! ```text
//! lock   → preload assets, roll 1..=100, open session (epoch n)
//! unlock → roll ∈ triggers && online ? remote bit : local bit
//!        → bit 0 = lively, bit 1 = sleepy → sink
//! ```
//!
//! The roll only decides which source produces the bit; it never
//! influences the outcome itself.

mod controller;
mod driver;
mod session;
mod triggers;

pub use controller::{
    ControllerConfig, ControllerState, Selection, SelectionController, SelectionError,
    SelectionSource, SelectionStats, UnlockOutcome,
};
pub use driver::{CycleReport, DriverClosed, LifecycleDriver, LifecycleEvent, LifecycleHandle};
pub use session::{Epoch, LockSession, LockSignal};
pub use triggers::{EligibleTriggerSet, TriggerError, DEFAULT_TRIGGERS};

use crate::assets::{Bitmap, PreloadedAssets, ResourceId};
use crate::entropy::Bit;
use std::fmt;

/// Outcome of one unlock: which wallpaper to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionResult {
    Lively = 0,
    Sleepy = 1,
}

impl SelectionResult {
    /// Resource shown for this result.
    pub fn resource(self) -> ResourceId {
        match self {
            Self::Lively => ResourceId::LivelyCat,
            Self::Sleepy => ResourceId::SleepyCat,
        }
    }

    /// Picks the matching bitmap from a preloaded pair.
    pub fn pick(self, assets: &PreloadedAssets) -> &Bitmap {
        match self {
            Self::Lively => assets.lively(),
            Self::Sleepy => assets.sleepy(),
        }
    }
}

impl From<Bit> for SelectionResult {
    fn from(bit: Bit) -> Self {
        match bit {
            Bit::Zero => Self::Lively,
            Bit::One => Self::Sleepy,
        }
    }
}

impl fmt::Display for SelectionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lively => f.write_str("lively"),
            Self::Sleepy => f.write_str("sleepy"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_maps_to_result() {
        assert_eq!(SelectionResult::from(Bit::Zero), SelectionResult::Lively);
        assert_eq!(SelectionResult::from(Bit::One), SelectionResult::Sleepy);
        assert_eq!(SelectionResult::Sleepy as u8, 1);
        assert_eq!(SelectionResult::Sleepy.resource(), ResourceId::SleepyCat);
    }
}
