//! Randomness sources for wallpaper selection.
//!
//! Two sources feed the selection:
//! - a local ChaCha20 CSPRNG seeded from the OS, which never fails, and
//! - a remote quantum random number service, which is best-effort.
//!
//! Both produce a [`Bit`]; only the local source produces the
//! first-layer [`Roll`] that decides whether the remote one is tried.

mod local;
mod remote;

pub use local::{LocalRandomSource, LocalSource, ScriptedSource};
pub use remote::{
    FetchError, MockRemoteSource, MockReply, QrngClient, RemoteSource, DEFAULT_QRNG_ENDPOINT,
};

use std::fmt;

/// A single random bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bit {
    Zero,
    One,
}

impl Bit {
    /// Reduces a byte modulo 2.
    #[inline]
    pub fn from_byte(byte: u8) -> Self {
        if byte % 2 == 0 {
            Self::Zero
        } else {
            Self::One
        }
    }

    #[inline]
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Zero => 0,
            Self::One => 1,
        }
    }
}

impl fmt::Display for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// First-layer roll, uniform in `[Roll::MIN, Roll::MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Roll(u8);

impl Roll {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 100;

    /// Returns `None` if the value is outside the roll range.
    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    #[inline]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Roll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_from_byte_is_parity() {
        assert_eq!(Bit::from_byte(0), Bit::Zero);
        assert_eq!(Bit::from_byte(3), Bit::One);
        assert_eq!(Bit::from_byte(254), Bit::Zero);
        assert_eq!(Bit::from_byte(255), Bit::One);
    }

    #[test]
    fn test_roll_bounds() {
        assert!(Roll::new(0).is_none());
        assert!(Roll::new(101).is_none());
        assert_eq!(Roll::new(1).map(Roll::value), Some(1));
        assert_eq!(Roll::new(100).map(Roll::value), Some(100));
    }
}
