//! Local ChaCha20 randomness.
//!
//! The generator is seeded once from the OS entropy source and never
//! touches the network, so it is always available as the fallback.

use super::{Bit, Roll};
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// Trait for local, infallible randomness.
pub trait LocalSource: Send {
    /// Draws the second-layer bit.
    fn next_bit(&mut self) -> Bit;

    /// Draws the first-layer roll.
    fn roll(&mut self) -> Roll;
}

/// CSPRNG-backed local source.
pub struct LocalRandomSource {
    inner: ChaCha20Rng,
    /// Bits drawn since creation.
    bits_drawn: u64,
}

impl LocalRandomSource {
    /// Creates a source seeded from the OS entropy source.
    pub fn from_os_entropy() -> Self {
        let mut seed = [0u8; 32];
        rand_core::OsRng.fill_bytes(&mut seed);

        Self {
            inner: ChaCha20Rng::from_seed(seed),
            bits_drawn: 0,
        }
    }

    /// Creates a source from a known seed (for testing only).
    #[cfg(test)]
    pub(crate) fn from_seed_for_testing(seed: [u8; 32]) -> Self {
        Self {
            inner: ChaCha20Rng::from_seed(seed),
            bits_drawn: 0,
        }
    }

    /// Returns the number of bits drawn.
    pub fn bits_drawn(&self) -> u64 {
        self.bits_drawn
    }

    /// Draws `count` bits into a vector.
    pub fn sample_bits(&mut self, count: usize) -> Vec<Bit> {
        (0..count).map(|_| self.next_bit()).collect()
    }
}

impl LocalSource for LocalRandomSource {
    fn next_bit(&mut self) -> Bit {
        self.bits_drawn += 1;
        Bit::from_byte(self.inner.next_u32() as u8)
    }

    fn roll(&mut self) -> Roll {
        let value = self.inner.gen_range(Roll::MIN..=Roll::MAX);
        Roll::new(value).unwrap_or(Roll(Roll::MIN))
    }
}

#[derive(Debug, Default)]
struct Script {
    rolls: VecDeque<u8>,
    bits: VecDeque<Bit>,
    roll_draws: u64,
    bit_draws: u64,
}

/// Scripted local source for tests and simulations.
///
/// Returns queued values in order; once a queue is empty it keeps
/// returning roll 50 and bit 0. Clones share the script.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    script: Arc<Mutex<Script>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_script<T>(&self, f: impl FnOnce(&mut Script) -> T) -> T {
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut script)
    }

    /// Queues first-layer roll values.
    pub fn push_rolls(&self, rolls: impl IntoIterator<Item = u8>) -> &Self {
        self.with_script(|s| s.rolls.extend(rolls));
        self
    }

    /// Queues second-layer bits.
    pub fn push_bits(&self, bits: impl IntoIterator<Item = Bit>) -> &Self {
        self.with_script(|s| s.bits.extend(bits));
        self
    }

    /// Number of rolls drawn so far.
    pub fn roll_draws(&self) -> u64 {
        self.with_script(|s| s.roll_draws)
    }

    /// Number of bits drawn so far.
    pub fn bit_draws(&self) -> u64 {
        self.with_script(|s| s.bit_draws)
    }
}

impl LocalSource for ScriptedSource {
    fn next_bit(&mut self) -> Bit {
        self.with_script(|s| {
            s.bit_draws += 1;
            s.bits.pop_front().unwrap_or(Bit::Zero)
        })
    }

    fn roll(&mut self) -> Roll {
        self.with_script(|s| {
            s.roll_draws += 1;
            s.rolls
                .pop_front()
                .and_then(Roll::new)
                .unwrap_or(Roll(50))
        })
    }
}
