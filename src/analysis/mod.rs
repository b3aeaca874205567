//! Statistical checks on randomness sources.
//!
//! These are sanity checks used by tests and the `audit` command,
//! not cryptographic proofs.

mod uniformity;

pub use uniformity::{UniformityResult, UniformityTest, DEFAULT_CRITICAL_VALUE};
