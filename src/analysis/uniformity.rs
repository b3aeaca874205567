//! Chi-square uniformity check for bit samples.
//!
//! A sanity check on the local source, not a proof of randomness.
//! With two outcomes the statistic has one degree of freedom.

use crate::entropy::Bit;
use serde::{Deserialize, Serialize};

/// Chi-square critical value for 1 degree of freedom at p = 0.001.
pub const DEFAULT_CRITICAL_VALUE: f64 = 10.83;

/// Result of a uniformity test.
#[derive(Debug, Clone)]
pub struct UniformityResult {
    /// Number of zero bits.
    pub zeros: u64,
    /// Number of one bits.
    pub ones: u64,
    /// Pearson chi-square statistic.
    pub chi_square: f64,
    /// Fraction of ones minus 0.5.
    pub bit_bias: f64,
    /// Whether the statistic is below the critical value.
    pub passed: bool,
}

impl UniformityResult {
    pub fn sample_size(&self) -> u64 {
        self.zeros + self.ones
    }
}

/// Configurable uniformity test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniformityTest {
    /// Rejection threshold for the chi-square statistic.
    pub critical_value: f64,
}

impl Default for UniformityTest {
    fn default() -> Self {
        Self {
            critical_value: DEFAULT_CRITICAL_VALUE,
        }
    }
}

impl UniformityTest {
    /// Runs the test over a bit sample.
    ///
    /// An empty sample never passes.
    pub fn run(&self, bits: &[Bit]) -> UniformityResult {
        let ones = bits.iter().filter(|&&b| b == Bit::One).count() as u64;
        let zeros = bits.len() as u64 - ones;

        if bits.is_empty() {
            return UniformityResult {
                zeros,
                ones,
                chi_square: f64::INFINITY,
                bit_bias: 0.0,
                passed: false,
            };
        }

        let n = bits.len() as f64;
        let expected = n / 2.0;
        let chi_square = ((zeros as f64 - expected).powi(2) + (ones as f64 - expected).powi(2))
            / expected;

        let result = UniformityResult {
            zeros,
            ones,
            chi_square,
            bit_bias: ones as f64 / n - 0.5,
            passed: chi_square < self.critical_value,
        };

        tracing::trace!(
            zeros,
            ones,
            chi_square,
            passed = result.passed,
            "Uniformity test complete"
        );

        result
    }
}
