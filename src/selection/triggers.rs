//! The roll values that permit a remote fetch.

use crate::entropy::Roll;
use std::collections::BTreeSet;
use thiserror::Error;

/// Default trigger values.
pub const DEFAULT_TRIGGERS: [u8; 3] = [7, 23, 65];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TriggerError {
    #[error("trigger {0} outside roll range 1..=100")]
    OutOfRange(u8),
}

/// Immutable set of first-layer roll values that mark the remote path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleTriggerSet {
    values: BTreeSet<u8>,
}

impl Default for EligibleTriggerSet {
    fn default() -> Self {
        Self {
            values: DEFAULT_TRIGGERS.into_iter().collect(),
        }
    }
}

impl EligibleTriggerSet {
    /// Builds a set, rejecting values a roll can never take.
    pub fn new(values: impl IntoIterator<Item = u8>) -> Result<Self, TriggerError> {
        let values = values
            .into_iter()
            .map(|v| Roll::new(v).map(Roll::value).ok_or(TriggerError::OutOfRange(v)))
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self { values })
    }

    /// Returns true if the roll selects the remote path.
    #[inline]
    pub fn contains(&self, roll: Roll) -> bool {
        self.values.contains(&roll.value())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Probability that a uniform roll hits the set.
    pub fn hit_probability(&self) -> f64 {
        self.values.len() as f64 / f64::from(Roll::MAX)
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.values.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roll(v: u8) -> Roll {
        Roll::new(v).unwrap()
    }

    #[test]
    fn test_default_triggers() {
        let set = EligibleTriggerSet::default();

        assert!(set.contains(roll(7)));
        assert!(set.contains(roll(23)));
        assert!(set.contains(roll(65)));
        assert!(!set.contains(roll(50)));
        assert!((set.hit_probability() - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert_eq!(
            EligibleTriggerSet::new([5, 0]),
            Err(TriggerError::OutOfRange(0))
        );
        assert_eq!(
            EligibleTriggerSet::new([101]),
            Err(TriggerError::OutOfRange(101))
        );
    }

    #[test]
    fn test_duplicates_collapse() {
        let set = EligibleTriggerSet::new([9, 9, 1]).unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 9]);
    }

    #[test]
    fn test_empty_set_never_matches() {
        let set = EligibleTriggerSet::new([]).unwrap();
        assert!(set.is_empty());
        assert!((1..=100).all(|v| !set.contains(roll(v))));
    }
}
