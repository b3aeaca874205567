//! Metrics collection and registry.

use crate::selection::SelectionStats;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of controller state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Whether a lock session is waiting for an unlock.
    pub session_open: bool,
    /// Lock events handled.
    pub locks: u64,
    /// Unlock events handled.
    pub unlocks: u64,
    /// Unlocks that had to preload synchronously.
    pub emergency_loads: u64,
    /// Locks that reused the previous asset pair.
    pub decode_fallbacks: u64,
    /// Remote fetches attempted.
    pub remote_attempts: u64,
    /// Remote fetches that failed or timed out.
    pub remote_failures: u64,
    /// Local bits drawn.
    pub local_draws: u64,
    /// Lively wallpapers applied.
    pub lively_applied: u64,
    /// Sleepy wallpapers applied.
    pub sleepy_applied: u64,
    /// Results discarded because a newer lock superseded them.
    pub discarded: u64,
    /// Wallpaper applications that failed.
    pub apply_failures: u64,
}

impl MetricsSnapshot {
    /// Creates a snapshot from controller counters.
    pub fn from_stats(stats: &SelectionStats, session_open: bool) -> Self {
        Self {
            session_open,
            locks: stats.locks,
            unlocks: stats.unlocks,
            emergency_loads: stats.emergency_loads,
            decode_fallbacks: stats.decode_fallbacks,
            remote_attempts: stats.remote_attempts,
            remote_failures: stats.remote_failures,
            local_draws: stats.local_draws,
            lively_applied: stats.lively_applied,
            sleepy_applied: stats.sleepy_applied,
            discarded: stats.discarded,
            apply_failures: stats.apply_failures,
        }
    }
}

/// Prometheus metrics registry for wallpaper selection.
pub struct MetricsRegistry {
    registry: Registry,

    // Lifecycle metrics
    session_open: IntGauge,
    locks_total: IntCounter,
    unlocks_total: IntCounter,
    emergency_loads_total: IntCounter,
    decode_fallbacks_total: IntCounter,

    // Randomness metrics
    remote_attempts_total: IntCounter,
    remote_failures_total: IntCounter,
    local_draws_total: IntCounter,

    // Outcome metrics
    applied_total: IntCounterVec,
    discarded_total: IntCounter,
    apply_failures_total: IntCounter,
}

/// Advances a counter to a monotonically growing absolute value.
fn advance(counter: &IntCounter, target: u64) {
    let current = counter.get();
    if target > current {
        counter.inc_by(target - current);
    }
}

impl MetricsRegistry {
    /// Creates a new registry with all selection metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let session_open = IntGauge::new(
            "unlock_wallpaper_session_open",
            "Whether a lock session is waiting for an unlock (1=yes, 0=no)",
        )?;
        let locks_total =
            IntCounter::new("unlock_wallpaper_locks_total", "Total lock events handled")?;
        let unlocks_total =
            IntCounter::new("unlock_wallpaper_unlocks_total", "Total unlock events handled")?;
        let emergency_loads_total = IntCounter::new(
            "unlock_wallpaper_emergency_loads_total",
            "Unlocks that preloaded assets synchronously",
        )?;
        let decode_fallbacks_total = IntCounter::new(
            "unlock_wallpaper_decode_fallbacks_total",
            "Locks that reused the previous asset pair after a decode failure",
        )?;

        let remote_attempts_total = IntCounter::new(
            "unlock_wallpaper_remote_attempts_total",
            "Remote randomness fetches attempted",
        )?;
        let remote_failures_total = IntCounter::new(
            "unlock_wallpaper_remote_failures_total",
            "Remote randomness fetches that failed or timed out",
        )?;
        let local_draws_total = IntCounter::new(
            "unlock_wallpaper_local_draws_total",
            "Bits drawn from the local CSPRNG",
        )?;

        let applied_total = IntCounterVec::new(
            Opts::new("unlock_wallpaper_applied_total", "Wallpapers applied"),
            &["wallpaper"],
        )?;
        let discarded_total = IntCounter::new(
            "unlock_wallpaper_discarded_total",
            "Selections discarded because a newer lock superseded them",
        )?;
        let apply_failures_total = IntCounter::new(
            "unlock_wallpaper_apply_failures_total",
            "Wallpaper applications that failed",
        )?;

        registry.register(Box::new(session_open.clone()))?;
        registry.register(Box::new(locks_total.clone()))?;
        registry.register(Box::new(unlocks_total.clone()))?;
        registry.register(Box::new(emergency_loads_total.clone()))?;
        registry.register(Box::new(decode_fallbacks_total.clone()))?;
        registry.register(Box::new(remote_attempts_total.clone()))?;
        registry.register(Box::new(remote_failures_total.clone()))?;
        registry.register(Box::new(local_draws_total.clone()))?;
        registry.register(Box::new(applied_total.clone()))?;
        registry.register(Box::new(discarded_total.clone()))?;
        registry.register(Box::new(apply_failures_total.clone()))?;

        Ok(Self {
            registry,
            session_open,
            locks_total,
            unlocks_total,
            emergency_loads_total,
            decode_fallbacks_total,
            remote_attempts_total,
            remote_failures_total,
            local_draws_total,
            applied_total,
            discarded_total,
            apply_failures_total,
        })
    }

    /// Updates all metrics from a snapshot.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.session_open.set(i64::from(snapshot.session_open));

        advance(&self.locks_total, snapshot.locks);
        advance(&self.unlocks_total, snapshot.unlocks);
        advance(&self.emergency_loads_total, snapshot.emergency_loads);
        advance(&self.decode_fallbacks_total, snapshot.decode_fallbacks);

        advance(&self.remote_attempts_total, snapshot.remote_attempts);
        advance(&self.remote_failures_total, snapshot.remote_failures);
        advance(&self.local_draws_total, snapshot.local_draws);

        advance(
            &self.applied_total.with_label_values(&["lively"]),
            snapshot.lively_applied,
        );
        advance(
            &self.applied_total.with_label_values(&["sleepy"]),
            snapshot.sleepy_applied,
        );
        advance(&self.discarded_total, snapshot.discarded);
        advance(&self.apply_failures_total, snapshot.apply_failures);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        assert!(MetricsRegistry::new().is_ok());
    }

    #[test]
    fn test_metrics_update() {
        let registry = MetricsRegistry::new().unwrap();

        let stats = SelectionStats {
            locks: 4,
            unlocks: 3,
            remote_attempts: 1,
            remote_failures: 1,
            local_draws: 3,
            lively_applied: 2,
            sleepy_applied: 1,
            ..Default::default()
        };
        registry.update(&MetricsSnapshot::from_stats(&stats, true));

        let output = registry.encode().unwrap();
        assert!(output.contains("unlock_wallpaper_session_open 1"));
        assert!(output.contains("unlock_wallpaper_locks_total 4"));
        assert!(output.contains("unlock_wallpaper_remote_failures_total 1"));
        assert!(output.contains(r#"unlock_wallpaper_applied_total{wallpaper="lively"} 2"#));
        assert!(output.contains(r#"unlock_wallpaper_applied_total{wallpaper="sleepy"} 1"#));
    }

    #[test]
    fn test_counters_never_decrease() {
        let registry = MetricsRegistry::new().unwrap();

        let mut snapshot = MetricsSnapshot {
            unlocks: 5,
            ..Default::default()
        };
        registry.update(&snapshot);
        snapshot.unlocks = 2;
        registry.update(&snapshot);

        let output = registry.encode().unwrap();
        assert!(output.contains("unlock_wallpaper_unlocks_total 5"));
    }
}
