//! Prometheus metrics for wallpaper selection.
//!
//! # Metrics Exposed
//!
//! ## Lifecycle
//! - `unlock_wallpaper_session_open` - Whether a lock session is pending
//! - `unlock_wallpaper_locks_total` / `unlock_wallpaper_unlocks_total`
//! - `unlock_wallpaper_emergency_loads_total` - Cold-start unlocks
//! - `unlock_wallpaper_decode_fallbacks_total` - Reused asset pairs
//!
//! ## Randomness
//! - `unlock_wallpaper_remote_attempts_total`
//! - `unlock_wallpaper_remote_failures_total`
//! - `unlock_wallpaper_local_draws_total`
//!
//! ## Outcomes
//! - `unlock_wallpaper_applied_total{wallpaper}` - Per-wallpaper count
//! - `unlock_wallpaper_discarded_total` - Superseded selections
//! - `unlock_wallpaper_apply_failures_total`
//!
//! The HTTP exporter is behind the `metrics` feature.

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
