//! Lock/unlock state machine.
//!
//! # Flow
//!
//! - `on_lock` decodes the assets (falling back to the last good pair),
//!   draws the first-layer roll and opens a session for a new epoch.
//! - `on_unlock` consumes the session. Eligibility and connectivity are
//!   evaluated at that moment; at most one remote fetch is made, and any
//!   failure is replaced by exactly one local draw.
//! - A result whose epoch was superseded while waiting is discarded.

use super::session::{Epoch, EpochCounter, LockSession, LockSignal};
use super::{EligibleTriggerSet, SelectionResult};
use crate::assets::{AssetError, AssetPreloader, PreloadedAssets};
use crate::entropy::{Bit, FetchError, LocalSource, RemoteSource, Roll};
use crate::platform::{ApplyError, ConnectivityProbe, WallpaperSink};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced to the host. Remote failures never appear here.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("no wallpaper assets available: {0}")]
    Assets(#[from] AssetError),

    #[error("failed to apply wallpaper: {0}")]
    Apply(#[from] ApplyError),
}

/// Controller settings.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Rolls that permit the remote path.
    pub triggers: EligibleTriggerSet,
    /// Upper bound on a single remote fetch.
    pub fetch_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            triggers: EligibleTriggerSet::default(),
            fetch_timeout: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No session; nothing applied since the last lock.
    Idle,
    /// Assets and roll are waiting for an unlock.
    Loaded,
    /// The last unlock resolved to a wallpaper.
    Resolved,
}

/// Where the selecting bit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    Remote,
    /// Remote was attempted and failed.
    LocalFallback,
    Local,
}

/// A wallpaper that was applied.
#[derive(Debug, Clone)]
pub struct Selection {
    pub epoch: Epoch,
    pub roll: Roll,
    pub source: SelectionSource,
    pub result: SelectionResult,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum UnlockOutcome {
    Applied(Selection),
    /// A newer lock superseded this unlock before it finished.
    Discarded { epoch: Epoch },
}

/// Running counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionStats {
    pub locks: u64,
    pub unlocks: u64,
    pub emergency_loads: u64,
    pub decode_fallbacks: u64,
    pub remote_attempts: u64,
    pub remote_failures: u64,
    pub local_draws: u64,
    pub lively_applied: u64,
    pub sleepy_applied: u64,
    pub discarded: u64,
    pub apply_failures: u64,
}

/// Orchestrates preloading, source selection and wallpaper application.
pub struct SelectionController {
    config: ControllerConfig,
    preloader: Box<dyn AssetPreloader>,
    probe: Box<dyn ConnectivityProbe>,
    remote: Arc<dyn RemoteSource>,
    local: Box<dyn LocalSource>,
    sink: Box<dyn WallpaperSink>,
    epoch: EpochCounter,
    state: ControllerState,
    session: Option<LockSession>,
    /// Most recent pair that decoded successfully.
    last_good: Option<PreloadedAssets>,
    stats: SelectionStats,
}

impl SelectionController {
    pub fn new(
        config: ControllerConfig,
        preloader: impl AssetPreloader + 'static,
        probe: impl ConnectivityProbe + 'static,
        remote: Arc<dyn RemoteSource>,
        local: impl LocalSource + 'static,
        sink: impl WallpaperSink + 'static,
    ) -> Self {
        Self {
            config,
            preloader: Box::new(preloader),
            probe: Box::new(probe),
            remote,
            local: Box::new(local),
            sink: Box::new(sink),
            epoch: EpochCounter::default(),
            state: ControllerState::Idle,
            session: None,
            last_good: None,
            stats: SelectionStats::default(),
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// The session waiting for an unlock, if any.
    pub fn session(&self) -> Option<&LockSession> {
        self.session.as_ref()
    }

    pub fn stats(&self) -> &SelectionStats {
        &self.stats
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Returns a handle that invalidates in-flight unlocks when tripped.
    pub fn lock_signal(&self) -> LockSignal {
        LockSignal::new(self.epoch.clone())
    }

    /// Handles a lock event.
    ///
    /// Any unconsumed session is replaced. Fails only when the assets
    /// cannot be decoded and no earlier pair exists; the controller is
    /// then left idle.
    pub fn on_lock(&mut self) -> Result<Epoch, SelectionError> {
        let epoch = self.epoch.advance();
        self.stats.locks += 1;

        if let Some(stale) = self.session.take() {
            tracing::debug!(
                stale_epoch = %stale.epoch(),
                "Replacing session that was never unlocked"
            );
        }
        self.state = ControllerState::Idle;

        let session = self.open_session(epoch)?;
        tracing::info!(
            %epoch,
            roll = %session.roll(),
            assets = session.assets().sequence(),
            "Session opened"
        );

        self.session = Some(session);
        self.state = ControllerState::Loaded;
        Ok(epoch)
    }

    /// Handles an unlock event and applies the chosen wallpaper.
    pub async fn on_unlock(&mut self) -> Result<UnlockOutcome, SelectionError> {
        self.stats.unlocks += 1;
        let session = match self.session.take() {
            Some(session) => session,
            None => {
                tracing::warn!("Unlock without a preceding lock, loading assets synchronously");
                self.stats.emergency_loads += 1;
                let epoch = self.epoch.advance();
                self.open_session(epoch)?
            }
        };
        self.state = ControllerState::Idle;

        let epoch = session.epoch();
        let roll = session.roll();
        let eligible = self.config.triggers.contains(roll);
        let online = self.probe.is_online();

        tracing::debug!(%epoch, %roll, eligible, online, "Resolving unlock");

        let (bit, source) = if eligible && online {
            self.stats.remote_attempts += 1;
            let remote = Arc::clone(&self.remote);
            match fetch_bounded(remote.as_ref(), self.config.fetch_timeout).await {
                Ok(bit) => (bit, SelectionSource::Remote),
                Err(err) => {
                    self.stats.remote_failures += 1;
                    tracing::warn!(%epoch, error = %err, "Remote randomness unavailable, using local source");
                    (self.draw_local(), SelectionSource::LocalFallback)
                }
            }
        } else {
            (self.draw_local(), SelectionSource::Local)
        };

        if !self.epoch.is_current(epoch) {
            self.stats.discarded += 1;
            tracing::warn!(%epoch, current = %self.epoch.current(), "Discarding result from superseded session");
            return Ok(UnlockOutcome::Discarded { epoch });
        }

        let result = SelectionResult::from(bit);
        let bitmap = result.pick(session.assets());

        if let Err(err) = self.sink.apply(bitmap) {
            self.stats.apply_failures += 1;
            tracing::error!(%epoch, error = %err, "Failed to apply wallpaper");
            return Err(err.into());
        }

        match result {
            SelectionResult::Lively => self.stats.lively_applied += 1,
            SelectionResult::Sleepy => self.stats.sleepy_applied += 1,
        }
        self.state = ControllerState::Resolved;

        let selection = Selection {
            epoch,
            roll,
            source,
            result,
            applied_at: Utc::now(),
        };
        tracing::info!(
            %epoch,
            %roll,
            source = ?selection.source,
            result = %selection.result,
            "Wallpaper applied"
        );

        Ok(UnlockOutcome::Applied(selection))
    }

    fn open_session(&mut self, epoch: Epoch) -> Result<LockSession, SelectionError> {
        let assets = self.load_assets()?;
        let roll = self.local.roll();
        Ok(LockSession::new(epoch, roll, assets))
    }

    fn load_assets(&mut self) -> Result<PreloadedAssets, AssetError> {
        match self.preloader.preload() {
            Ok(assets) => {
                self.last_good = Some(assets.clone());
                Ok(assets)
            }
            Err(err) => match &self.last_good {
                Some(previous) => {
                    self.stats.decode_fallbacks += 1;
                    tracing::warn!(
                        error = %err,
                        reused = previous.sequence(),
                        "Asset decode failed, reusing previous pair"
                    );
                    Ok(previous.clone())
                }
                None => {
                    tracing::error!(error = %err, "Asset decode failed with no previous pair");
                    Err(err)
                }
            },
        }
    }

    fn draw_local(&mut self) -> Bit {
        self.stats.local_draws += 1;
        self.local.next_bit()
    }
}

/// One remote attempt, never longer than `timeout`.
async fn fetch_bounded(remote: &dyn RemoteSource, timeout: Duration) -> Result<Bit, FetchError> {
    match tokio::time::timeout(timeout, remote.fetch(timeout)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(timeout)),
    }
}
