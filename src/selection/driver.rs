//! Serialises platform lifecycle events into the controller.
//!
//! Lock and unlock never overlap. An unlock that resolves locally always
//! runs to completion, even with a lock already queued behind it. A lock
//! that arrives while an unlock is still waiting on the remote source
//! cancels that unlock outright; its late result can no longer reach the
//! sink.

use super::controller::{SelectionController, SelectionStats, UnlockOutcome};
use super::session::Epoch;
use super::Selection;
use crate::metrics::{MetricsRegistry, MetricsSnapshot};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Events delivered by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Lock,
    Unlock,
}

/// What happened for each handled event.
#[derive(Debug, Clone)]
pub enum CycleReport {
    Locked(Epoch),
    Applied(Selection),
    /// The unlock finished but a newer lock had superseded it.
    Discarded(Epoch),
    /// The unlock was cancelled by a lock before it finished.
    Cancelled,
    Failed(String),
}

#[derive(Debug, Clone, Error)]
#[error("lifecycle driver has shut down")]
pub struct DriverClosed;

/// Sending side used by the platform glue.
#[derive(Debug, Clone)]
pub struct LifecycleHandle {
    events: mpsc::Sender<LifecycleEvent>,
}

impl LifecycleHandle {
    pub async fn lock(&self) -> Result<(), DriverClosed> {
        self.send(LifecycleEvent::Lock).await
    }

    pub async fn unlock(&self) -> Result<(), DriverClosed> {
        self.send(LifecycleEvent::Unlock).await
    }

    pub async fn send(&self, event: LifecycleEvent) -> Result<(), DriverClosed> {
        self.events.send(event).await.map_err(|_| DriverClosed)
    }
}

enum UnlockStep {
    Finished,
    Interrupted(LifecycleEvent),
}

/// Owns the controller and processes events until every handle is dropped.
pub struct LifecycleDriver {
    controller: SelectionController,
    events: mpsc::Receiver<LifecycleEvent>,
    reports: Option<mpsc::UnboundedSender<CycleReport>>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl LifecycleDriver {
    /// Event queue depth.
    const CHANNEL_CAPACITY: usize = 16;

    pub fn new(controller: SelectionController) -> (Self, LifecycleHandle) {
        let (tx, rx) = mpsc::channel(Self::CHANNEL_CAPACITY);
        let driver = Self {
            controller,
            events: rx,
            reports: None,
            metrics: None,
        };
        (driver, LifecycleHandle { events: tx })
    }

    /// Streams a report for every handled event.
    pub fn with_reports(mut self, reports: mpsc::UnboundedSender<CycleReport>) -> Self {
        self.reports = Some(reports);
        self
    }

    /// Publishes controller counters after every handled event.
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Runs until the event channel closes and returns the final counters.
    pub async fn run(mut self) -> SelectionStats {
        let mut pending = None;

        loop {
            let event = match pending.take() {
                Some(event) => event,
                None => match self.events.recv().await {
                    Some(event) => event,
                    None => break,
                },
            };

            match event {
                LifecycleEvent::Lock => self.handle_lock(),
                LifecycleEvent::Unlock => {
                    if let UnlockStep::Interrupted(next) = self.handle_unlock().await {
                        pending = Some(next);
                    }
                }
            }
            self.publish_metrics();
        }

        tracing::info!("Lifecycle driver stopped");
        self.controller.stats().clone()
    }

    fn handle_lock(&mut self) {
        match self.controller.on_lock() {
            Ok(epoch) => self.report(CycleReport::Locked(epoch)),
            Err(err) => {
                tracing::error!(error = %err, "Lock handling failed");
                self.report(CycleReport::Failed(err.to_string()));
            }
        }
    }

    async fn handle_unlock(&mut self) -> UnlockStep {
        let (result, step) = {
            let unlock = self.controller.on_unlock();
            tokio::pin!(unlock);

            // The unlock is polled first so that one resolving without the
            // network always completes; only a suspended fetch is cancellable.
            loop {
                tokio::select! {
                    biased;
                    result = &mut unlock => break (Some(result), UnlockStep::Finished),
                    event = self.events.recv() => match event {
                        Some(LifecycleEvent::Unlock) => {
                            tracing::debug!("Ignoring unlock while one is in flight");
                        }
                        Some(LifecycleEvent::Lock) => {
                            break (None, UnlockStep::Interrupted(LifecycleEvent::Lock));
                        }
                        None => break (Some((&mut unlock).await), UnlockStep::Finished),
                    },
                }
            }
        };

        match result {
            Some(Ok(UnlockOutcome::Applied(selection))) => {
                self.report(CycleReport::Applied(selection))
            }
            Some(Ok(UnlockOutcome::Discarded { epoch })) => {
                self.report(CycleReport::Discarded(epoch))
            }
            Some(Err(err)) => {
                tracing::error!(error = %err, "Unlock handling failed");
                self.report(CycleReport::Failed(err.to_string()));
            }
            None => {
                tracing::warn!("Unlock cancelled by a new lock");
                self.report(CycleReport::Cancelled);
            }
        }

        step
    }

    fn publish_metrics(&self) {
        if let Some(metrics) = &self.metrics {
            let snapshot = MetricsSnapshot::from_stats(
                self.controller.stats(),
                self.controller.session().is_some(),
            );
            metrics.update(&snapshot);
        }
    }

    fn report(&self, report: CycleReport) {
        if let Some(reports) = &self.reports {
            // Receiver may be gone; reports are best-effort.
            let _ = reports.send(report);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{MockPreloader, ResourceId};
    use crate::entropy::{Bit, MockRemoteSource, MockReply, ScriptedSource};
    use crate::platform::{RecordingSink, SharedConnectivity};
    use crate::selection::{ControllerConfig, SelectionResult};
    use std::time::Duration;

    fn controller(
        remote: MockRemoteSource,
        local: ScriptedSource,
        sink: RecordingSink,
    ) -> SelectionController {
        SelectionController::new(
            ControllerConfig {
                fetch_timeout: Duration::from_secs(5),
                ..Default::default()
            },
            MockPreloader::new(),
            SharedConnectivity::new(true),
            Arc::new(remote),
            local,
            sink,
        )
    }

    #[tokio::test]
    async fn test_driver_runs_cycles() {
        let local = ScriptedSource::new();
        local.push_rolls([50, 50]).push_bits([Bit::One, Bit::Zero]);
        let sink = RecordingSink::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let (driver, handle) =
            LifecycleDriver::new(controller(MockRemoteSource::new(), local, sink.clone()));
        let driver = driver.with_reports(tx);
        let task = tokio::spawn(driver.run());

        for _ in 0..2 {
            handle.lock().await.unwrap();
            handle.unlock().await.unwrap();
        }
        drop(handle);

        let stats = task.await.unwrap();
        assert_eq!(stats.locks, 2);
        assert_eq!(stats.unlocks, 2);
        assert_eq!(
            sink.applied(),
            vec![ResourceId::SleepyCat, ResourceId::LivelyCat]
        );

        let mut applied = Vec::new();
        while let Ok(report) = rx.try_recv() {
            if let CycleReport::Applied(selection) = report {
                applied.push(selection.result);
            }
        }
        assert_eq!(
            applied,
            vec![SelectionResult::Sleepy, SelectionResult::Lively]
        );
    }

    #[tokio::test]
    async fn test_lock_cancels_pending_unlock() {
        let (remote, gate) = MockRemoteSource::new().gated();
        remote.push_replies([MockReply::Byte(1)]);
        let local = ScriptedSource::new();
        local.push_rolls([7, 50]).push_bits([Bit::Zero]);
        let sink = RecordingSink::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let (driver, handle) = LifecycleDriver::new(controller(remote.clone(), local, sink.clone()));
        let task = tokio::spawn(driver.with_reports(tx).run());

        handle.lock().await.unwrap();
        handle.unlock().await.unwrap();

        // Wait until the remote fetch is in flight.
        while remote.calls() == 0 {
            tokio::task::yield_now().await;
        }

        handle.lock().await.unwrap();
        handle.unlock().await.unwrap();
        drop(handle);

        let stats = task.await.unwrap();
        // The gate was never opened; the late remote byte must not surface.
        drop(gate);

        assert_eq!(sink.applied(), vec![ResourceId::LivelyCat]);
        assert_eq!(stats.locks, 2);

        let reports: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert!(reports
            .iter()
            .any(|r| matches!(r, CycleReport::Cancelled)));
    }

    #[tokio::test]
    async fn test_queued_lock_does_not_drop_local_unlock() {
        for online in [false, true] {
            for _ in 0..25 {
                let local = ScriptedSource::new();
                local.push_rolls([50, 50]).push_bits([Bit::One]);
                let remote = MockRemoteSource::new();
                let sink = RecordingSink::new();
                let controller = SelectionController::new(
                    ControllerConfig::default(),
                    MockPreloader::new(),
                    SharedConnectivity::new(online),
                    Arc::new(remote.clone()),
                    local,
                    sink.clone(),
                );
                let (tx, mut rx) = mpsc::unbounded_channel();
                let (driver, handle) = LifecycleDriver::new(controller);

                handle.lock().await.unwrap();
                handle.unlock().await.unwrap();
                handle.lock().await.unwrap();
                drop(handle);
                let stats = driver.with_reports(tx).run().await;

                assert_eq!(stats.locks, 2);
                assert_eq!(stats.unlocks, 1);
                assert_eq!(remote.calls(), 0);
                assert_eq!(sink.applied(), vec![ResourceId::SleepyCat]);

                let reports: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
                assert!(!reports
                    .iter()
                    .any(|r| matches!(r, CycleReport::Cancelled)));
            }
        }
    }

    #[tokio::test]
    async fn test_closed_channel_finishes_unlock() {
        let local = ScriptedSource::new();
        local.push_bits([Bit::One]);
        let sink = RecordingSink::new();

        let (driver, handle) =
            LifecycleDriver::new(controller(MockRemoteSource::new(), local, sink.clone()));
        handle.lock().await.unwrap();
        handle.unlock().await.unwrap();
        drop(handle);

        let stats = driver.run().await;

        assert_eq!(stats.unlocks, 1);
        assert_eq!(sink.applied(), vec![ResourceId::SleepyCat]);
    }

    #[tokio::test]
    async fn test_driver_publishes_metrics() {
        let metrics = Arc::new(MetricsRegistry::new().unwrap());
        let (driver, handle) = LifecycleDriver::new(controller(
            MockRemoteSource::new(),
            ScriptedSource::new(),
            RecordingSink::new(),
        ));
        let driver = driver.with_metrics(Arc::clone(&metrics));

        handle.lock().await.unwrap();
        handle.unlock().await.unwrap();
        handle.lock().await.unwrap();
        drop(handle);
        driver.run().await;

        let output = metrics.encode().unwrap();
        assert!(output.contains("unlock_wallpaper_locks_total 2"));
        assert!(output.contains("unlock_wallpaper_session_open 1"));
        assert!(output.contains(r#"unlock_wallpaper_applied_total{wallpaper="lively"} 1"#));
    }
}
