//! Periodic refresh scheduler for exporter mode.
//!
//! Runs an initial collection immediately on start, then repeats on the
//! configured interval. The loop is single-flight: a cycle runs to
//! completion before the next interval starts counting, so cycles never
//! overlap and missed ticks are absorbed rather than queued. A failed cycle
//! is logged and the previously published snapshot stays servable.

use std::sync::Arc;
use std::time::Duration;

use ratewatch_core::CycleService;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::error::{SchedulerError, SchedulerResult};
use super::snapshot::SnapshotSlot;
use crate::http::client::backoff_delay;

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Configuration for the refresh scheduler
#[derive(Debug, Clone)]
pub struct RefreshSchedulerConfig {
    /// Interval between refresh cycles
    pub interval: Duration,
    /// Cycle-level attempt budget for the initial collection; later cycles
    /// get a single try per tick because the next tick retries anyway.
    pub initial_max_attempts: u32,
    /// Base delay between initial-collection attempts
    pub initial_backoff: Duration,
    /// How long `stop` waits for the background task before aborting it
    pub drain_timeout: Duration,
}

impl Default for RefreshSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(
                ratewatch_domain::constants::DEFAULT_REFRESH_INTERVAL_SECS,
            ),
            initial_max_attempts: ratewatch_domain::constants::INITIAL_COLLECTION_MAX_ATTEMPTS,
            initial_backoff: Duration::from_secs(2),
            drain_timeout: Duration::from_secs(5),
        }
    }
}

/// Periodic refresh scheduler publishing into a [`SnapshotSlot`].
pub struct RefreshScheduler {
    service: Arc<CycleService>,
    slot: SnapshotSlot,
    config: RefreshSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl RefreshScheduler {
    pub fn new(
        service: Arc<CycleService>,
        slot: SnapshotSlot,
        config: RefreshSchedulerConfig,
    ) -> Self {
        Self {
            service,
            slot,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Handle to the snapshot slot this scheduler publishes into.
    pub fn slot(&self) -> SnapshotSlot {
        self.slot.clone()
    }

    /// Start the scheduler
    ///
    /// Spawns a background task that performs the initial collection
    /// immediately and then refreshes periodically.
    ///
    /// # Errors
    /// Returns an error if the scheduler is already running.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running().await {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(interval_seconds = self.config.interval.as_secs(), "Starting refresh scheduler");

        // Create a new cancellation token (supports restart after stop)
        self.cancellation_token = CancellationToken::new();

        let service = Arc::clone(&self.service);
        let slot = self.slot.clone();
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::refresh_loop(service, slot, config, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);

        info!("Refresh scheduler started");
        Ok(())
    }

    /// Stop the scheduler gracefully
    ///
    /// Cancels the background task and awaits completion within the drain
    /// budget; an overrunning in-flight cycle is abandoned after that.
    ///
    /// # Errors
    /// Returns an error if the scheduler is not running.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running().await {
            return Err(SchedulerError::NotRunning);
        }

        info!("Stopping refresh scheduler");
        self.cancellation_token.cancel();

        if let Some(mut handle) = self.task_handle.lock().await.take() {
            match tokio::time::timeout(self.config.drain_timeout, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => return Err(SchedulerError::TaskJoinFailed(err.to_string())),
                Err(_) => {
                    warn!("Refresh task did not drain in time; abandoning in-flight cycle");
                    handle.abort();
                    return Err(SchedulerError::StopTimeout {
                        seconds: self.config.drain_timeout.as_secs(),
                    });
                }
            }
        }

        info!("Refresh scheduler stopped");
        Ok(())
    }

    /// Check if the scheduler has an active task handle.
    pub async fn is_running(&self) -> bool {
        self.task_handle.lock().await.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    /// Background refresh loop
    async fn refresh_loop(
        service: Arc<CycleService>,
        slot: SnapshotSlot,
        config: RefreshSchedulerConfig,
        cancel: CancellationToken,
    ) {
        // Initial collection: critical for exporter startup, so it gets a
        // cycle-level retry budget on top of the client's own retries.
        Self::initial_collection(&service, &slot, &config, &cancel).await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Refresh loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(config.interval) => {
                    // Single-flight: the cycle runs inline, so the next tick
                    // cannot fire until this one completes.
                    match service.run_cycle().await {
                        Ok(report) => {
                            info!(
                                selected = report.results.len(),
                                failed = report.stats.failed,
                                "Publishing refreshed snapshot"
                            );
                            slot.publish(report);
                        }
                        Err(err) => {
                            // Keep serving the last good snapshot.
                            error!(error = %err, "Refresh cycle failed; previous snapshot remains published");
                        }
                    }
                }
            }
        }
    }

    async fn initial_collection(
        service: &Arc<CycleService>,
        slot: &SnapshotSlot,
        config: &RefreshSchedulerConfig,
        cancel: &CancellationToken,
    ) {
        let attempts = config.initial_max_attempts.max(1);
        for attempt in 1..=attempts {
            if cancel.is_cancelled() {
                return;
            }
            match service.run_cycle().await {
                Ok(report) => {
                    info!(selected = report.results.len(), "Initial collection complete");
                    slot.publish(report);
                    return;
                }
                Err(err) => {
                    if attempt < attempts {
                        let delay = backoff_delay(config.initial_backoff, attempt, config.interval);
                        warn!(
                            attempt,
                            error = %err,
                            delay_seconds = delay.as_secs(),
                            "Initial collection failed, retrying"
                        );
                        tokio::select! {
                            _ = cancel.cancelled() => return,
                            _ = tokio::time::sleep(delay) => {}
                        }
                    } else {
                        error!(
                            attempts,
                            error = %err,
                            "Initial collection failed; serving not-ready until the next cycle"
                        );
                    }
                }
            }
        }
    }
}
