//! Expiry sweep.
//!
//! [`ShareService::sweep`] evicts every expired share in one pass.
//! [`ExpirySweeper`] runs it on a repeating timer until cancelled.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::service::ShareService;
use crate::Result;

/// Default sweep interval in seconds (daily).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 86400;

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Ids of the evicted shares.
    pub evicted: Vec<String>,
    /// Number of shares still registered.
    pub retained: usize,
    /// Blobs that could not be deleted and were leaked.
    pub blob_failures: usize,
}

impl ShareService {
    /// Evict every share whose expiry is strictly before now.
    ///
    /// The valid subset is written in a single store replace. Blobs of
    /// evicted shares are deleted afterwards; a failure there is logged and
    /// counted but does not stop the sweep. Subscribers receive the new
    /// list only when something was evicted, before any other mutation
    /// can change it.
    pub async fn sweep(&self) -> Result<SweepReport> {
        let now = self.clock.now();

        let (expired, valid) = {
            let _guard = self.write_lock.lock().await;
            let (expired, valid): (Vec<_>, Vec<_>) = self
                .store
                .list()
                .into_iter()
                .partition(|r| r.is_expired_at(now));

            if !expired.is_empty() {
                self.store.upsert_all(valid.clone()).await?;
                // Under the lock, so notifications arrive in store order.
                let _ = self.changes.send(valid.clone());
            }
            (expired, valid)
        };

        let mut report = SweepReport {
            evicted: Vec::with_capacity(expired.len()),
            retained: valid.len(),
            blob_failures: 0,
        };

        if expired.is_empty() {
            debug!(retained = report.retained, "Sweep found no expired shares");
            return Ok(report);
        }

        for record in &expired {
            if !self.discard_blob(record).await {
                report.blob_failures += 1;
            }
            debug!(id = %record.id, name = %record.name, "Evicted expired share");
            report.evicted.push(record.id.clone());
        }

        info!(
            evicted = report.evicted.len(),
            retained = report.retained,
            blob_failures = report.blob_failures,
            "Expired shares swept"
        );

        Ok(report)
    }
}

/// Background task that sweeps expired shares on a fixed interval.
///
/// The first sweep runs as soon as the task starts.
pub struct ExpirySweeper {
    service: Arc<ShareService>,
    interval: Duration,
}

impl ExpirySweeper {
    /// Create a sweeper with the default daily interval.
    pub fn new(service: Arc<ShareService>) -> Self {
        Self::with_interval(service, Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS))
    }

    /// Create a sweeper with a custom interval.
    pub fn with_interval(service: Arc<ShareService>, interval: Duration) -> Self {
        Self {
            service,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Interval between sweeps.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Expiry sweeper started"
        );

        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                _ = timer.tick() => {
                    if let Err(e) = self.service.sweep().await {
                        error!(error = %e, "Expiry sweep failed");
                    }
                }
            }
        }

        info!("Expiry sweeper stopped");
    }

    /// Spawn the sweeper on the current runtime.
    ///
    /// The task stops when `cancel` (or the returned handle) is cancelled.
    pub fn start(self, cancel: &CancellationToken) -> SweeperHandle {
        let cancel = cancel.child_token();
        let handle = tokio::spawn(self.run(cancel.clone()));
        SweeperHandle { cancel, handle }
    }
}

/// Handle to a running [`ExpirySweeper`].
pub struct SweeperHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the sweeper and wait for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Expiry sweeper task ended abnormally");
        }
    }
}
