//! Periodic maintenance loop driving the recovery passes.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::recovery::RecoveryService;

/// Runs the incomplete, stale, and retention passes on a timer until
/// the service's shutdown token fires.
///
/// The first pass lands one sweep interval after start; embedders that
/// want recovery at boot call [`RecoveryService::recover_incomplete`]
/// directly before spawning the sweeper.
pub struct RecoverySweeper {
    service: Arc<RecoveryService>,
    shutdown_token: CancellationToken,
}

impl std::fmt::Debug for RecoverySweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoverySweeper").finish_non_exhaustive()
    }
}

impl RecoverySweeper {
    pub fn new(service: Arc<RecoveryService>) -> Self {
        let shutdown_token = service.shutdown_token();
        Self {
            service,
            shutdown_token,
        }
    }

    /// Loops until shutdown. Intended to be spawned:
    /// `tokio::spawn(sweeper.run())`.
    pub async fn run(self) {
        let config = self.service.config().clone();
        let sweep_interval = config.sweep.interval();
        let cleanup_interval = config.sweep.cleanup_interval();
        let mut last_cleanup = tokio::time::Instant::now();

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    info!("Recovery sweeper shutting down");
                    break;
                }
                _ = tokio::time::sleep(sweep_interval) => {
                    let incomplete = self.service.recover_incomplete().await;
                    let stale = self.service.recover_stale(config.stale.timeout()).await;
                    debug!(
                        recovered = incomplete.recovered + stale.recovered,
                        failed = incomplete.failed + stale.failed,
                        abandoned = stale.abandoned,
                        "sweep pass finished"
                    );

                    if last_cleanup.elapsed() >= cleanup_interval {
                        self.service
                            .cleanup_completed(config.retention.completed_days)
                            .await;
                        last_cleanup = tokio::time::Instant::now();
                    }
                }
            }
        }
    }
}
