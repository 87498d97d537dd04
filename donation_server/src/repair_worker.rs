use std::time::Duration;

use donation_engine::{AggregatePropagator, SqliteDatabase};
use log::*;
use tokio::task::JoinHandle;

/// Number of journal entries replayed per pass.
pub const REPAIR_BATCH_SIZE: i64 = 500;

/// Starts the propagation repair worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every `interval` the worker replays propagation journal entries that were committed alongside a status change but
/// whose aggregate update never landed.
pub fn start_repair_worker(db: SqliteDatabase, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let propagator = AggregatePropagator::new(db);
        info!("🩹️ Aggregate repair worker started. Running every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            debug!("🩹️ Running aggregate repair job");
            match propagator.replay_pending(REPAIR_BATCH_SIZE).await {
                Ok(summary) if summary.failed > 0 => {
                    warn!("🩹️ {} journal entries are still unapplied and will be retried", summary.failed);
                },
                Ok(summary) => trace!("🩹️ Repair pass complete. {} entries applied", summary.applied),
                Err(e) => {
                    error!("🩹️ Error running aggregate repair job: {e}");
                },
            }
        }
    })
}
