//! Interval scheduler for the sync job.
//!
//! One worker task, distinct from the request handlers. The interval is
//! re-read from settings every tick so operators can retune it without a
//! restart. An operator-triggered sync in flight simply makes the
//! scheduled tick a no-op via the `SyncBusy` gate.

use std::sync::Arc;
use tokio::time::{Duration, sleep};

use crate::error::AppError;
use crate::settings::SettingsService;

use super::engine::SyncEngine;

pub async fn run_scheduler(engine: Arc<SyncEngine>, settings: Arc<SettingsService>) {
    tracing::info!("sync scheduler started");

    loop {
        let minutes = match settings.api().await {
            Ok(api) => api.sync_interval_minutes.max(1),
            Err(e) => {
                tracing::warn!("scheduler could not read settings: {e}");
                15
            }
        };
        sleep(Duration::from_secs(u64::from(minutes) * 60)).await;

        match engine.sync().await {
            Ok(report) => {
                tracing::info!(
                    orders = report.orders_fetched,
                    warnings = report.warnings,
                    "scheduled sync finished"
                );
            }
            Err(AppError::SyncBusy) => {
                tracing::debug!("scheduled sync skipped: another sync in flight");
            }
            Err(e) => {
                // Already stamped into the sync log; retry on the next tick.
                tracing::warn!("scheduled sync failed: {e}");
            }
        }
    }
}
