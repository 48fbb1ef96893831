//! Server-side advance trigger.
//!
//! Listeners normally advance the station when their local clock says the
//! track is over. The ticker makes the same conditional advance on a fixed
//! period so the station keeps moving with nobody tuned in. It goes through
//! the same compare-and-swap as every listener, so it can never double-skip.

use std::sync::Arc;
use std::time::Duration;

use radar_core::rotation::AdvanceTrigger;
use radar_db::DbPool;
use radar_events::EventBus;
use tokio_util::sync::CancellationToken;

use crate::engine::{advance, AdvanceOutcome};

/// Run the station ticker loop until `cancel` is triggered.
pub async fn run(
    pool: DbPool,
    event_bus: Arc<EventBus>,
    period: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(interval_secs = period.as_secs(), "Station ticker started");

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Station ticker stopping");
                break;
            }
            _ = interval.tick() => {
                match advance(&pool, &event_bus, AdvanceTrigger::Scheduler).await {
                    Ok(AdvanceOutcome::Switched { new_track_id }) => {
                        tracing::info!(new_track_id, "Station ticker advanced the station");
                    }
                    Ok(AdvanceOutcome::WentIdle) => {
                        tracing::info!("Station ticker moved the station to idle");
                    }
                    Ok(outcome) => {
                        tracing::trace!(?outcome, "Station ticker: nothing to do");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Station ticker: advance failed");
                    }
                }
            }
        }
    }
}
