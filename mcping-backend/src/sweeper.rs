use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::helpers::now_ms;
use crate::pipeline::StatusPipeline;

/// Periodically sweep the pipeline's maps until `shutdown` is cancelled.
pub fn spawn_sweeper(
    pipeline: Arc<StatusPipeline>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("sweeper stopped");
                    return;
                }
                _ = ticker.tick() => {
                    pipeline.sweep(now_ms()).await;
                }
            }
        }
    })
}
