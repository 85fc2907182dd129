//! Optional timer-driven refresh.
//!
//! Adapters are pull-based: data is fetched when a caller asks for it. For
//! charts whose refresh policy sets `auto_refresh`, a background task can keep
//! the cache warm on `refresh_interval_ms`.

use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::data_adapter::DataAdapter;
use crate::errors::ChartDataError;
use crate::models::DatasetRow;

/// Starts the background refresher for `adapter`.
///
/// Returns `None` when the chart's refresh policy does not enable auto refresh.
/// If nothing is cached yet the first refresh runs immediately. The task stops when `shutdown` is cancelled; an in-progress refresh is
/// abandoned at that point.
pub fn spawn_auto_refresh<R: DatasetRow>(
    adapter: DataAdapter<R>,
    shutdown: CancellationToken,
) -> Option<JoinHandle<()>> {
    let policy = adapter.requirements().refresh();
    if !policy.auto_refresh() {
        return None;
    }
    let period = policy.refresh_interval();

    Some(tokio::spawn(async move {
        info!(
            "Auto refresh started for '{}' ({:?} interval)",
            adapter.chart_type(),
            period
        );

        // A cold cache is warmed right away, a warm one waits a full period
        let first_tick = if adapter.cached().is_some() {
            Instant::now() + period
        } else {
            Instant::now()
        };
        let mut ticker = interval_at(first_tick, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => run_scheduled_refresh(&adapter, &shutdown).await,
            }
        }

        info!("Auto refresh stopped for '{}'", adapter.chart_type());
    }))
}

/// Runs a single scheduled refresh.
async fn run_scheduled_refresh<R: DatasetRow>(
    adapter: &DataAdapter<R>,
    shutdown: &CancellationToken,
) {
    debug!("Running scheduled refresh for '{}'", adapter.chart_type());

    match adapter.force_refetch(Some(shutdown)).await {
        Ok(report) => debug!(
            "Scheduled refresh for '{}' completed: {}",
            adapter.chart_type(),
            report.diagnostics.summary()
        ),
        Err(ChartDataError::Cancelled) => {}
        Err(ChartDataError::ChartDisabled(_)) => {
            debug!("Scheduled refresh skipped: '{}' is disabled", adapter.chart_type());
        }
        Err(e) => warn!(
            "Scheduled refresh for '{}' failed: {}",
            adapter.chart_type(),
            e
        ),
    }
}
