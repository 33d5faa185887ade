use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};

use crate::api::TrendSource;
use crate::common::{LiveFeed, TaskHandle};
use crate::trends::aggregate::{self, ParticulatePoint, TrendState};

/// Refresh the trend state now and then every `period`, whatever the outcome
/// of the previous cycle.
///
/// The returned handle owns the schedule; the receiver observes each new
/// state.
pub fn spawn_trend_refresh<S: TrendSource>(
    source: Arc<S>,
    region_id: i32,
    period: Duration,
) -> (TaskHandle, watch::Receiver<TrendState>) {
    let (tx, rx) = watch::channel(TrendState::Loading);

    let handle = TaskHandle::spawn("trends", async move {
        tracing::info!(region_id, period_secs = period.as_secs(), "Starting trends refresh");

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let state = aggregate::run_cycle(source.as_ref(), region_id).await;
            tx.send_replace(state);
        }
    });

    (handle, rx)
}

/// The trends view: refreshed AQI state plus the live feed it reads
/// particulates from. Dropping it stops the refresh.
pub struct TrendDashboard {
    state: watch::Receiver<TrendState>,
    feed: LiveFeed,
    _refresh: TaskHandle,
}

impl TrendDashboard {
    pub fn start<S: TrendSource>(
        source: Arc<S>,
        feed: LiveFeed,
        region_id: i32,
        period: Duration,
    ) -> Self {
        let (refresh, state) = spawn_trend_refresh(source, region_id, period);
        Self {
            state,
            feed,
            _refresh: refresh,
        }
    }

    #[must_use]
    pub fn state(&self) -> TrendState {
        self.state.borrow().clone()
    }

    /// Wait for the next refreshed state.
    ///
    /// Returns `None` once the refresh task is gone.
    pub async fn changed(&mut self) -> Option<TrendState> {
        self.state.changed().await.ok()?;
        Some(self.state.borrow_and_update().clone())
    }

    /// PM2.5/PM10 series: the live simulation buffer when it has readings,
    /// the latest history otherwise.
    #[must_use]
    pub fn particulate_series(&self) -> Vec<ParticulatePoint> {
        let live = self.feed.readings();
        let state = self.state.borrow();
        let series = state.report().map_or(&[][..], |r| r.series.as_slice());
        aggregate::particulate_series(&live, series)
    }
}
