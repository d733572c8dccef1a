use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use iothub_core::{Clock, CronExpr};
use iothub_registry::{ActiveSchedule, ResourceRegistry};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::dispatch::DispatchSink;
use crate::error::Result;

/// Delay past the minute boundary before a pass runs, so the wall clock
/// has settled inside the new minute when it is read.
const SETTLE_MILLIS: i64 = 500;

/// Outcome of one matcher pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Active schedules considered.
    pub evaluated: usize,
    /// Dispatch tasks spawned.
    pub dispatched: usize,
    /// Schedules whose stored cron no longer parses.
    pub skipped: usize,
}

/// Evaluates active schedules once per UTC minute and fires due actions.
pub struct ScheduleMatcher {
    registry: Arc<ResourceRegistry>,
    sink: Arc<dyn DispatchSink>,
    clock: Arc<dyn Clock>,
    dispatch_timeout: Duration,
    /// Minute index (Unix seconds / 60) of the last evaluated minute.
    last_minute: Option<i64>,
}

impl ScheduleMatcher {
    pub fn new(
        registry: Arc<ResourceRegistry>,
        sink: Arc<dyn DispatchSink>,
        clock: Arc<dyn Clock>,
        dispatch_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            sink,
            clock,
            dispatch_timeout,
            last_minute: None,
        }
    }

    /// Main loop. Wakes just after every minute boundary until `shutdown`
    /// broadcasts `true` or its sender goes away.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("schedule matcher started");

        loop {
            // Re-aligned on every pass so wall-clock drift never accumulates.
            let wait = until_next_minute(self.clock.now());
            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    if let Err(e) = self.tick() {
                        error!("matcher pass failed: {e}");
                    }
                }
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        info!("schedule matcher shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Run a pass for the current minute unless that minute was already
    /// evaluated. Returns `None` for a repeated minute.
    pub fn tick(&mut self) -> Result<Option<PassReport>> {
        let now = self.clock.now();
        let minute = now.timestamp().div_euclid(60);
        if self.last_minute == Some(minute) {
            debug!(%now, "minute already evaluated");
            return Ok(None);
        }
        self.last_minute = Some(minute);
        self.run_pass(now).map(Some)
    }

    /// Evaluate every active schedule against `now` and spawn a dispatch task
    /// for each due one. Does not wait for any dispatch to finish.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn run_pass(&self, now: DateTime<Utc>) -> Result<PassReport> {
        let schedules = self.registry.active_schedules()?;
        let mut report = PassReport {
            evaluated: schedules.len(),
            ..PassReport::default()
        };

        for schedule in schedules {
            let cron = match CronExpr::parse(&schedule.cron_expression) {
                Ok(c) => c,
                Err(e) => {
                    warn!(
                        schedule_id = schedule.schedule_id,
                        cron = %schedule.cron_expression,
                        "skipping schedule with bad cron: {e}"
                    );
                    report.skipped += 1;
                    continue;
                }
            };
            if !cron.matches(now) {
                continue;
            }

            self.spawn_dispatch(schedule);
            report.dispatched += 1;
        }

        if report.dispatched > 0 {
            info!(
                %now,
                evaluated = report.evaluated,
                dispatched = report.dispatched,
                "matcher pass complete"
            );
        }
        Ok(report)
    }

    fn spawn_dispatch(&self, schedule: ActiveSchedule) {
        let sink = Arc::clone(&self.sink);
        let timeout = self.dispatch_timeout;
        tokio::spawn(async move {
            let ActiveSchedule {
                schedule_id,
                device_key,
                action,
                ..
            } = schedule;
            match tokio::time::timeout(timeout, sink.dispatch(&device_key, action)).await {
                Ok(Ok(())) => debug!(schedule_id, %device_key, %action, "dispatched"),
                Ok(Err(e)) => error!(schedule_id, %device_key, %action, "dispatch failed: {e}"),
                Err(_) => warn!(
                    schedule_id,
                    %device_key,
                    %action,
                    timeout_secs = timeout.as_secs(),
                    "dispatch timed out"
                ),
            }
        });
    }
}

/// Time from `now` until just past the next minute boundary.
fn until_next_minute(now: DateTime<Utc>) -> Duration {
    let into_minute = now.timestamp_millis().rem_euclid(60_000);
    let wait = 60_000 - into_minute + SETTLE_MILLIS;
    Duration::from_millis(wait as u64)
}
