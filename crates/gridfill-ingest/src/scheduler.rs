//! Recurring cycle trigger.
//!
//! The scheduler owns a timer that fires once at startup and then every
//! interval. Each trigger starts a cycle on its own task unless the previous
//! cycle is still running, in which case the trigger is coalesced.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::cycle::{CancelToken, CycleReport, CycleRunner};

/// Statistics returned when the scheduler shuts down.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulerStats {
    /// Cycles started.
    pub cycles_run: u64,
    /// Triggers skipped because a cycle was still in flight.
    pub triggers_coalesced: u64,
    /// Report of the last cycle that finished.
    pub last_report: Option<CycleReport>,
}

/// Runs cycles on a fixed interval, at most one at a time.
#[derive(Debug)]
pub struct Scheduler {
    runner: Arc<CycleRunner>,
    interval: Duration,
}

impl Scheduler {
    /// Creates a scheduler. A zero interval is raised to one second.
    #[must_use]
    pub fn new(runner: Arc<CycleRunner>, interval: Duration) -> Self {
        Self {
            runner,
            interval: interval.max(Duration::from_secs(1)),
        }
    }

    /// Returns the trigger interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Triggers cycles until `cancel` fires, then waits for the in-flight
    /// cycle to observe cancellation and finish.
    pub async fn run(self, cancel: CancelToken) -> SchedulerStats {
        let mut stats = SchedulerStats::default();
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Busy token: present while a cycle may still be running.
        let mut in_flight: Option<JoinHandle<CycleReport>> = None;

        info!(interval_secs = self.interval.as_secs(), "Scheduler started");

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if let Some(handle) = in_flight.take() {
                if !handle.is_finished() {
                    stats.triggers_coalesced += 1;
                    debug!(coalesced = stats.triggers_coalesced, "Cycle still running, trigger coalesced");
                    in_flight = Some(handle);
                    continue;
                }
                collect(handle, &mut stats).await;
            }

            stats.cycles_run += 1;
            let runner = Arc::clone(&self.runner);
            let token = cancel.clone();
            in_flight = Some(tokio::spawn(async move {
                runner.run(Utc::now(), &token).await
            }));
        }

        info!("Shutdown requested, waiting for in-flight cycle");
        if let Some(handle) = in_flight {
            collect(handle, &mut stats).await;
        }

        info!(
            cycles_run = stats.cycles_run,
            triggers_coalesced = stats.triggers_coalesced,
            "Scheduler stopped"
        );
        stats
    }
}

async fn collect(handle: JoinHandle<CycleReport>, stats: &mut SchedulerStats) {
    match handle.await {
        Ok(report) => {
            if report.outcome.is_failure() {
                warn!(%report, "Cycle ended with failure");
            }
            stats.last_report = Some(report);
        }
        Err(e) => error!(error = %e, "Cycle task failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::{CancelHandle, CycleOutcome, CycleSettings};
    use crate::planner::BackfillPlanner;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use gridfill_fetch::{FetchError, RawBatch, RecordSource};
    use gridfill_store::MemoryStore;
    use gridfill_types::{FetchWindow, SourceId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source that takes `delay` per fetch and tracks concurrency.
    struct SlowSource {
        delay: Duration,
        active: AtomicUsize,
        max_active: AtomicUsize,
        calls: AtomicUsize,
    }

    impl SlowSource {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RecordSource for SlowSource {
        async fn fetch(&self, window: FetchWindow) -> Result<RawBatch, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(RawBatch::new(window, Vec::new()))
        }
    }

    fn runner(source: Arc<SlowSource>) -> Arc<CycleRunner> {
        Arc::new(CycleRunner::new(
            Arc::new(MemoryStore::new()),
            source,
            BackfillPlanner::new(7, NaiveDate::from_ymd_opt(2016, 1, 1).unwrap()),
            SourceId::new("B1620").unwrap(),
            CycleSettings::default(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_cycles_coalesce_triggers() {
        let source = Arc::new(SlowSource::new(Duration::from_secs(25)));
        let scheduler = Scheduler::new(runner(source.clone()), Duration::from_secs(10));
        let handle = CancelHandle::new();

        let task = tokio::spawn(scheduler.run(handle.token()));
        tokio::time::sleep(Duration::from_secs(65)).await;
        handle.cancel();
        let stats = task.await.unwrap();

        // Ticks at 0..=60s: cycles start at 0, 30 and 60; the rest coalesce.
        assert_eq!(stats.cycles_run, 3);
        assert_eq!(stats.triggers_coalesced, 4);
        assert_eq!(source.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_immediately_at_startup() {
        let source = Arc::new(SlowSource::new(Duration::from_millis(10)));
        let scheduler = Scheduler::new(runner(source.clone()), Duration::from_secs(3600));
        let handle = CancelHandle::new();

        let task = tokio::spawn(scheduler.run(handle.token()));
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.cancel();
        let stats = task.await.unwrap();

        assert_eq!(stats.cycles_run, 1);
        assert_eq!(stats.triggers_coalesced, 0);
        let report = stats.last_report.unwrap();
        assert_eq!(report.outcome, CycleOutcome::Completed);
        assert_eq!(report.windows.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_in_flight_cycle() {
        let source = Arc::new(SlowSource::new(Duration::from_secs(30)));
        let scheduler = Scheduler::new(runner(source.clone()), Duration::from_secs(3600));
        let handle = CancelHandle::new();

        let task = tokio::spawn(scheduler.run(handle.token()));
        tokio::time::sleep(Duration::from_secs(5)).await;
        handle.cancel();
        let stats = task.await.unwrap();

        assert_eq!(source.active.load(Ordering::SeqCst), 0);
        assert!(stats.last_report.is_some());
    }

    #[test]
    fn test_zero_interval_is_raised() {
        let source = Arc::new(SlowSource::new(Duration::ZERO));
        let scheduler = Scheduler::new(runner(source), Duration::ZERO);
        assert_eq!(scheduler.interval(), Duration::from_secs(1));
    }
}
