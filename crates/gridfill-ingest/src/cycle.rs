//! One ingestion cycle: plan, fetch, convert and store.

use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use gridfill_fetch::{RawBatch, RecordSource};
use gridfill_store::{PutOutcome, RecordStore};
use gridfill_types::{FetchWindow, GridfillError, SourceId, StoredRecord};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::convert::convert;
use crate::planner::{BackfillPlanner, Plan};

/// Unique identifier for a cycle.
pub type CycleId = Uuid;

/// Sending side of a shared cancellation signal.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    /// Creates a new, untriggered handle.
    #[must_use]
    pub fn new() -> Self {
        Self(watch::Sender::new(false))
    }

    /// Signals cancellation to every token.
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }

    /// Returns a token observing this handle.
    #[must_use]
    pub fn token(&self) -> CancelToken {
        CancelToken(self.0.subscribe())
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of a cancellation signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelToken(watch::Receiver<bool>);

impl CancelToken {
    /// Returns a token that is never cancelled.
    #[must_use]
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self(rx)
    }

    /// Returns true once cancellation has been signalled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves when cancellation is signalled. Never resolves if the handle
    /// was dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.0.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Every planned window was fetched and stored.
    Completed,
    /// History already reaches the floor.
    BackfillComplete,
    /// A window could not be fetched; it is planned again next cycle.
    FetchFailed,
    /// The store could not be reached; remaining writes were abandoned.
    StoreUnavailable,
    /// Shutdown was requested before the cycle finished.
    Cancelled,
}

impl CycleOutcome {
    /// Returns the outcome as a string identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::BackfillComplete => "backfill-complete",
            Self::FetchFailed => "fetch-failed",
            Self::StoreUnavailable => "store-unavailable",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns true if the cycle ended because of a failure.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::FetchFailed | Self::StoreUnavailable)
    }
}

impl std::fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counts and outcome of one cycle. Not persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Cycle identifier, also recorded on the cycle's tracing span.
    pub id: CycleId,
    /// When the cycle started.
    pub started_at: DateTime<Utc>,
    /// When the cycle finished.
    pub finished_at: DateTime<Utc>,
    /// How the cycle ended.
    pub outcome: CycleOutcome,
    /// Windows attempted, in planner order.
    pub windows: Vec<FetchWindow>,
    /// Raw records fetched.
    pub fetched: usize,
    /// Records newly written.
    pub stored: usize,
    /// Records that were already in the store.
    pub already_present: usize,
    /// Raw records that could not be converted.
    pub malformed: usize,
    /// Store writes that failed.
    pub store_failures: usize,
    /// Window fetches that failed.
    pub fetch_failures: usize,
    /// Message of the last error encountered, if any.
    pub last_error: Option<String>,
}

impl CycleReport {
    fn start(id: CycleId) -> Self {
        let now = Utc::now();
        Self {
            id,
            started_at: now,
            finished_at: now,
            outcome: CycleOutcome::Completed,
            windows: Vec::new(),
            fetched: 0,
            stored: 0,
            already_present: 0,
            malformed: 0,
            store_failures: 0,
            fetch_failures: 0,
            last_error: None,
        }
    }

    /// Total count of malformed records and failed operations.
    #[must_use]
    pub const fn failures(&self) -> usize {
        self.malformed + self.store_failures + self.fetch_failures
    }

    fn fail(&mut self, error: &GridfillError) {
        self.last_error = Some(error.to_string());
    }
}

impl std::fmt::Display for CycleReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cycle {} {}: {} window(s), fetched {}, stored {}, already present {}, \
             malformed {}, store failures {}, fetch failures {}",
            self.id,
            self.outcome,
            self.windows.len(),
            self.fetched,
            self.stored,
            self.already_present,
            self.malformed,
            self.store_failures,
            self.fetch_failures,
        )
    }
}

/// Tunables of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSettings {
    /// Maximum windows processed per cycle.
    pub max_windows: u32,
    /// Maximum concurrent store writes.
    pub store_concurrency: usize,
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            max_windows: 1,
            store_concurrency: 8,
        }
    }
}

/// Runs ingestion cycles against a store and a source.
///
/// The runner remembers the start of the last window it stored, so windows
/// that yield no records still move the frontier backward on later cycles.
/// The position is held in memory only; a restart resumes from the store.
pub struct CycleRunner {
    store: Arc<dyn RecordStore>,
    source: Arc<dyn RecordSource>,
    planner: BackfillPlanner,
    source_id: SourceId,
    settings: CycleSettings,
    cursor: Mutex<Option<NaiveDate>>,
}

impl std::fmt::Debug for CycleRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CycleRunner")
            .field("planner", &self.planner)
            .field("source_id", &self.source_id)
            .field("settings", &self.settings)
            .field("cursor", &self.cursor())
            .finish_non_exhaustive()
    }
}

impl CycleRunner {
    /// Creates a runner.
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        source: Arc<dyn RecordSource>,
        planner: BackfillPlanner,
        source_id: SourceId,
        settings: CycleSettings,
    ) -> Self {
        Self {
            store,
            source,
            planner,
            source_id,
            settings: CycleSettings {
                max_windows: settings.max_windows.max(1),
                store_concurrency: settings.store_concurrency.max(1),
            },
            cursor: Mutex::new(None),
        }
    }

    /// Returns the start of the last window stored by this runner.
    #[must_use]
    pub fn cursor(&self) -> Option<NaiveDate> {
        *self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn advance_cursor(&self, start: NaiveDate) {
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        *cursor = Some(cursor.map_or(start, |c| c.min(start)));
    }

    /// Returns the planner.
    #[must_use]
    pub const fn planner(&self) -> &BackfillPlanner {
        &self.planner
    }

    /// Returns the store handle.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Runs one cycle. Never fails: every error is reflected in the report.
    pub async fn run(&self, now: DateTime<Utc>, cancel: &CancelToken) -> CycleReport {
        let id = Uuid::new_v4();
        let span = info_span!("cycle", %id);

        async move {
            let mut report = CycleReport::start(id);
            info!(source = %self.source_id, "Cycle started");

            report.outcome = self.execute(now, cancel, &mut report).await;
            report.finished_at = Utc::now();

            info!(
                outcome = %report.outcome,
                windows = report.windows.len(),
                fetched = report.fetched,
                stored = report.stored,
                already_present = report.already_present,
                malformed = report.malformed,
                store_failures = report.store_failures,
                fetch_failures = report.fetch_failures,
                "Cycle finished"
            );
            report
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        now: DateTime<Utc>,
        cancel: &CancelToken,
        report: &mut CycleReport,
    ) -> CycleOutcome {
        for _ in 0..self.settings.max_windows {
            if cancel.is_cancelled() {
                info!("Cancelled at window boundary");
                return CycleOutcome::Cancelled;
            }

            let earliest = match self.store.earliest().await {
                Ok(earliest) => earliest,
                Err(e) => {
                    error!(error = %e, "Cannot read store frontier");
                    report.store_failures += 1;
                    report.fail(&GridfillError::StoreUnavailable(e.to_string()));
                    return CycleOutcome::StoreUnavailable;
                }
            };

            let stored_frontier = earliest.as_ref().map(StoredRecord::settlement_date);
            let frontier = match (stored_frontier, self.cursor()) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };

            let window = match self.planner.plan_from_frontier(frontier, now) {
                Plan::Fetch(window) => window,
                Plan::BackfillComplete => {
                    info!(floor = %self.planner.floor(), "Backfill complete");
                    return CycleOutcome::BackfillComplete;
                }
            };

            report.windows.push(window);
            info!(%window, "Fetching window");

            let batch = match self.source.fetch(window).await {
                Ok(batch) => batch,
                Err(e) => {
                    let err = GridfillError::FetchFailed {
                        window,
                        reason: e.to_string(),
                    };
                    warn!(error = %err, "Window fetch failed");
                    report.fetch_failures += 1;
                    report.fail(&err);
                    return CycleOutcome::FetchFailed;
                }
            };

            debug!(%window, records = batch.len(), "Window fetched");
            report.fetched += batch.len();

            if let Err(err) = self.store_batch(batch, report).await {
                error!(error = %err, "Store unavailable, abandoning cycle");
                report.fail(&err);
                return CycleOutcome::StoreUnavailable;
            }

            self.advance_cursor(window.start);
        }

        CycleOutcome::Completed
    }

    /// Converts and writes a batch. Returns `StoreUnavailable` if the store
    /// goes away; other failures are counted and skipped.
    async fn store_batch(
        &self,
        batch: RawBatch,
        report: &mut CycleReport,
    ) -> Result<(), GridfillError> {
        let mut records: Vec<StoredRecord> = Vec::with_capacity(batch.len());
        for raw in batch {
            match convert(&raw, &self.source_id) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(error = %e, ?raw, "Skipping malformed record");
                    report.malformed += 1;
                    report.fail(&GridfillError::from(e));
                }
            }
        }

        let store = &self.store;
        let mut puts = stream::iter(records)
            .map(|record| async move {
                let result = store.put(&record).await;
                (record, result)
            })
            .buffer_unordered(self.settings.store_concurrency);

        while let Some((record, result)) = puts.next().await {
            match result {
                Ok(PutOutcome::Inserted) => report.stored += 1,
                Ok(PutOutcome::AlreadyPresent) => report.already_present += 1,
                Err(e) if e.is_unavailable() => {
                    report.store_failures += 1;
                    return Err(GridfillError::StoreUnavailable(e.to_string()));
                }
                Err(e) => {
                    warn!(id = %record.id(), error = %e, "Store write failed");
                    report.store_failures += 1;
                    report.last_error = Some(e.to_string());
                }
            }
        }

        Ok(())
    }
}
