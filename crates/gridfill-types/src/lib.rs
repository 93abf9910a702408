//! Core types for the gridfill acquisition pipeline.
//!
//! This crate provides the fundamental data structures shared by the fetch,
//! store and ingest crates:
//!
//! - [`FetchWindow`] - Half-open date range requested from the reporting API
//! - [`SettlementPeriod`] - Half-hour settlement period within a trading day
//! - [`SourceId`] - Normalized identity of a data series
//! - [`RecordId`] - Deterministic key derived from a series and period start
//! - [`RawRecord`] - Period-keyed row as returned by the reporting API
//! - [`StoredRecord`] - Persisted time-series data point

#![doc(issue_tracker_base_url = "https://github.com/factordynamics/gridfill/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod period;
mod record;
mod window;

pub use error::{GridfillError, WindowError};
pub use period::{PeriodError, SettlementPeriod};
pub use record::{IdError, RawRecord, RecordId, SourceId, StoredRecord};
pub use window::{DayIterator, FetchWindow};
