//! Error types for gridfill.

use chrono::NaiveDate;
use thiserror::Error;

use crate::FetchWindow;

/// Failure taxonomy of the acquisition pipeline.
///
/// None of these escape an ingestion cycle; they are counted in the cycle
/// report and the affected work is retried on a later trigger.
#[derive(Error, Debug)]
pub enum GridfillError {
    /// The backing store could not be reached.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The reporting API call for a window failed or timed out.
    #[error("Fetch failed for {window}: {reason}")]
    FetchFailed {
        /// The window that could not be fetched.
        window: FetchWindow,
        /// Description of the underlying failure.
        reason: String,
    },

    /// A raw record could not be converted into a stored record.
    #[error("Malformed record: {0}")]
    MalformedRecord(String),
}

/// Error for invalid fetch windows.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// Start date is after end date.
    #[error("Invalid window: {start} > {end}")]
    Inverted {
        /// The start date.
        start: NaiveDate,
        /// The end date.
        end: NaiveDate,
    },
}
