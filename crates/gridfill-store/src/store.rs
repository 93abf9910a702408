//! Record store interface.

use async_trait::async_trait;
use gridfill_types::{RecordId, StoredRecord};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store cannot be reached. Transient: callers should stop
    /// writing and retry on a later cycle.
    #[error("Store unavailable at '{path}': {source}")]
    Unavailable {
        /// The location that could not be accessed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A stored document could not be parsed.
    #[error("Corrupt record '{path}': {source}")]
    Corrupt {
        /// The document that could not be parsed.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// A record could not be serialized.
    #[error("Failed to serialize record {id}: {source}")]
    Serialize {
        /// The id of the record.
        id: RecordId,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// A blocking store task was cancelled or panicked.
    #[error("Store task failed: {0}")]
    Task(String),
}

impl StoreError {
    /// Returns true if the error means the whole store is unreachable, as
    /// opposed to a problem with a single record.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Task(_))
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Outcome of [`RecordStore::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The record was written.
    Inserted,
    /// A record with the same id already existed; nothing was written.
    AlreadyPresent,
}

/// Aggregate view of the store contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSummary {
    /// Number of stored records.
    pub count: usize,
    /// Record with the smallest period start.
    pub earliest: Option<StoredRecord>,
    /// Record with the largest period start.
    pub latest: Option<StoredRecord>,
}

/// Storage for [`StoredRecord`]s keyed by [`RecordId`].
///
/// Records are append-only: a write never replaces an existing record, so
/// repeated or concurrent writes of the same data point leave exactly one
/// copy behind.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Looks up a record by id. A missing record is `Ok(None)`.
    async fn get(&self, id: &RecordId) -> Result<Option<StoredRecord>>;

    /// Inserts a record unless one with the same id already exists.
    async fn put(&self, record: &StoredRecord) -> Result<PutOutcome>;

    /// Returns the record with the smallest period start (ties broken by
    /// id), or `None` if the store is empty.
    async fn earliest(&self) -> Result<Option<StoredRecord>>;

    /// Returns counts and bounds of the stored records.
    async fn summary(&self) -> Result<StoreSummary>;
}
