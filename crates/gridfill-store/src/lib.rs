//! Idempotent record storage for the gridfill pipeline.
//!
//! - [`RecordStore`] - Point lookup, create-if-absent write and earliest scan
//! - [`FileStore`] - One JSON document per record, partitioned by year
//! - [`MemoryStore`] - Ordered in-memory store for tests and dry runs
//! - [`StoreError`] - Failures, with [`StoreError::Unavailable`] kept apart
//!   from single-record problems

#![doc(issue_tracker_base_url = "https://github.com/factordynamics/gridfill/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod file;
mod memory;
mod store;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::{PutOutcome, RecordStore, Result, StoreError, StoreSummary};
