//! Incremental acquisition of BMRS settlement-period data.
//!
//! This is a facade crate that re-exports functionality from the gridfill
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```ignore
//! use gridfill_lib::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::default();
//!     let store = Arc::new(FileStore::new(config.data_dir())?);
//!     let runner = CycleRunner::new(
//!         store,
//!         Arc::new(config.source()?),
//!         config.planner(),
//!         config.source_id()?,
//!         config.cycle_settings(),
//!     );
//!
//!     let report = runner.run(chrono::Utc::now(), &CancelToken::never()).await;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```

#![doc(issue_tracker_base_url = "https://github.com/factordynamics/gridfill/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use gridfill_types::*;

// Re-export fetch functionality
#[cfg(feature = "fetch")]
pub use gridfill_fetch::{
    BmrsSource, ClientConfig, Endpoint, FetchClient, FetchError, ParseError, RawBatch,
    RecordSource, parse_records, url,
};

// Re-export storage
#[cfg(feature = "store")]
pub use gridfill_store::{
    FileStore, MemoryStore, PutOutcome, RecordStore, StoreError, StoreSummary,
};

// Re-export the pipeline
#[cfg(feature = "ingest")]
pub use gridfill_ingest::{
    BackfillPlanner, CancelHandle, CancelToken, ConfigError, ConvertError, CycleId, CycleOutcome,
    CycleReport, CycleRunner, CycleSettings, PipelineConfig, Plan, Scheduler, SchedulerStats,
    convert,
};

/// Prelude module for convenient imports.
///
/// ```
/// use gridfill_lib::prelude::*;
/// ```
pub mod prelude {
    pub use gridfill_types::{
        FetchWindow, GridfillError, RawRecord, RecordId, SettlementPeriod, SourceId,
        StoredRecord,
    };

    #[cfg(feature = "fetch")]
    pub use gridfill_fetch::{BmrsSource, FetchClient, RawBatch, RecordSource};

    #[cfg(feature = "store")]
    pub use gridfill_store::{FileStore, MemoryStore, PutOutcome, RecordStore};

    #[cfg(feature = "ingest")]
    pub use gridfill_ingest::{
        BackfillPlanner, CancelHandle, CancelToken, CycleReport, CycleRunner, PipelineConfig,
        Plan, Scheduler,
    };
}
