//! Backfill planning, ingestion cycles and scheduling for gridfill.
//!
//! This crate ties the fetch and store crates into a recurring pipeline:
//!
//! - [`BackfillPlanner`] - Chooses the next window to fetch from the store's frontier
//! - [`convert`] - Turns a raw API row into a [`StoredRecord`](gridfill_types::StoredRecord)
//! - [`CycleRunner`] - Runs one plan → fetch → convert → store cycle
//! - [`CycleReport`] - Outcome and counts of a cycle
//! - [`Scheduler`] - Runs cycles at startup and on a fixed interval without overlap
//! - [`PipelineConfig`] - File and flag configurable settings

#![doc(issue_tracker_base_url = "https://github.com/factordynamics/gridfill/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod convert;
mod cycle;
mod planner;
mod scheduler;

pub use config::{ConfigError, PipelineConfig};
pub use convert::{ConvertError, convert};
pub use cycle::{
    CancelHandle, CancelToken, CycleId, CycleOutcome, CycleReport, CycleRunner, CycleSettings,
};
pub use planner::{BackfillPlanner, Plan};
pub use scheduler::{Scheduler, SchedulerStats};
