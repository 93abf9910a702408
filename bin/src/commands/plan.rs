//! Next-window preview.

use anyhow::{Context, Result};
use chrono::Utc;
use gridfill_lib::{PipelineConfig, Plan, RecordStore};

use crate::setup;

/// Execute the plan command.
pub(crate) async fn plan(config: &PipelineConfig) -> Result<()> {
    let store = setup::open_store(config)?;
    let earliest = store.earliest().await.context("Failed to read store")?;
    let planner = config.planner();

    match planner.plan(earliest.as_ref(), Utc::now()) {
        Plan::Fetch(window) => {
            println!("Next window: {window} ({} days)", window.total_days());
        }
        Plan::BackfillComplete => {
            println!("Backfill complete: history reaches {}", planner.floor());
        }
    }
    Ok(())
}
