//! Store summary and backfill progress.

use anyhow::{Context, Result};
use chrono::Utc;
use gridfill_lib::{PipelineConfig, Plan, RecordStore};

use crate::setup;

/// Execute the status command.
pub(crate) async fn status(config: &PipelineConfig) -> Result<()> {
    let store = setup::open_store(config)?;
    let summary = store.summary().await.context("Failed to read store")?;
    let planner = config.planner();

    println!("Store: {}", store.base_path().display());
    println!("Records: {}", summary.count);

    let Some(earliest) = &summary.earliest else {
        println!("Store is empty; the first cycle fetches the last {} days", planner.lookback_days());
        return Ok(());
    };

    println!("Earliest: {} ({})", earliest.id(), earliest.period_start().format("%Y-%m-%d %H:%M"));
    if let Some(latest) = &summary.latest {
        println!("Latest: {} ({})", latest.id(), latest.period_start().format("%Y-%m-%d %H:%M"));
    }

    let frontier = earliest.settlement_date();
    let remaining = (frontier - planner.floor()).num_days().max(0);
    println!("Floor: {} ({remaining} days remaining)", planner.floor());

    match planner.plan(Some(earliest), Utc::now()) {
        Plan::Fetch(window) => println!("Next window: {window}"),
        Plan::BackfillComplete => println!("Backfill complete"),
    }
    Ok(())
}
