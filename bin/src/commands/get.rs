//! Record lookup.

use anyhow::{Context, Result, bail};
use gridfill_lib::{PipelineConfig, RecordId, RecordStore};

use crate::setup;

/// Execute the get command.
pub(crate) async fn get(config: &PipelineConfig, id: &str) -> Result<()> {
    let id = RecordId::parse(id).context("Invalid record id")?;
    let store = setup::open_store(config)?;

    let Some(record) = store.get(&id).await.context("Failed to read store")? else {
        bail!("Record not found: {id}");
    };

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
