//! Single acquisition cycle.

use anyhow::{Result, bail};
use chrono::Utc;
use gridfill_lib::{CancelHandle, PipelineConfig};

use crate::setup;

/// Execute the once command.
pub(crate) async fn once(config: &PipelineConfig) -> Result<()> {
    let runner = setup::build_runner(config)?;

    let handle = CancelHandle::new();
    let token = handle.token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    let report = runner.run(Utc::now(), &token).await;

    println!("{report}");
    for window in &report.windows {
        println!("  window {window}");
    }
    if let Some(err) = &report.last_error {
        println!("  last error: {err}");
    }

    if report.outcome.is_failure() {
        bail!("Cycle ended with {}", report.outcome);
    }
    Ok(())
}
