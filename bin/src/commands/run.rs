//! Scheduled acquisition until interrupted.

use anyhow::Result;
use gridfill_lib::{CancelHandle, PipelineConfig, Scheduler};
use std::sync::Arc;
use tracing::{info, warn};

use crate::setup;

/// Execute the run command.
pub(crate) async fn run(config: &PipelineConfig) -> Result<()> {
    let runner = Arc::new(setup::build_runner(config)?);
    let scheduler = Scheduler::new(runner, config.interval());

    let handle = CancelHandle::new();
    let token = handle.token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, finishing current cycle");
                handle.cancel();
            }
            Err(e) => warn!(error = %e, "Cannot listen for Ctrl-C"),
        }
    });

    let stats = scheduler.run(token).await;

    println!(
        "Stopped after {} cycle(s), {} trigger(s) coalesced",
        stats.cycles_run, stats.triggers_coalesced
    );
    if let Some(report) = stats.last_report {
        println!("Last: {report}");
    }
    Ok(())
}
