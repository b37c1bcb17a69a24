//! The `run` command.

use std::sync::Arc;

use eyre::Result;
use tally_observability::install_prometheus;
use tally_tasks::TaskManager;
use tally_tracker::PollScheduler;
use tracing::{error, info, warn};

use crate::cli::RunArgs;
use crate::config::TallyConfig;
use crate::launch::{self, SHUTDOWN_TIMEOUT};

/// Load the tracker and poll until Ctrl+C or a critical task failure.
pub(crate) async fn run(args: RunArgs) -> Result<()> {
    install_prometheus(&args.metrics)?;

    let mut config = TallyConfig::load(Some(&args.config.config))?;
    config.apply_overrides(args.score_dir, args.no_record);
    config.validate()?;

    let task_manager = TaskManager::current();
    let executor = task_manager.executor();
    let tracker = launch::build(&config, &executor)?;

    let report = tracker.engine.load().await?;
    info!(
        replayed = report.replayed,
        skipped = report.skipped,
        recovered = report.recovery.ingested,
        "Tracker loaded"
    );

    Arc::clone(&tracker.maps).spawn(&executor, config.map_check_interval());
    PollScheduler::new(Arc::clone(&tracker.engine)).spawn(&executor);

    info!(
        players = config.players.len(),
        maps = config.maps.len(),
        recording = tracker.engine.is_recording(),
        "Tracking started (press Ctrl+C to stop)"
    );

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        () = executor.wait_for_shutdown() => {
            error!("Critical task failed");
        }
    }

    if !task_manager.graceful_shutdown_with_timeout(SHUTDOWN_TIMEOUT).await {
        warn!("Some tasks did not finish before the shutdown timeout");
    }

    info!("Tracker shutdown complete");
    Ok(())
}
