//! The `replay` command.

use eyre::Result;
use tally_tasks::TaskManager;
use tracing::info;

use crate::cli::ReplayArgs;
use crate::config::TallyConfig;
use crate::launch::{self, SHUTDOWN_TIMEOUT};

/// Rebuild the tracker state from the score log, then ingest one score file
/// as if it had just been fetched.
///
/// The source is not polled, so only the given file can trigger a
/// notification.
pub(crate) async fn run(args: ReplayArgs) -> Result<()> {
    let mut config = TallyConfig::load(Some(&args.config.config))?;
    config.apply_overrides(args.score_dir, false);
    config.validate()?;

    let task_manager = TaskManager::current();
    let tracker = launch::build(&config, &task_manager.executor())?;
    tracker.engine.replay_log().await?;

    let outcome = tracker.engine.replay_file(&args.file).await?;
    info!(
        file = %args.file.display(),
        accepted = outcome.accepted,
        notified = outcome.notified,
        "Replay finished"
    );

    task_manager.graceful_shutdown_with_timeout(SHUTDOWN_TIMEOUT).await;
    Ok(())
}
