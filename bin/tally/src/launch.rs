//! Wiring of the tracker collaborators.

use std::sync::Arc;
use std::time::Duration;

use eyre::{Result, WrapErr, eyre};
use tally_osu::OsuClient;
use tally_ratelimiter::DispatcherService;
use tally_storage::FileScoreLog;
use tally_tasks::TaskExecutor;
use tally_tracker::{
    NoopSurface, ScheduledMapProvider, ScoreEvent, StaticRoster, TrackerComponents,
    TrackingEngine,
};
use tally_webhook::{JsonNotificationFormatter, WebhookTransport};
use tracing::debug;

use crate::config::TallyConfig;

/// How long graceful tasks get to finish after shutdown was signalled.
pub(crate) const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// A wired tracker that has not been loaded yet.
#[derive(Debug)]
pub(crate) struct Tracker {
    pub(crate) engine: Arc<TrackingEngine>,
    pub(crate) maps: Arc<ScheduledMapProvider>,
}

/// Build the engine and its collaborators from `config`.
///
/// The notification dispatcher is spawned on `executor` as a critical task.
pub(crate) fn build(config: &TallyConfig, executor: &TaskExecutor) -> Result<Tracker> {
    let url = config
        .webhook
        .url
        .as_deref()
        .ok_or_else(|| eyre!("webhook.url is not set"))?;
    let transport = WebhookTransport::new(url).wrap_err("Failed to create webhook client")?;

    let (dispatcher, handle) = DispatcherService::new(config.dispatcher.to_config(), transport);
    executor.spawn_critical("dispatcher", dispatcher.run());

    let source = OsuClient::new(config.osu.clone()).wrap_err("Failed to create osu! client")?;

    let score_dir = &config.tracker.score_dir;
    let log = FileScoreLog::new(score_dir.clone())
        .wrap_err_with(|| format!("Failed to open score log: {}", score_dir.display()))?;

    let maps = Arc::new(ScheduledMapProvider::new(config.maps.clone()));

    let components = TrackerComponents {
        source: Arc::new(source),
        roster: Arc::new(StaticRoster::new(config.players.iter().copied())),
        maps: maps.clone(),
        log: Arc::new(log),
        dispatcher: handle,
        formatter: Arc::new(JsonNotificationFormatter),
        surface: Arc::new(NoopSurface),
    };

    let engine = Arc::new(TrackingEngine::new(components, config.tracker.clone()));
    engine.subscribe(|event: &ScoreEvent| {
        debug!(
            score = %event.score.id,
            player = %event.score.user_id,
            map = %event.score.beatmap_id,
            value = event.score.score,
            on_current_map = event.on_current_map,
            accepted = event.accepted,
            "Score observed"
        );
    });

    Ok(Tracker { engine, maps })
}
