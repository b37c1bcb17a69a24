//! Periodic polling of the roster.
//!
//! Two passes drive the engine:
//!
//! - the fast refresh walks every player's feed until the first seen id;
//! - the recovery sweep compares a deeper window of each feed against the
//!   ledger by set membership, picking up scores missed while offline.
//!
//! Both fetch all players concurrently and then ingest the merged batch
//! sequentially in ascending score id order. A failed fetch only drops that
//! player's results for the pass.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tally_primitives::{ChallengeMap, PlayerId, Score};
use tally_tasks::{GracefulShutdown, TaskExecutor};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use crate::engine::{EngineState, TrackingEngine};
use crate::error::SourceError;

/// Result of one refresh cycle or recovery sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Players polled.
    pub players: usize,
    /// Players whose fetch failed.
    pub failed: usize,
    /// Scores ingested.
    pub ingested: usize,
    /// Ingested scores that changed a leaderboard.
    pub accepted: usize,
}

impl TrackingEngine {
    /// Fetch every player's new scores and ingest them in id order.
    pub async fn refresh_cycle(&self) -> CycleReport {
        let report = self
            .poll_roster(|player| self.collect_new(player))
            .await;
        self.metrics.refresh_cycles_total.increment(1);

        if report.ingested > 0 {
            info!(
                players = report.players,
                failed = report.failed,
                ingested = report.ingested,
                accepted = report.accepted,
                "Refresh cycle finished"
            );
        } else {
            debug!(players = report.players, failed = report.failed, "Refresh cycle found nothing new");
        }
        report
    }

    /// Ingest recent scores the ledger is missing for any player.
    pub async fn recovery_sweep(&self) -> CycleReport {
        debug!("Checking for lost scores");
        let report = self
            .poll_roster(|player| self.collect_lost(player))
            .await;
        self.metrics.recovery_sweeps_total.increment(1);
        self.metrics
            .scores_recovered_total
            .increment(report.ingested as u64);

        if report.ingested > 0 {
            info!(recovered = report.ingested, failed = report.failed, "Recovered lost scores");
        } else {
            debug!(failed = report.failed, "No scores to recover");
        }
        report
    }

    async fn poll_roster<F, Fut>(&self, fetch: F) -> CycleReport
    where
        F: Fn(PlayerId) -> Fut,
        Fut: Future<Output = Result<Vec<Score>, SourceError>>,
    {
        let players = self.roster.players();
        let fetches = players.iter().map(|player| {
            let fut = fetch(*player);
            async move { (*player, fut.await) }
        });
        let results = join_all(fetches).await;

        let mut report = CycleReport {
            players: players.len(),
            ..Default::default()
        };
        let mut batch = Vec::new();
        for (player, result) in results {
            match result {
                Ok(scores) => batch.extend(scores),
                Err(error) => {
                    report.failed += 1;
                    self.metrics.fetch_errors_total.increment(1);
                    warn!(%player, %error, "Failed to fetch scores");
                }
            }
        }

        self.ingest_batch(batch, &mut report).await;
        report
    }
}

/// Drives a [`TrackingEngine`] on its configured timers.
#[derive(Debug)]
pub struct PollScheduler {
    engine: Arc<TrackingEngine>,
}

impl PollScheduler {
    pub fn new(engine: Arc<TrackingEngine>) -> Self {
        Self { engine }
    }

    /// Start polling on `executor` and mark the engine as running.
    ///
    /// The first refresh happens one interval after the call. On shutdown no
    /// further cycles start; a cycle already in progress runs to completion.
    pub fn spawn(self, executor: &TaskExecutor) -> JoinHandle<()> {
        self.engine.set_state(EngineState::Running);
        executor.spawn_with_graceful_shutdown_signal("tracker.scheduler", |shutdown| {
            self.run(shutdown)
        })
    }

    async fn run(self, shutdown: GracefulShutdown) {
        let engine = self.engine;
        let period = engine.config().refresh_interval();

        let mut refresh = interval_at(Instant::now() + period, period);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut recovery = engine.config().recovery_interval().map(|period| {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        let mut rotations = Some(engine.maps.subscribe());
        if let Some(map) = engine.current_map() {
            engine.on_map_changed(&map).await;
        }

        info!(refresh_secs = period.as_secs(), "Scheduler started");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _guard = &mut shutdown => {
                    info!("Scheduler stopped");
                    break;
                }
                _ = refresh.tick() => {
                    engine.refresh_cycle().await;
                }
                _ = next_tick(&mut recovery) => {
                    engine.recovery_sweep().await;
                }
                map = next_rotation(&mut rotations) => match map {
                    Some(map) => engine.on_map_changed(&map).await,
                    None => info!("No challenge map is current"),
                },
            }
        }
    }
}

/// Waits for the next tick, or forever when there is no interval.
async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Waits for the current map to change. Waits forever once the provider
/// has gone away.
async fn next_rotation(
    rx: &mut Option<watch::Receiver<Option<ChallengeMap>>>,
) -> Option<ChallengeMap> {
    loop {
        let Some(inner) = rx.as_mut() else {
            return std::future::pending().await;
        };
        if inner.changed().await.is_err() {
            *rx = None;
            continue;
        }
        return inner.borrow_and_update().clone();
    }
}
