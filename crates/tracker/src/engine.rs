//! The tracking engine.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use tally_primitives::{ChallengeMap, MapId, PlayerId, Score, ScoreId};
use tally_ratelimiter::DispatcherHandle;
use tally_storage::ScoreLog;
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::error::{SourceError, TrackerError};
use crate::ledger::DedupLedger;
use crate::leaderboard::{Leaderboard, Ranked};
use crate::listeners::{ListenerId, ListenerSet, ScoreEvent, ScoreListener};
use crate::metrics::TrackerMetrics;
use crate::scheduler::CycleReport;
use crate::traits::{
    AnnouncementSurface, MapProvider, Notification, NotificationFormatter, Roster, ScoreCursor,
    ScoreSource,
};

/// Collaborators handed to [`TrackingEngine::new`].
pub struct TrackerComponents {
    pub source: Arc<dyn ScoreSource>,
    pub roster: Arc<dyn Roster>,
    pub maps: Arc<dyn MapProvider>,
    pub log: Arc<dyn ScoreLog>,
    pub dispatcher: DispatcherHandle<Notification>,
    pub formatter: Arc<dyn NotificationFormatter>,
    pub surface: Arc<dyn AnnouncementSurface>,
}

/// Side effects allowed while ingesting a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    /// Dispatch a notification if the score is accepted.
    pub notify: bool,
    /// Write the score to the log if recording is enabled.
    pub persist: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            notify: true,
            persist: true,
        }
    }
}

impl IngestOptions {
    /// Options used when re-running scores that are already on disk.
    pub const fn replay() -> Self {
        Self {
            notify: false,
            persist: false,
        }
    }
}

/// What happened to an ingested score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    /// The score changed the current map's leaderboard.
    pub accepted: bool,
    /// A notification was delivered for the score.
    pub notified: bool,
    /// The score was written to the log.
    pub persisted: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EngineState {
    #[default]
    Uninitialized,
    /// Score log replayed.
    Loaded,
    /// A poll scheduler is driving the engine.
    Running,
}

/// Result of [`TrackingEngine::load`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Records replayed from the log.
    pub replayed: usize,
    /// Records that could not be read.
    pub skipped: usize,
    /// Startup recovery sweep. Empty after [`TrackingEngine::replay_log`].
    pub recovery: CycleReport,
}

/// Detects new scores, keeps challenge leaderboards and sends notifications.
///
/// Shared as `Arc<TrackingEngine>`. State lives behind short locks that are
/// never held across an await point.
pub struct TrackingEngine {
    pub(crate) source: Arc<dyn ScoreSource>,
    pub(crate) roster: Arc<dyn Roster>,
    pub(crate) maps: Arc<dyn MapProvider>,
    log: Arc<dyn ScoreLog>,
    dispatcher: DispatcherHandle<Notification>,
    formatter: Arc<dyn NotificationFormatter>,
    surface: Arc<dyn AnnouncementSurface>,
    config: TrackerConfig,
    ledger: RwLock<DedupLedger>,
    leaderboard: RwLock<Leaderboard>,
    listeners: ListenerSet,
    recording: AtomicBool,
    state: Mutex<EngineState>,
    pub(crate) metrics: TrackerMetrics,
}

impl fmt::Debug for TrackingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingEngine")
            .field("state", &self.state())
            .field("recording", &self.is_recording())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TrackingEngine {
    pub fn new(components: TrackerComponents, config: TrackerConfig) -> Self {
        let TrackerComponents {
            source,
            roster,
            maps,
            log,
            dispatcher,
            formatter,
            surface,
        } = components;

        Self {
            source,
            roster,
            maps,
            log,
            dispatcher,
            formatter,
            surface,
            recording: AtomicBool::new(config.recording),
            config,
            ledger: RwLock::default(),
            leaderboard: RwLock::default(),
            listeners: ListenerSet::default(),
            state: Mutex::new(EngineState::Uninitialized),
            metrics: TrackerMetrics::default(),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        *self.state.lock()
    }

    pub(crate) fn set_state(&self, state: EngineState) {
        let previous = std::mem::replace(&mut *self.state.lock(), state);
        if previous != state {
            debug!(?previous, ?state, "Engine state changed");
        }
    }

    pub fn current_map(&self) -> Option<ChallengeMap> {
        self.maps.current()
    }

    /// Replay the score log, then run the startup recovery sweep.
    pub async fn load(&self) -> Result<LoadReport, TrackerError> {
        let mut report = self.replay_log().await?;
        report.recovery = self.recovery_sweep().await;
        Ok(report)
    }

    /// Rebuild ledger and leaderboards from the score log alone.
    ///
    /// Replayed scores are neither re-notified nor re-written, and the
    /// source is never polled. Unreadable records are logged and skipped.
    pub async fn replay_log(&self) -> Result<LoadReport, TrackerError> {
        let mut report = LoadReport::default();

        for record in self.log.replay_all()? {
            match record {
                Ok(score) => {
                    self.ingest(score, IngestOptions::replay()).await;
                    report.replayed += 1;
                }
                Err(error) => {
                    warn!(%error, "Skipping unreadable score record");
                    report.skipped += 1;
                }
            }
        }
        info!(
            replayed = report.replayed,
            skipped = report.skipped,
            "Score log replayed"
        );

        self.set_state(EngineState::Loaded);
        Ok(report)
    }

    /// Run one score through the ledger, the log and the current map's
    /// leaderboard.
    ///
    /// Listeners see every ingested score, whether or not it was accepted.
    pub async fn ingest(&self, score: Score, options: IngestOptions) -> IngestOutcome {
        self.metrics.scores_observed_total.increment(1);
        self.ledger.write().mark_seen(score.user_id, score.id);

        let persisted = options.persist && self.is_recording() && self.persist(&score);

        let current = self.maps.current();
        let on_current_map = current.as_ref().is_some_and(|map| map.is_for(&score));
        let accepted = match &current {
            Some(map) if on_current_map => {
                self.leaderboard.write().record_if_best(map, score.clone())
            }
            _ => false,
        };

        let mut notified = false;
        if accepted {
            self.metrics.scores_accepted_total.increment(1);
            if let Some(map) = current.as_ref().filter(|_| options.notify) {
                info!(
                    score = %score.id,
                    player = %score.user_id,
                    map = %map.map_id,
                    value = score.score,
                    "New best score"
                );
                notified = self.notify(map, &score).await;
                self.refresh_display(map).await;
            }
        }

        self.listeners.emit(&ScoreEvent {
            score,
            on_current_map,
            accepted,
        });

        IngestOutcome {
            accepted,
            notified,
            persisted,
        }
    }

    fn persist(&self, score: &Score) -> bool {
        match self.log.append(score) {
            Ok(()) => true,
            Err(error) => {
                self.metrics.persist_failures_total.increment(1);
                warn!(score = %score.id, %error, "Failed to persist score");
                false
            }
        }
    }

    async fn notify(&self, map: &ChallengeMap, score: &Score) -> bool {
        let notification = self.formatter.format(map, score);
        match self.dispatcher.send(notification).await {
            Ok(()) => {
                self.metrics.notifications_sent_total.increment(1);
                true
            }
            Err(error) => {
                self.metrics.notifications_failed_total.increment(1);
                warn!(score = %score.id, %error, "Failed to send score notification");
                false
            }
        }
    }

    async fn refresh_display(&self, map: &ChallengeMap) {
        let table = self.map_scores(map.map_id);
        if let Err(error) = self.surface.update_display(map, &table).await {
            warn!(map = %map.map_id, %error, "Failed to refresh leaderboard display");
        }
    }

    /// Poll one player outside the scheduled cycle.
    ///
    /// Walks the player's feed until the first seen id and returns the new
    /// scores oldest first. They are marked seen, and ingested when
    /// `should_ingest` is set.
    pub async fn refresh_player(
        &self,
        player: PlayerId,
        should_ingest: bool,
    ) -> Result<Vec<Score>, TrackerError> {
        let mut fresh = self.collect_new(player).await.map_err(|source| {
            self.metrics.fetch_errors_total.increment(1);
            TrackerError::Fetch { player, source }
        })?;
        fresh.sort_by_key(|score| score.id);

        if should_ingest {
            let mut report = CycleReport::default();
            self.ingest_batch(fresh.clone(), &mut report).await;
        } else {
            let mut ledger = self.ledger.write();
            for score in &fresh {
                ledger.mark_seen(score.user_id, score.id);
            }
        }

        Ok(fresh)
    }

    /// Unseen scores from the head of `player`'s feed, newest first.
    ///
    /// Stops at the first seen id or the end of the feed. A backlog longer
    /// than one page is walked page by page and returned whole.
    pub(crate) async fn collect_new(&self, player: PlayerId) -> Result<Vec<Score>, SourceError> {
        let mut cursor = ScoreCursor::new(&*self.source, player, self.config.refresh_page_size);
        let mut fresh = Vec::new();

        while let Some(score) = cursor.next().await? {
            if self.has_seen(score.user_id, score.id) {
                break;
            }
            fresh.push(score);
        }

        if cursor.fetched() > self.config.refresh_page_size {
            debug!(%player, new = fresh.len(), fetched = cursor.fetched(), "Walked score backlog");
        }
        Ok(fresh)
    }

    /// Scores among the `recovery_depth` most recent of `player` that the
    /// ledger has never seen. Does not stop early.
    pub(crate) async fn collect_lost(&self, player: PlayerId) -> Result<Vec<Score>, SourceError> {
        let mut cursor = ScoreCursor::new(&*self.source, player, self.config.recovery_page_size);
        let mut lost = Vec::new();

        for _ in 0..self.config.recovery_depth {
            let Some(score) = cursor.next().await? else {
                break;
            };
            if !self.has_seen(score.user_id, score.id) {
                lost.push(score);
            }
        }
        Ok(lost)
    }

    /// Ingest `batch` sequentially in ascending id order.
    ///
    /// Scores already in the ledger are skipped, so a score fetched by two
    /// concurrent polls is only processed once.
    pub(crate) async fn ingest_batch(&self, mut batch: Vec<Score>, report: &mut CycleReport) {
        batch.sort_by_key(|score| score.id);
        batch.dedup_by_key(|score| score.id);

        for score in batch {
            let claimed = self.ledger.write().mark_seen(score.user_id, score.id);
            if !claimed {
                continue;
            }
            let outcome = self.ingest(score, IngestOptions::default()).await;
            report.ingested += 1;
            if outcome.accepted {
                report.accepted += 1;
            }
        }
    }

    /// Read a score from a JSON file and ingest it with notifications on.
    pub async fn replay_file(&self, path: &Path) -> Result<IngestOutcome, TrackerError> {
        let bytes = std::fs::read(path).map_err(|source| TrackerError::ReadScore {
            path: path.to_path_buf(),
            source,
        })?;
        let score: Score =
            serde_json::from_slice(&bytes).map_err(|source| TrackerError::DecodeScore {
                path: path.to_path_buf(),
                source,
            })?;

        info!(score = %score.id, path = %path.display(), "Replaying score from file");
        Ok(self
            .ingest(
                score,
                IngestOptions {
                    notify: true,
                    persist: false,
                },
            )
            .await)
    }

    /// React to a rotation of the current map.
    ///
    /// Maps that have no announcement message yet are announced on the
    /// surface and the returned message id is handed back to the provider.
    pub async fn on_map_changed(&self, map: &ChallengeMap) {
        info!(
            map = %map.map_id,
            index = map.index,
            requirement = %map.requirement,
            "Current challenge map changed"
        );

        if map.message_id.is_some() {
            return;
        }

        match self.surface.announce_map(map).await {
            Ok(Some(message_id)) => {
                debug!(map = %map.map_id, %message_id, "Challenge map announced");
                self.maps.record_announcement(map.map_id, message_id);
            }
            Ok(None) => {}
            Err(error) => warn!(map = %map.map_id, %error, "Failed to announce challenge map"),
        }
    }

    /// Flip the recording flag. Returns the new value.
    pub fn toggle_recording(&self) -> bool {
        let recording = !self.recording.fetch_xor(true, Ordering::SeqCst);
        info!(recording, "Score recording toggled");
        recording
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    pub fn has_seen(&self, player: PlayerId, id: ScoreId) -> bool {
        self.ledger.read().has_seen(player, id)
    }

    /// Ids seen for `player`, in the order they were marked.
    pub fn seen(&self, player: PlayerId) -> Vec<ScoreId> {
        self.ledger.read().seen(player).to_vec()
    }

    /// Leaderboard of `map_id`, best first.
    pub fn map_scores(&self, map_id: MapId) -> Vec<Ranked> {
        self.leaderboard.read().query(map_id)
    }

    pub fn top_scores(&self, map_id: MapId, n: usize) -> Vec<Ranked> {
        self.leaderboard.read().top(map_id, n)
    }

    /// Every leaderboard, including those of past maps.
    pub fn all_scores(&self) -> BTreeMap<MapId, Vec<Ranked>> {
        self.leaderboard.read().query_all()
    }

    /// Best qualifying score of `player` on `map_id`.
    pub fn score(&self, map_id: MapId, player: PlayerId) -> Option<Score> {
        self.leaderboard.read().get(map_id, player).cloned()
    }

    /// Cross-map points table, see [`Leaderboard::standings`].
    pub fn standings<F>(&self, points: &[u32], include: F) -> Vec<(PlayerId, u32)>
    where
        F: Fn(PlayerId) -> bool,
    {
        self.leaderboard.read().standings(points, include)
    }

    /// Register a listener for every ingested score.
    pub fn subscribe(&self, listener: impl ScoreListener) -> ListenerId {
        self.listeners.subscribe(Arc::new(listener))
    }

    /// Returns false if `id` was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}
