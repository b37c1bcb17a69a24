#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use tally_primitives::{ChallengeMap, MapId, Mod, PlayerId, Score, ScoreId};
use tally_ratelimiter::{DispatcherConfig, DispatcherService, Transport, TransportError};
use tally_storage::{MemoryScoreLog, ScoreLog, ScoreLogError, ScoreReplay};
use tally_tracker::{
    AnnouncementSurface, Notification, NotificationFormatter, Ranked, ScoreEvent, ScoreSource,
    SourceError, StaticMapProvider, StaticRoster, SurfaceError, TrackerComponents, TrackerConfig,
    TrackingEngine,
};
use tokio::time::Instant;

pub fn score(id: u64, player: u64, map: u64, value: u64, mods: &[Mod]) -> Score {
    Score {
        id: ScoreId(id),
        user_id: PlayerId(player),
        beatmap_id: MapId(map),
        score: value,
        mods: mods.to_vec(),
        accuracy: 0.97,
        statistics: Default::default(),
        max_combo: 300,
        rank: Default::default(),
        created_at: Utc.timestamp_opt(1_700_000_000 + id as i64, 0).unwrap(),
        best_id: Some(id * 10),
    }
}

/// Score source backed by per-player newest-first feeds.
#[derive(Default)]
pub struct MockSource {
    feeds: Mutex<HashMap<PlayerId, Vec<Score>>>,
    failing: Mutex<HashSet<PlayerId>>,
    pub requests: AtomicUsize,
}

impl MockSource {
    /// Add `score` as the newest entry of its player's feed.
    pub fn push(&self, score: Score) {
        self.feeds.lock().entry(score.user_id).or_default().insert(0, score);
    }

    pub fn set_failing(&self, player: u64, failing: bool) {
        let mut set = self.failing.lock();
        if failing {
            set.insert(PlayerId(player));
        } else {
            set.remove(&PlayerId(player));
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScoreSource for MockSource {
    async fn recent_scores(
        &self,
        player: PlayerId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Score>, SourceError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().contains(&player) {
            return Err(SourceError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(self
            .feeds
            .lock()
            .get(&player)
            .map(|feed| feed.iter().skip(offset).take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

pub type Deliveries = Arc<Mutex<Vec<(Notification, Instant)>>>;

/// Records deliveries; rejects them with a 500 while `failing` is set.
pub struct RecordingTransport {
    pub delivered: Deliveries,
    pub failing: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for RecordingTransport {
    type Request = Notification;

    async fn deliver(&self, request: Notification) -> Result<(), TransportError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Status {
                status: 500,
                body: "webhook down".into(),
            });
        }
        self.delivered.lock().push((request, Instant::now()));
        Ok(())
    }
}

/// Score log whose writes always fail.
#[derive(Default)]
pub struct FailingScoreLog {
    pub appends: AtomicUsize,
}

impl ScoreLog for FailingScoreLog {
    fn append(&self, _score: &Score) -> Result<(), ScoreLogError> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        Err(ScoreLogError::Io(std::io::Error::other("disk full")))
    }

    fn get(&self, _id: ScoreId) -> Result<Option<Score>, ScoreLogError> {
        Ok(None)
    }

    fn replay_all(&self) -> Result<ScoreReplay, ScoreLogError> {
        Ok(Box::new(std::iter::empty()))
    }

    fn count(&self) -> Result<usize, ScoreLogError> {
        Ok(0)
    }
}

pub struct IdFormatter;

impl NotificationFormatter for IdFormatter {
    fn format(&self, map: &ChallengeMap, score: &Score) -> Notification {
        Notification::new(serde_json::json!({
            "map": map.map_id.get(),
            "player": score.user_id.get(),
            "score": score.id.get(),
        }))
    }
}

#[derive(Default)]
pub struct RecordingSurface {
    pub announced: Mutex<Vec<MapId>>,
    /// Player order of every display refresh.
    pub displays: Mutex<Vec<(MapId, Vec<PlayerId>)>>,
}

#[async_trait]
impl AnnouncementSurface for RecordingSurface {
    async fn announce_map(&self, map: &ChallengeMap) -> Result<Option<String>, SurfaceError> {
        self.announced.lock().push(map.map_id);
        Ok(Some(format!("msg-{}", map.map_id)))
    }

    async fn update_display(
        &self,
        map: &ChallengeMap,
        table: &[Ranked],
    ) -> Result<(), SurfaceError> {
        self.displays
            .lock()
            .push((map.map_id, table.iter().map(|(player, _)| *player).collect()));
        Ok(())
    }
}

pub struct HarnessOptions {
    pub log: Arc<dyn ScoreLog>,
    pub dispatcher: DispatcherConfig,
    pub config: TrackerConfig,
    pub source: Arc<MockSource>,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            log: Arc::new(MemoryScoreLog::new()),
            dispatcher: DispatcherConfig::default(),
            config: TrackerConfig::default(),
            source: Arc::default(),
        }
    }
}

pub struct Harness {
    pub engine: Arc<TrackingEngine>,
    pub source: Arc<MockSource>,
    pub maps: Arc<StaticMapProvider>,
    pub log: Arc<dyn ScoreLog>,
    pub delivered: Deliveries,
    pub transport_failing: Arc<AtomicBool>,
    pub surface: Arc<RecordingSurface>,
    pub events: Arc<Mutex<Vec<ScoreEvent>>>,
}

impl Harness {
    /// Must be called from within a tokio runtime.
    pub fn new(players: &[u64], map: Option<ChallengeMap>) -> Self {
        Self::with_options(players, map, HarnessOptions::default())
    }

    pub fn with_options(players: &[u64], map: Option<ChallengeMap>, options: HarnessOptions) -> Self {
        let delivered = Deliveries::default();
        let transport_failing = Arc::new(AtomicBool::new(false));
        let dispatcher = DispatcherService::spawn(
            options.dispatcher,
            RecordingTransport {
                delivered: Arc::clone(&delivered),
                failing: Arc::clone(&transport_failing),
            },
        );
        let maps = Arc::new(StaticMapProvider::new(map));
        let surface = Arc::new(RecordingSurface::default());

        let engine = Arc::new(TrackingEngine::new(
            TrackerComponents {
                source: options.source.clone(),
                roster: Arc::new(StaticRoster::new(players.iter().copied().map(PlayerId))),
                maps: maps.clone(),
                log: Arc::clone(&options.log),
                dispatcher,
                formatter: Arc::new(IdFormatter),
                surface: surface.clone(),
            },
            options.config,
        ));

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        engine.subscribe(move |event: &ScoreEvent| sink.lock().push(event.clone()));

        Self {
            engine,
            source: options.source,
            maps,
            log: options.log,
            delivered,
            transport_failing,
            surface,
            events,
        }
    }

    pub fn set_transport_failing(&self, failing: bool) {
        self.transport_failing.store(failing, Ordering::SeqCst);
    }

    /// Score ids of delivered notifications, in delivery order.
    pub fn notified_ids(&self) -> Vec<u64> {
        self.delivered
            .lock()
            .iter()
            .filter_map(|(n, _)| n.as_value()["score"].as_u64())
            .collect()
    }

    /// Score ids seen by the listener, in event order.
    pub fn event_ids(&self) -> Vec<u64> {
        self.events.lock().iter().map(|e| e.score.id.get()).collect()
    }
}
