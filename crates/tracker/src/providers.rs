//! Challenge map providers.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tally_primitives::{ChallengeMap, MapId};
use tally_tasks::TaskExecutor;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::traits::MapProvider;

/// Sets the message id of the current map if it is `map`, without notifying
/// receivers.
fn record_message(tx: &watch::Sender<Option<ChallengeMap>>, map: MapId, message_id: &str) {
    tx.send_if_modified(|current| {
        if let Some(current) = current.as_mut().filter(|c| c.map_id == map) {
            current.message_id = Some(message_id.to_owned());
        }
        false
    });
}

/// Provider whose current map is set by hand.
#[derive(Debug)]
pub struct StaticMapProvider {
    tx: watch::Sender<Option<ChallengeMap>>,
}

impl StaticMapProvider {
    pub fn new(current: Option<ChallengeMap>) -> Self {
        let (tx, _) = watch::channel(current);
        Self { tx }
    }

    /// Replace the current map and notify subscribers.
    pub fn set_current(&self, map: Option<ChallengeMap>) {
        self.tx.send_replace(map);
    }
}

impl MapProvider for StaticMapProvider {
    fn current(&self) -> Option<ChallengeMap> {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<ChallengeMap>> {
        self.tx.subscribe()
    }

    fn record_announcement(&self, map: MapId, message_id: String) {
        record_message(&self.tx, map, &message_id);
    }
}

/// Provider that rotates through maps by their configured time windows.
///
/// Maps without a window are never current. When windows overlap the map
/// listed first wins.
#[derive(Debug)]
pub struct ScheduledMapProvider {
    maps: Mutex<Vec<ChallengeMap>>,
    tx: watch::Sender<Option<ChallengeMap>>,
}

impl ScheduledMapProvider {
    pub fn new(maps: Vec<ChallengeMap>) -> Self {
        Self::new_at(maps, Utc::now())
    }

    /// Build the provider as if the current time were `now`.
    pub fn new_at(maps: Vec<ChallengeMap>, now: DateTime<Utc>) -> Self {
        let current = current_at(&maps, now);
        let (tx, _) = watch::channel(current);
        Self {
            maps: Mutex::new(maps),
            tx,
        }
    }

    /// Map whose window contains `now`.
    pub fn map_at(&self, now: DateTime<Utc>) -> Option<ChallengeMap> {
        current_at(&self.maps.lock(), now)
    }

    /// Re-evaluate the current map at `now`. Returns true if it rotated.
    pub fn tick(&self, now: DateTime<Utc>) -> bool {
        let next = self.map_at(now);
        let rotated = self.tx.send_if_modified(|current| {
            let changed = current.as_ref().map(|m| m.map_id) != next.as_ref().map(|m| m.map_id);
            if changed {
                current.clone_from(&next);
            }
            changed
        });

        if rotated {
            match &next {
                Some(map) => info!(map = %map.map_id, index = map.index, "Challenge map rotated"),
                None => info!("No challenge map is current"),
            }
        }
        rotated
    }

    /// Spawn a task re-evaluating the schedule every `check_interval`.
    pub fn spawn(self: Arc<Self>, executor: &TaskExecutor, check_interval: Duration) -> JoinHandle<()> {
        executor.spawn_with_graceful_shutdown_signal("tracker.map_rotation", |shutdown| async move {
            let mut interval = tokio::time::interval(check_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            tokio::pin!(shutdown);

            loop {
                tokio::select! {
                    _guard = &mut shutdown => {
                        debug!("Map rotation stopping");
                        break;
                    }
                    _ = interval.tick() => {
                        self.tick(Utc::now());
                    }
                }
            }
        })
    }
}

fn current_at(maps: &[ChallengeMap], now: DateTime<Utc>) -> Option<ChallengeMap> {
    maps.iter()
        .find(|map| map.window.is_some_and(|w| w.contains(now)))
        .cloned()
}

impl MapProvider for ScheduledMapProvider {
    fn current(&self) -> Option<ChallengeMap> {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<ChallengeMap>> {
        self.tx.subscribe()
    }

    fn record_announcement(&self, map: MapId, message_id: String) {
        if let Some(entry) = self.maps.lock().iter_mut().find(|m| m.map_id == map) {
            entry.message_id = Some(message_id.clone());
        }
        record_message(&self.tx, map, &message_id);
    }
}
