//! Collaborators the tracking engine is built from.

use std::collections::VecDeque;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tally_primitives::{ChallengeMap, MapId, PlayerId, Score};
use tokio::sync::watch;

use crate::error::{SourceError, SurfaceError};
use crate::leaderboard::Ranked;

/// Paginated access to a player's recent scores, newest first.
#[async_trait]
#[auto_impl::auto_impl(&, Box, Arc)]
pub trait ScoreSource: Send + Sync {
    /// Up to `limit` scores starting `offset` entries from the newest.
    ///
    /// A page shorter than `limit` means the feed is exhausted.
    async fn recent_scores(
        &self,
        player: PlayerId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Score>, SourceError>;
}

/// Walks a [`ScoreSource`] feed one score at a time, fetching pages lazily.
///
/// Callers may stop at any point; no page beyond the one holding the last
/// returned score is requested.
pub struct ScoreCursor<'a, S: ?Sized> {
    source: &'a S,
    player: PlayerId,
    page_size: usize,
    offset: usize,
    buffer: VecDeque<Score>,
    exhausted: bool,
}

impl<'a, S: ScoreSource + ?Sized> ScoreCursor<'a, S> {
    pub fn new(source: &'a S, player: PlayerId, page_size: usize) -> Self {
        Self {
            source,
            player,
            page_size: page_size.max(1),
            offset: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Next score in the feed, or `None` once it is exhausted.
    pub async fn next(&mut self) -> Result<Option<Score>, SourceError> {
        if self.buffer.is_empty() && !self.exhausted {
            let page = self
                .source
                .recent_scores(self.player, self.offset, self.page_size)
                .await?;
            self.offset += page.len();
            self.exhausted = page.len() < self.page_size;
            self.buffer.extend(page);
        }
        Ok(self.buffer.pop_front())
    }

    /// Number of scores fetched from the source so far.
    pub fn fetched(&self) -> usize {
        self.offset
    }
}

/// The set of players to poll.
#[auto_impl::auto_impl(&, Box, Arc)]
pub trait Roster: Send + Sync {
    fn players(&self) -> Vec<PlayerId>;
}

/// Fixed roster.
#[derive(Debug, Clone, Default)]
pub struct StaticRoster {
    players: Vec<PlayerId>,
}

impl StaticRoster {
    /// Duplicates are dropped, first occurrence wins.
    pub fn new(players: impl IntoIterator<Item = PlayerId>) -> Self {
        let mut unique = Vec::new();
        for player in players {
            if !unique.contains(&player) {
                unique.push(player);
            }
        }
        Self { players: unique }
    }
}

impl Roster for StaticRoster {
    fn players(&self) -> Vec<PlayerId> {
        self.players.clone()
    }
}

/// Owns rotation of the current challenge map.
#[auto_impl::auto_impl(&, Box, Arc)]
pub trait MapProvider: Send + Sync {
    fn current(&self) -> Option<ChallengeMap>;

    /// Receiver that changes whenever the current map rotates.
    fn subscribe(&self) -> watch::Receiver<Option<ChallengeMap>>;

    /// Remember the announcement message posted for `map`.
    fn record_announcement(&self, map: MapId, message_id: String) {
        let _ = (map, message_id);
    }
}

/// Rotating leaderboard display, e.g. a pinned chat message.
#[async_trait]
#[auto_impl::auto_impl(&, Box, Arc)]
pub trait AnnouncementSurface: Send + Sync {
    /// Post the announcement for a newly current map. Returns the message
    /// reference, if the surface keeps one.
    async fn announce_map(&self, map: &ChallengeMap) -> Result<Option<String>, SurfaceError>;

    /// Redraw the display for `map` with its current table.
    async fn update_display(&self, map: &ChallengeMap, table: &[Ranked])
    -> Result<(), SurfaceError>;
}

/// Surface that displays nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSurface;

#[async_trait]
impl AnnouncementSurface for NoopSurface {
    async fn announce_map(&self, _map: &ChallengeMap) -> Result<Option<String>, SurfaceError> {
        Ok(None)
    }

    async fn update_display(
        &self,
        _map: &ChallengeMap,
        _table: &[Ranked],
    ) -> Result<(), SurfaceError> {
        Ok(())
    }
}

/// Opaque structured payload handed to the notification transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Notification(pub serde_json::Value);

impl Notification {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_inner(self) -> serde_json::Value {
        self.0
    }
}

/// Builds the notification for an accepted score.
#[auto_impl::auto_impl(&, Box, Arc)]
pub trait NotificationFormatter: Send + Sync {
    fn format(&self, map: &ChallengeMap, score: &Score) -> Notification;
}
