//! Per-player record of processed score ids.

use std::collections::{HashMap, HashSet};

use tally_primitives::{PlayerId, ScoreId};

#[derive(Debug, Default, Clone)]
struct PlayerLedger {
    /// Ids in the order they were marked.
    order: Vec<ScoreId>,
    index: HashSet<ScoreId>,
}

/// Which score ids have already been processed, per player.
///
/// Entries are append-only: once an id is marked it stays marked until
/// [`reset_player`](Self::reset_player) or [`clear`](Self::clear).
#[derive(Debug, Default, Clone)]
pub struct DedupLedger {
    players: HashMap<PlayerId, PlayerLedger>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_seen(&self, player: PlayerId, id: ScoreId) -> bool {
        self.players
            .get(&player)
            .is_some_and(|ledger| ledger.index.contains(&id))
    }

    /// Mark `id` as seen for `player`. Returns true if it was not seen before.
    pub fn mark_seen(&mut self, player: PlayerId, id: ScoreId) -> bool {
        let ledger = self.players.entry(player).or_default();
        if !ledger.index.insert(id) {
            return false;
        }
        ledger.order.push(id);
        true
    }

    /// Ids seen for `player`, in the order they were marked.
    pub fn seen(&self, player: PlayerId) -> &[ScoreId] {
        self.players
            .get(&player)
            .map(|ledger| ledger.order.as_slice())
            .unwrap_or_default()
    }

    /// Number of players with at least one seen id.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Total number of seen ids across all players.
    pub fn len(&self) -> usize {
        self.players.values().map(|ledger| ledger.order.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Forget everything seen for `player`.
    pub fn reset_player(&mut self, player: PlayerId) {
        self.players.remove(&player);
    }

    pub fn clear(&mut self) {
        self.players.clear();
    }
}
