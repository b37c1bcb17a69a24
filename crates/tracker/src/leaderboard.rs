//! Best qualifying score per (map, player).

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, hash_map::Entry};

use tally_primitives::{ChallengeMap, MapId, PlayerId, Score};

/// Points awarded to the first, second and third place of each map.
pub const DEFAULT_POINTS: [u32; 3] = [3, 2, 1];

/// One row of a map table.
pub type Ranked = (PlayerId, Score);

/// Per-map tables of each player's best qualifying score.
///
/// Tables of maps that are no longer current are kept for queries; the
/// leaderboard itself has no notion of which map is current.
#[derive(Debug, Default, Clone)]
pub struct Leaderboard {
    tables: BTreeMap<MapId, HashMap<PlayerId, Score>>,
}

/// Value desc, then earliest submission, then lowest id.
fn rank_order(a: &Score, b: &Score) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

fn ordered(table: &HashMap<PlayerId, Score>) -> Vec<Ranked> {
    let mut rows: Vec<Ranked> = table
        .iter()
        .map(|(player, score)| (*player, score.clone()))
        .collect();
    rows.sort_by(|(_, a), (_, b)| rank_order(a, b));
    rows
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `score` on `map` if it qualifies and beats the player's entry.
    ///
    /// The score must be for `map`, satisfy its mod requirement and be
    /// strictly greater than any existing entry. Returns whether the table
    /// changed.
    pub fn record_if_best(&mut self, map: &ChallengeMap, score: Score) -> bool {
        if !map.is_for(&score) || !map.accepts_mods(&score) {
            return false;
        }

        let table = self.tables.entry(map.map_id).or_default();
        match table.entry(score.user_id) {
            Entry::Occupied(mut entry) => {
                if score.score > entry.get().score {
                    entry.insert(score);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(score);
                true
            }
        }
    }

    /// Table for `map_id`, best first. Empty if the map has no entries.
    pub fn query(&self, map_id: MapId) -> Vec<Ranked> {
        self.tables.get(&map_id).map(ordered).unwrap_or_default()
    }

    /// The first `n` rows of [`query`](Self::query).
    pub fn top(&self, map_id: MapId, n: usize) -> Vec<Ranked> {
        let mut rows = self.query(map_id);
        rows.truncate(n);
        rows
    }

    /// Every table, each ordered best first.
    pub fn query_all(&self) -> BTreeMap<MapId, Vec<Ranked>> {
        self.tables
            .iter()
            .map(|(map_id, table)| (*map_id, ordered(table)))
            .collect()
    }

    pub fn get(&self, map_id: MapId, player: PlayerId) -> Option<&Score> {
        self.tables.get(&map_id)?.get(&player)
    }

    /// Number of maps with at least one entry.
    pub fn map_count(&self) -> usize {
        self.tables.len()
    }

    /// Cross-map points table.
    ///
    /// Players rejected by `include` are removed before ranking. Within each
    /// map the player at rank `i` earns `points[i]`; ranks past the end of
    /// `points` earn nothing. Sorted by points desc, then player id.
    pub fn standings<F>(&self, points: &[u32], include: F) -> Vec<(PlayerId, u32)>
    where
        F: Fn(PlayerId) -> bool,
    {
        let mut totals: HashMap<PlayerId, u32> = HashMap::new();

        for table in self.tables.values() {
            let ranked = ordered(table)
                .into_iter()
                .filter(|(player, _)| include(*player));
            for ((player, _), award) in ranked.zip(points) {
                *totals.entry(player).or_default() += award;
            }
        }

        let mut standings: Vec<(PlayerId, u32)> = totals.into_iter().collect();
        standings.sort_by(|(pa, a), (pb, b)| b.cmp(a).then_with(|| pa.cmp(pb)));
        standings
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use tally_primitives::{Mod, ModRequirement, ModSet, ScoreId};

    use super::*;

    fn score(id: u64, player: u64, map: u64, value: u64, mods: &[Mod]) -> Score {
        Score {
            id: ScoreId(id),
            user_id: PlayerId(player),
            beatmap_id: MapId(map),
            score: value,
            mods: mods.to_vec(),
            accuracy: 0.95,
            statistics: Default::default(),
            max_combo: 100,
            rank: Default::default(),
            created_at: Utc.timestamp_opt(1_700_000_000 + id as i64, 0).unwrap(),
            best_id: None,
        }
    }

    fn freemod(map: u64) -> ChallengeMap {
        ChallengeMap::new(MapId(map), ModRequirement::Any)
    }

    #[test]
    fn test_first_score_is_recorded() {
        let mut board = Leaderboard::new();
        assert!(board.record_if_best(&freemod(1), score(100, 7, 1, 500_000, &[])));
        assert_eq!(board.get(MapId(1), PlayerId(7)).unwrap().id, ScoreId(100));
    }

    #[test]
    fn test_replacement_requires_strictly_greater() {
        let mut board = Leaderboard::new();
        let map = freemod(1);

        assert!(board.record_if_best(&map, score(100, 7, 1, 500_000, &[])));
        assert!(!board.record_if_best(&map, score(101, 7, 1, 400_000, &[])));
        assert!(!board.record_if_best(&map, score(102, 7, 1, 500_000, &[])));
        assert!(board.record_if_best(&map, score(103, 7, 1, 500_001, &[])));

        assert_eq!(board.get(MapId(1), PlayerId(7)).unwrap().id, ScoreId(103));
    }

    #[test]
    fn test_same_score_twice_is_idempotent() {
        let mut board = Leaderboard::new();
        let map = freemod(1);
        let s = score(100, 7, 1, 500_000, &[]);

        assert!(board.record_if_best(&map, s.clone()));
        assert!(!board.record_if_best(&map, s));
        assert_eq!(board.query(MapId(1)).len(), 1);
    }

    #[test]
    fn test_requirement_must_hold() {
        let mut board = Leaderboard::new();
        let hd: ModSet = [Mod::Hidden].into_iter().collect();
        let map = ChallengeMap::new(MapId(1), ModRequirement::Include(hd));

        assert!(!board.record_if_best(&map, score(1, 7, 1, 900_000, &[])));
        assert!(board.record_if_best(&map, score(2, 7, 1, 100_000, &[Mod::Hidden, Mod::HardRock])));
        // Higher value but missing the required mod.
        assert!(!board.record_if_best(&map, score(3, 7, 1, 900_000, &[Mod::HardRock])));
        assert_eq!(board.get(MapId(1), PlayerId(7)).unwrap().id, ScoreId(2));
    }

    #[test]
    fn test_score_for_other_map_rejected() {
        let mut board = Leaderboard::new();
        assert!(!board.record_if_best(&freemod(1), score(1, 7, 2, 500, &[])));
        assert_eq!(board.map_count(), 0);
    }

    #[test]
    fn test_query_order_and_ties() {
        let mut board = Leaderboard::new();
        let map = freemod(1);

        board.record_if_best(&map, score(10, 1, 1, 300, &[]));
        board.record_if_best(&map, score(11, 2, 1, 500, &[]));
        // Same value as player 2, submitted later.
        board.record_if_best(&map, score(12, 3, 1, 500, &[]));
        board.record_if_best(&map, score(13, 4, 1, 100, &[]));

        let players: Vec<u64> = board.query(MapId(1)).iter().map(|(p, _)| p.get()).collect();
        assert_eq!(players, vec![2, 3, 1, 4]);

        let top: Vec<u64> = board.top(MapId(1), 2).iter().map(|(p, _)| p.get()).collect();
        assert_eq!(top, vec![2, 3]);
        assert!(board.query(MapId(99)).is_empty());
    }

    #[test]
    fn test_query_all_keeps_old_maps() {
        let mut board = Leaderboard::new();
        board.record_if_best(&freemod(1), score(1, 7, 1, 10, &[]));
        board.record_if_best(&freemod(2), score(2, 7, 2, 20, &[]));

        let all = board.query_all();
        assert_eq!(all.keys().copied().collect::<Vec<_>>(), vec![MapId(1), MapId(2)]);
        assert_eq!(all[&MapId(2)][0].1.score, 20);
    }

    #[test]
    fn test_standings() {
        let mut board = Leaderboard::new();
        let (m1, m2) = (freemod(1), freemod(2));

        board.record_if_best(&m1, score(1, 1, 1, 900, &[]));
        board.record_if_best(&m1, score(2, 2, 1, 800, &[]));
        board.record_if_best(&m1, score(3, 3, 1, 700, &[]));
        board.record_if_best(&m1, score(4, 4, 1, 600, &[]));

        board.record_if_best(&m2, score(5, 2, 2, 900, &[]));
        board.record_if_best(&m2, score(6, 1, 2, 800, &[]));

        let all = board.standings(&DEFAULT_POINTS, |_| true);
        assert_eq!(
            all,
            vec![(PlayerId(1), 5), (PlayerId(2), 5), (PlayerId(3), 1)]
        );

        // Excluding player 1 lets everyone below move up a rank.
        let league = board.standings(&DEFAULT_POINTS, |p| p != PlayerId(1));
        assert_eq!(
            league,
            vec![(PlayerId(2), 6), (PlayerId(3), 2), (PlayerId(4), 1)]
        );
    }
}
