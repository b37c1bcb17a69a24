//! Response shapes of the osu! API.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tally_primitives::{Grade, HitStatistics, MapId, Mod, PlayerId, Score, ScoreId};

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    /// Lifetime in seconds.
    pub(crate) expires_in: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireBeatmap {
    pub(crate) id: u64,
}

/// A score as returned by `/users/{id}/scores/recent`.
#[derive(Debug, Deserialize)]
pub(crate) struct WireScore {
    pub(crate) id: u64,
    pub(crate) user_id: u64,
    pub(crate) beatmap: WireBeatmap,
    pub(crate) score: u64,
    #[serde(default)]
    pub(crate) mods: Vec<Mod>,
    pub(crate) accuracy: f64,
    #[serde(default)]
    pub(crate) statistics: HitStatistics,
    pub(crate) max_combo: u32,
    #[serde(default)]
    pub(crate) rank: Grade,
    pub(crate) created_at: DateTime<Utc>,
    #[serde(default)]
    pub(crate) best_id: Option<u64>,
}

impl From<WireScore> for Score {
    fn from(wire: WireScore) -> Self {
        Self {
            id: ScoreId(wire.id),
            user_id: PlayerId(wire.user_id),
            beatmap_id: MapId(wire.beatmap.id),
            score: wire.score,
            mods: wire.mods,
            accuracy: wire.accuracy,
            statistics: wire.statistics,
            max_combo: wire.max_combo,
            rank: wire.rank,
            created_at: wire.created_at,
            best_id: wire.best_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_score_to_score() {
        let body = r#"[{
            "id": 4100000001,
            "user_id": 7,
            "beatmap": { "id": 1234, "version": "Insane", "difficulty_rating": 5.2 },
            "beatmapset": { "id": 99, "artist": "a", "title": "t" },
            "score": 512345,
            "mods": ["HD", "NC"],
            "accuracy": 0.9812,
            "statistics": { "count_300": 400, "count_100": 10, "count_50": 0, "count_miss": 1, "count_geki": 80 },
            "max_combo": 612,
            "rank": "A",
            "created_at": "2024-03-01T12:00:00+00:00",
            "best_id": null,
            "pp": null,
            "passed": true
        }]"#;

        let wire: Vec<WireScore> = serde_json::from_str(body).unwrap();
        let score: Score = wire.into_iter().next().unwrap().into();

        assert_eq!(score.id, ScoreId(4_100_000_001));
        assert_eq!(score.beatmap_id, MapId(1234));
        assert_eq!(score.mods, vec![Mod::Hidden, Mod::Nightcore]);
        assert_eq!(score.statistics.miss, 1);
        assert_eq!(score.rank, Grade::A);
        assert_eq!(score.best_id, None);
    }

    #[test]
    fn test_token_response() {
        let token: TokenResponse = serde_json::from_str(
            r#"{"token_type":"Bearer","expires_in":86400,"access_token":"abc"}"#,
        )
        .unwrap();
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.expires_in, 86400);
    }
}
