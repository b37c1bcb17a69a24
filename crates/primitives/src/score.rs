//! Score submissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{MapId, Mod, PlayerId, ScoreId};

/// Hit-statistics breakdown of a play.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HitStatistics {
    #[serde(rename = "count_300", default)]
    pub perfect: u32,
    #[serde(rename = "count_100", default)]
    pub great: u32,
    #[serde(rename = "count_50", default)]
    pub ok: u32,
    #[serde(rename = "count_miss", default)]
    pub miss: u32,
}

impl HitStatistics {
    /// Total judged objects.
    pub fn total(&self) -> u32 {
        self.perfect + self.great + self.ok + self.miss
    }
}

/// Letter grade awarded to a play.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum Grade {
    #[serde(rename = "XH")]
    #[strum(serialize = "XH")]
    SilverSS,
    #[serde(rename = "X")]
    #[strum(serialize = "X")]
    SS,
    #[serde(rename = "SH")]
    #[strum(serialize = "SH")]
    SilverS,
    S,
    A,
    B,
    C,
    D,
    #[default]
    F,
}

/// One immutable play-result submission by a player against a map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub id: ScoreId,
    pub user_id: PlayerId,
    pub beatmap_id: MapId,
    /// Numeric score value used for ranking.
    pub score: u64,
    #[serde(default)]
    pub mods: Vec<Mod>,
    /// Accuracy as a fraction in `0.0..=1.0`.
    pub accuracy: f64,
    #[serde(default)]
    pub statistics: HitStatistics,
    pub max_combo: u32,
    #[serde(default)]
    pub rank: Grade,
    pub created_at: DateTime<Utc>,
    /// External reference to the submission on the source's site, if it was
    /// kept as a personal best.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_id: Option<u64>,
}

impl Score {
    /// Accuracy as a percentage rounded to two decimals.
    pub fn accuracy_percent(&self) -> f64 {
        (self.accuracy * 10_000.0).round() / 100.0
    }
}
