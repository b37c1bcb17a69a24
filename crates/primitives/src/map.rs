//! Challenge maps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{MapId, ModRequirement, Score};

/// Time range during which a scheduled challenge map is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MapWindow {
    /// Half-open containment: `start <= at < end`.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// A map eligible for a rotating challenge leaderboard.
///
/// Exactly one challenge map is current at any time; which one is decided by
/// a map provider outside the tracking engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeMap {
    pub map_id: MapId,
    /// Required-modifier predicate.
    #[serde(default)]
    pub requirement: ModRequirement,
    /// Position in the rotation, zero based.
    #[serde(default)]
    pub index: u32,
    /// Who asked for the map, if anyone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester: Option<String>,
    /// Announcement message owned by the announcement surface.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<MapWindow>,
}

impl ChallengeMap {
    pub fn new(map_id: MapId, requirement: ModRequirement) -> Self {
        Self {
            map_id,
            requirement,
            index: 0,
            requester: None,
            message_id: None,
            window: None,
        }
    }

    pub fn with_index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    pub fn with_requester(mut self, requester: impl Into<String>) -> Self {
        self.requester = Some(requester.into());
        self
    }

    pub fn with_window(mut self, window: MapWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// Returns true if the score was set on this map.
    pub fn is_for(&self, score: &Score) -> bool {
        score.beatmap_id == self.map_id
    }

    /// Returns true if the score's mods satisfy the map's requirement.
    pub fn accepts_mods(&self, score: &Score) -> bool {
        self.requirement.is_satisfied_by(&score.mods)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_window_half_open() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
        let window = MapWindow { start, end };

        assert!(window.contains(start));
        assert!(window.contains(end - chrono::Duration::seconds(1)));
        assert!(!window.contains(end));
    }

    #[test]
    fn test_map_from_config_shape() {
        let map: ChallengeMap =
            serde_json::from_str(r#"{"map_id": 42, "requirement": "HD+", "index": 3}"#).unwrap();
        assert_eq!(map.map_id, MapId(42));
        assert_eq!(map.requirement.to_string(), "HD+");
        assert_eq!(map.requester, None);
    }
}
