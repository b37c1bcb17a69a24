//! Core primitive types for score tracking.
//!
//! This crate provides the data model shared across the tally stack
//! (scores, players, challenge maps and modifier predicates), kept separate
//! so storage, dispatch and tracking crates agree on one wire format.

mod map;
mod mods;
mod score;

pub use map::{ChallengeMap, MapWindow};
pub use mods::{Mod, ModRequirement, ModSet, ParseModError};
pub use score::{Grade, HitStatistics, Score};

use core::{fmt, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Returns the raw numeric value.
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }
    };
}

numeric_id!(
    /// Stable numeric player identifier, used as the polling key.
    PlayerId
);

numeric_id!(
    /// Score identifier. Unique and monotonically increasing per source.
    ScoreId
);

numeric_id!(
    /// Beatmap identifier.
    MapId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_order_numerically() {
        let mut ids = vec![ScoreId(101), ScoreId(9), ScoreId(55)];
        ids.sort();
        assert_eq!(ids, vec![ScoreId(9), ScoreId(55), ScoreId(101)]);
    }

    #[test]
    fn test_id_parse_and_display() {
        let player: PlayerId = "7".parse().unwrap();
        assert_eq!(player, PlayerId(7));
        assert_eq!(player.to_string(), "7");
        assert!("seven".parse::<PlayerId>().is_err());
    }

    #[test]
    fn test_id_serde_transparent() {
        let json = serde_json::to_string(&MapId(1234)).unwrap();
        assert_eq!(json, "1234");
        let back: MapId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, MapId(1234));
    }
}
