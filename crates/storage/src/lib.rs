//! Persistence log for observed scores.
//!
//! Every recorded score is kept as one durable record keyed by its
//! [`ScoreId`]. The log is write-mostly: the tracker appends while it runs
//! and replays the whole log once at startup to rebuild its in-memory state.

mod file;
mod memory;

use std::path::PathBuf;

use auto_impl::auto_impl;
use tally_primitives::{Score, ScoreId};
use thiserror::Error;

pub use file::FileScoreLog;
pub use memory::MemoryScoreLog;

/// Persistence log errors.
#[derive(Debug, Error)]
pub enum ScoreLogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error for score {id}: {reason}")]
    Serialization { id: ScoreId, reason: String },
    #[error("corrupt record {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
}

/// Lazy sequence of replayed scores, oldest first.
///
/// Items are decoded on demand; an undecodable record surfaces as an `Err`
/// item without ending the sequence.
pub type ScoreReplay = Box<dyn Iterator<Item = Result<Score, ScoreLogError>> + Send>;

/// Score persistence trait with auto-impl for &, Box, Arc.
#[auto_impl(&, Box, Arc)]
pub trait ScoreLog: Send + Sync {
    /// Writes one record keyed by the score id. Appending the same id twice
    /// replaces the earlier record.
    fn append(&self, score: &Score) -> Result<(), ScoreLogError>;

    fn get(&self, id: ScoreId) -> Result<Option<Score>, ScoreLogError>;

    fn contains(&self, id: ScoreId) -> Result<bool, ScoreLogError> {
        Ok(self.get(id)?.is_some())
    }

    /// Replays every record in ascending score id order.
    fn replay_all(&self) -> Result<ScoreReplay, ScoreLogError>;

    fn count(&self) -> Result<usize, ScoreLogError>;
}

#[cfg(test)]
pub(crate) mod test_utils {
    use chrono::{TimeZone, Utc};
    use tally_primitives::{HitStatistics, MapId, PlayerId, Score, ScoreId};

    pub(crate) fn score(id: u64, player: u64, value: u64) -> Score {
        Score {
            id: ScoreId(id),
            user_id: PlayerId(player),
            beatmap_id: MapId(1),
            score: value,
            mods: Vec::new(),
            accuracy: 0.95,
            statistics: HitStatistics::default(),
            max_combo: 100,
            rank: Default::default(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            best_id: None,
        }
    }
}
