//! In-memory score log (does not persist across restarts).

use std::collections::BTreeMap;

use parking_lot::RwLock;
use tally_primitives::{Score, ScoreId};

use super::{ScoreLog, ScoreLogError, ScoreReplay};

/// In-memory score log for testing.
#[derive(Default)]
pub struct MemoryScoreLog {
    scores: RwLock<BTreeMap<ScoreId, Score>>,
}

impl MemoryScoreLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log pre-populated with `scores`.
    pub fn with_scores(scores: impl IntoIterator<Item = Score>) -> Self {
        Self {
            scores: RwLock::new(scores.into_iter().map(|s| (s.id, s)).collect()),
        }
    }
}

impl ScoreLog for MemoryScoreLog {
    fn append(&self, score: &Score) -> Result<(), ScoreLogError> {
        self.scores.write().insert(score.id, score.clone());
        Ok(())
    }

    fn get(&self, id: ScoreId) -> Result<Option<Score>, ScoreLogError> {
        Ok(self.scores.read().get(&id).cloned())
    }

    fn replay_all(&self) -> Result<ScoreReplay, ScoreLogError> {
        let scores: Vec<Score> = self.scores.read().values().cloned().collect();
        Ok(Box::new(scores.into_iter().map(Ok)))
    }

    fn count(&self) -> Result<usize, ScoreLogError> {
        Ok(self.scores.read().len())
    }
}
