//! Directory-backed score log: one pretty-printed JSON file per score.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tally_primitives::{Score, ScoreId};
use tracing::{debug, trace};

use super::{ScoreLog, ScoreLogError, ScoreReplay};

const RECORD_EXTENSION: &str = "json";

/// Score log writing `<id>.json` files into a directory.
///
/// Writes go to a temp file first and are renamed into place, so a crash
/// never leaves a torn record behind.
pub struct FileScoreLog {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileScoreLog {
    /// Open a log in `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ScoreLogError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: ScoreId) -> PathBuf {
        self.dir.join(format!("{id}.{RECORD_EXTENSION}"))
    }

    /// Record ids present on disk, ascending.
    fn record_ids(&self) -> Result<Vec<ScoreId>, ScoreLogError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            match record_id(&path) {
                Some(id) => ids.push(id),
                None => trace!(path = %path.display(), "Skipping non-record file"),
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }
}

/// Parses `<id>.json`; anything else (temp files, stray files) is not a record.
fn record_id(path: &Path) -> Option<ScoreId> {
    if path.extension()? != RECORD_EXTENSION {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

fn read_record(path: &Path) -> Result<Score, ScoreLogError> {
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| ScoreLogError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

impl ScoreLog for FileScoreLog {
    fn append(&self, score: &Score) -> Result<(), ScoreLogError> {
        let path = self.record_path(score.id);
        let tmp_path = path.with_extension("json.tmp");

        let _guard = self.write_lock.lock();
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, score).map_err(|e| {
                ScoreLogError::Serialization {
                    id: score.id,
                    reason: e.to_string(),
                }
            })?;
            writer.flush()?;
        }
        fs::rename(&tmp_path, &path)?;

        debug!(score = %score.id, path = %path.display(), "Score recorded");
        Ok(())
    }

    fn get(&self, id: ScoreId) -> Result<Option<Score>, ScoreLogError> {
        let path = self.record_path(id);
        if !path.exists() {
            return Ok(None);
        }
        read_record(&path).map(Some)
    }

    fn replay_all(&self) -> Result<ScoreReplay, ScoreLogError> {
        let paths: Vec<PathBuf> = self
            .record_ids()?
            .into_iter()
            .map(|id| self.record_path(id))
            .collect();

        Ok(Box::new(paths.into_iter().map(|path| read_record(&path))))
    }

    fn count(&self) -> Result<usize, ScoreLogError> {
        Ok(self.record_ids()?.len())
    }
}
