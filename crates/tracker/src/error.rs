//! Error types for the tracking engine.

use std::path::PathBuf;

use tally_primitives::PlayerId;
use tally_storage::ScoreLogError;

/// Failure reported by a score source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Request(String),
    /// The source answered with a non-success status.
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    /// Credentials were rejected or could not be obtained.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Failure reported by an announcement surface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("announcement surface error: {0}")]
pub struct SurfaceError(pub String);

/// Errors returned by [`TrackingEngine`](crate::TrackingEngine) operations.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("failed to fetch scores for player {player}")]
    Fetch {
        player: PlayerId,
        #[source]
        source: SourceError,
    },

    #[error(transparent)]
    Log(#[from] ScoreLogError),

    #[error("failed to read score file {}", path.display())]
    ReadScore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode score file {}", path.display())]
    DecodeScore {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
