//! Score tracking engine.
//!
//! [`TrackingEngine`] polls a [`ScoreSource`] for a [`Roster`] of players,
//! filters already processed scores through a [`DedupLedger`], keeps a
//! [`Leaderboard`] for the current challenge map and sends notifications for
//! new best scores through a rate-limited dispatcher. Every ingested score
//! is also fanned out to registered [`ScoreListener`]s.
//!
//! [`PollScheduler`] drives the engine on a timer. Collaborators are plain
//! trait objects handed over in [`TrackerComponents`].

mod config;
mod engine;
mod error;
mod ledger;
mod leaderboard;
mod listeners;
mod metrics;
mod providers;
mod scheduler;
mod traits;

pub use config::{
    DEFAULT_RECOVERY_PAGE_SIZE, DEFAULT_REFRESH_INTERVAL_SECS, DEFAULT_REFRESH_PAGE_SIZE,
    TrackerConfig,
};
pub use engine::{
    EngineState, IngestOptions, IngestOutcome, LoadReport, TrackerComponents, TrackingEngine,
};
pub use error::{SourceError, SurfaceError, TrackerError};
pub use ledger::DedupLedger;
pub use leaderboard::{DEFAULT_POINTS, Leaderboard, Ranked};
pub use listeners::{ListenerId, ScoreEvent, ScoreListener};
pub use providers::{ScheduledMapProvider, StaticMapProvider};
pub use scheduler::{CycleReport, PollScheduler};
pub use traits::{
    AnnouncementSurface, MapProvider, NoopSurface, Notification, NotificationFormatter, Roster,
    ScoreCursor, ScoreSource, StaticRoster,
};
