//! Tracker metrics.

use metrics::Counter;

#[derive(Clone, Debug)]
pub(crate) struct TrackerMetrics {
    /// Scores run through ingestion, replays included.
    pub(crate) scores_observed_total: Counter,
    /// Scores that changed a leaderboard table.
    pub(crate) scores_accepted_total: Counter,
    pub(crate) notifications_sent_total: Counter,
    pub(crate) notifications_failed_total: Counter,
    pub(crate) persist_failures_total: Counter,
    pub(crate) fetch_errors_total: Counter,
    pub(crate) refresh_cycles_total: Counter,
    pub(crate) recovery_sweeps_total: Counter,
    /// Scores picked up by a recovery sweep.
    pub(crate) scores_recovered_total: Counter,
}

impl Default for TrackerMetrics {
    fn default() -> Self {
        Self {
            scores_observed_total: metrics::counter!("tracker.scores_observed_total"),
            scores_accepted_total: metrics::counter!("tracker.scores_accepted_total"),
            notifications_sent_total: metrics::counter!("tracker.notifications_sent_total"),
            notifications_failed_total: metrics::counter!("tracker.notifications_failed_total"),
            persist_failures_total: metrics::counter!("tracker.persist_failures_total"),
            fetch_errors_total: metrics::counter!("tracker.fetch_errors_total"),
            refresh_cycles_total: metrics::counter!("tracker.refresh_cycles_total"),
            recovery_sweeps_total: metrics::counter!("tracker.recovery_sweeps_total"),
            scores_recovered_total: metrics::counter!("tracker.scores_recovered_total"),
        }
    }
}
