//! Tracker configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default period of the fast refresh.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;

/// Default page size of the fast refresh.
pub const DEFAULT_REFRESH_PAGE_SIZE: usize = 5;

/// Default page size of the recovery sweep.
pub const DEFAULT_RECOVERY_PAGE_SIZE: usize = 10;

/// Tracking engine and scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Seconds between fast refresh cycles.
    pub refresh_interval_secs: u64,
    /// Page size used by the fast refresh and `refresh_player`.
    pub refresh_page_size: usize,
    /// Page size used by the recovery sweep.
    pub recovery_page_size: usize,
    /// Recent scores compared per player by the recovery sweep.
    pub recovery_depth: usize,
    /// Seconds between periodic recovery sweeps. Startup-only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_interval_secs: Option<u64>,
    /// Whether ingested scores are written to the score log.
    pub recording: bool,
    /// Directory of the score log.
    pub score_dir: PathBuf,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            refresh_page_size: DEFAULT_REFRESH_PAGE_SIZE,
            recovery_page_size: DEFAULT_RECOVERY_PAGE_SIZE,
            recovery_depth: 50,
            recovery_interval_secs: None,
            recording: true,
            score_dir: PathBuf::from("scores"),
        }
    }
}

impl TrackerConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn recovery_interval(&self) -> Option<Duration> {
        self.recovery_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: TrackerConfig =
            serde_json::from_str(r#"{"refresh_interval_secs": 30, "recording": false}"#).unwrap();
        assert_eq!(config.refresh_interval(), Duration::from_secs(30));
        assert!(!config.recording);
        assert_eq!(config.refresh_page_size, DEFAULT_REFRESH_PAGE_SIZE);
        assert_eq!(config.recovery_interval(), None);
    }

    #[test]
    fn test_zero_recovery_interval_disables() {
        let config = TrackerConfig {
            recovery_interval_secs: Some(0),
            ..Default::default()
        };
        assert_eq!(config.recovery_interval(), None);
    }
}
