//! Figment-based configuration loading.
//!
//! Configuration priority (highest wins):
//! 1. CLI arguments (applied after Figment load)
//! 2. Config file (TOML)
//! 3. Environment variables (`TALLY_` prefix, `__` between sections, e.g.
//!    `TALLY_OSU__CLIENT_SECRET`)
//! 4. Defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Result, WrapErr, ensure};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use tally_osu::OsuConfig;
use tally_primitives::{ChallengeMap, PlayerId};
use tally_ratelimiter::{DEFAULT_INTERVAL, DEFAULT_LIMIT, DispatcherConfig};
use tally_tracker::TrackerConfig;

/// Default config file looked up in the working directory.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "tally.toml";

/// Complete tracker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct TallyConfig {
    /// Players whose scores are tracked.
    pub(crate) players: Vec<PlayerId>,

    /// Seconds between checks of the map schedule.
    pub(crate) map_check_secs: u64,

    /// Engine and scheduler settings.
    pub(crate) tracker: TrackerConfig,

    /// Notification rate limit.
    pub(crate) dispatcher: DispatcherSection,

    /// Notification webhook.
    pub(crate) webhook: WebhookSection,

    /// Score source.
    pub(crate) osu: OsuConfig,

    /// Scheduled challenge maps, in rotation order.
    pub(crate) maps: Vec<ChallengeMap>,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            players: Vec::new(),
            map_check_secs: 30,
            tracker: TrackerConfig::default(),
            dispatcher: DispatcherSection::default(),
            webhook: WebhookSection::default(),
            osu: OsuConfig::default(),
            maps: Vec::new(),
        }
    }
}

/// Rate limit applied to outgoing notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct DispatcherSection {
    /// Notifications per window.
    pub(crate) limit: u32,
    /// Window length in seconds.
    pub(crate) interval_secs: u64,
}

impl Default for DispatcherSection {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            interval_secs: DEFAULT_INTERVAL.as_secs(),
        }
    }
}

impl DispatcherSection {
    pub(crate) fn to_config(self) -> DispatcherConfig {
        DispatcherConfig::new(
            self.limit.max(1),
            Duration::from_secs(self.interval_secs.max(1)),
        )
    }
}

/// Where notifications are posted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct WebhookSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) url: Option<String>,
}

impl TallyConfig {
    /// Load configuration from defaults, environment, and config file.
    /// CLI overrides should be applied separately after loading.
    pub(crate) fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(TallyConfig::default()))
            .merge(Env::prefixed("TALLY_").split("__"));

        if let Some(path) = config_path {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        let mut config: Self = figment.extract().wrap_err("Failed to load configuration")?;
        config.number_maps();
        Ok(config)
    }

    /// Apply command line overrides.
    pub(crate) fn apply_overrides(&mut self, score_dir: Option<PathBuf>, no_record: bool) {
        if let Some(dir) = score_dir {
            self.tracker.score_dir = dir;
        }
        if no_record {
            self.tracker.recording = false;
        }
    }

    /// Check the settings a live tracker cannot run without.
    pub(crate) fn validate(&self) -> Result<()> {
        ensure!(!self.players.is_empty(), "no players configured");
        ensure!(self.osu.client_id != 0, "osu.client_id is not set");
        ensure!(!self.osu.client_secret.is_empty(), "osu.client_secret is not set");
        ensure!(
            self.webhook.url.as_deref().is_some_and(|url| !url.is_empty()),
            "webhook.url is not set"
        );
        Ok(())
    }

    pub(crate) fn map_check_interval(&self) -> Duration {
        Duration::from_secs(self.map_check_secs.max(1))
    }

    /// Render the configuration as TOML with secrets masked.
    pub(crate) fn to_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        if !shown.osu.client_secret.is_empty() {
            shown.osu.client_secret = "<redacted>".to_owned();
        }
        toml::to_string_pretty(&shown).wrap_err("Failed to render configuration")
    }

    /// Maps listed without an explicit index take their list position.
    fn number_maps(&mut self) {
        if self.maps.iter().all(|map| map.index == 0) {
            for (position, map) in self.maps.iter_mut().enumerate() {
                map.index = u32::try_from(position).unwrap_or(u32::MAX);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tally_primitives::{MapId, ModRequirement};
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = TallyConfig::default();
        assert!(config.players.is_empty());
        assert!(config.tracker.recording);
        assert_eq!(config.dispatcher.to_config(), DispatcherConfig::default());
        assert!(config.webhook.url.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("tally.toml");

        fs::write(
            &config_path,
            r#"
players = [7, 3]

[tracker]
refresh_interval_secs = 30
recording = false

[dispatcher]
limit = 2

[webhook]
url = "https://hooks.example/abc"

[osu]
client_id = 42
client_secret = "hunter2"

[[maps]]
map_id = 100
requirement = "HD+"

[[maps]]
map_id = 200
requirement = "NM"
requester = "someone"
"#,
        )
        .unwrap();

        let config = TallyConfig::load(Some(&config_path)).unwrap();
        assert_eq!(config.players, vec![PlayerId(7), PlayerId(3)]);
        assert_eq!(config.tracker.refresh_interval_secs, 30);
        assert!(!config.tracker.recording);
        assert_eq!(config.tracker.refresh_page_size, 5);
        assert_eq!(config.dispatcher.limit, 2);
        assert_eq!(config.dispatcher.interval_secs, 5);
        assert_eq!(config.osu.client_id, 42);

        assert_eq!(config.maps.len(), 2);
        assert_eq!(config.maps[0].map_id, MapId(100));
        assert_eq!(config.maps[0].index, 0);
        assert_eq!(config.maps[1].requirement, ModRequirement::NoMod);
        assert_eq!(config.maps[1].index, 1);
        assert_eq!(config.maps[1].requester.as_deref(), Some("someone"));

        config.validate().unwrap();
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = TallyConfig::load(Some(Path::new("/nonexistent/tally.toml"))).unwrap();
        assert_eq!(config.map_check_secs, 30);
        assert_eq!(config.tracker, TrackerConfig::default());
    }

    #[test]
    fn test_validate_reports_missing_settings() {
        let mut config = TallyConfig::default();
        assert!(config.validate().is_err());

        config.players = vec![PlayerId(1)];
        config.osu.client_id = 1;
        config.osu.client_secret = "secret".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("webhook.url"));

        config.webhook.url = Some("https://hooks.example/abc".to_owned());
        config.validate().unwrap();
    }

    #[test]
    fn test_overrides_win() {
        let mut config = TallyConfig::default();
        config.apply_overrides(Some(PathBuf::from("/tmp/scores")), true);
        assert_eq!(config.tracker.score_dir, PathBuf::from("/tmp/scores"));
        assert!(!config.tracker.recording);
    }

    #[test]
    fn test_rendered_config_masks_secret_and_reloads() {
        let mut config = TallyConfig::default();
        config.players = vec![PlayerId(9)];
        config.osu.client_secret = "hunter2".to_owned();
        config.maps = vec![ChallengeMap::new(MapId(5), ModRequirement::Any)];

        let rendered = config.to_toml().unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tally.toml");
        fs::write(&path, rendered).unwrap();
        let reloaded = TallyConfig::load(Some(&path)).unwrap();
        assert_eq!(reloaded.players, config.players);
        assert_eq!(reloaded.maps, config.maps);
    }
}
