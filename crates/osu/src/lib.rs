//! osu! API v2 client used as the tracker's score source.
//!
//! Authenticates with the client-credentials grant and caches the bearer
//! token until shortly before it expires.

mod wire;

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tally_primitives::{PlayerId, Score};
use tally_tracker::{ScoreSource, SourceError};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::wire::{TokenResponse, WireScore};

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://osu.ppy.sh";

/// Tokens are refreshed this long before they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Game mode whose scores are fetched.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Ruleset {
    #[default]
    Osu,
    Taiko,
    Fruits,
    Mania,
}

/// Connection settings for the osu! API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsuConfig {
    pub base_url: String,
    pub client_id: u64,
    pub client_secret: String,
    pub ruleset: Ruleset,
    /// Include failed plays in recent scores.
    pub include_fails: bool,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OsuConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            client_id: 0,
            client_secret: String::new(),
            ruleset: Ruleset::default(),
            include_fails: false,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// osu! API v2 client.
#[derive(Debug)]
pub struct OsuClient {
    http: Client,
    config: OsuConfig,
    token: Mutex<Option<CachedToken>>,
    /// Held while a new token is requested so concurrent fetches share it.
    refresh: tokio::sync::Mutex<()>,
}

impl OsuClient {
    pub fn new(config: OsuConfig) -> Result<Self, SourceError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("tally/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Request(e.to_string()))?;

        Ok(Self {
            http,
            config,
            token: Mutex::new(None),
            refresh: tokio::sync::Mutex::new(()),
        })
    }

    pub fn config(&self) -> &OsuConfig {
        &self.config
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn token_url(&self) -> String {
        format!("{}/oauth/token", self.base_url())
    }

    fn recent_scores_url(&self, player: PlayerId) -> String {
        format!("{}/api/v2/users/{player}/scores/recent", self.base_url())
    }

    fn cached_token(&self) -> Option<String> {
        self.token
            .lock()
            .as_ref()
            .filter(|t| Instant::now() < t.refresh_at)
            .map(|t| t.value.clone())
    }

    /// Cached bearer token, fetching a new one when missing or stale.
    ///
    /// Only one request for a new token is in flight at a time; callers
    /// arriving meanwhile wait for it and reuse its result.
    async fn access_token(&self) -> Result<String, SourceError> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        let _refresh = self.refresh.lock().await;
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        debug!("Requesting osu! API token");
        let response = self
            .http
            .post(self.token_url())
            .json(&serde_json::json!({
                "client_id": self.config.client_id,
                "client_secret": self.config.client_secret,
                "grant_type": "client_credentials",
                "scope": "public",
            }))
            .send()
            .await
            .map_err(|e| SourceError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Auth(format!("{status}: {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        match refresh_deadline(Instant::now(), token.expires_in) {
            Some(refresh_at) => {
                *self.token.lock() = Some(CachedToken {
                    value: token.access_token.clone(),
                    refresh_at,
                });
            }
            None => warn!(expires_in = token.expires_in, "Token lifetime out of range, not caching"),
        }
        Ok(token.access_token)
    }

    fn invalidate_token(&self) {
        self.token.lock().take();
    }
}

/// When a token issued at `now` should be replaced, or `None` when the
/// lifetime cannot be represented.
fn refresh_deadline(now: Instant, expires_in: u64) -> Option<Instant> {
    let lifetime = Duration::from_secs(expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
    now.checked_add(lifetime)
}

#[async_trait]
impl ScoreSource for OsuClient {
    async fn recent_scores(
        &self,
        player: PlayerId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Score>, SourceError> {
        let token = self.access_token().await?;

        trace!(%player, offset, limit, "Fetching recent scores");
        let response = self
            .http
            .get(self.recent_scores_url(player))
            .bearer_auth(token)
            .query(&[
                ("mode", self.config.ruleset.to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
                ("include_fails", u8::from(self.config.include_fails).to_string()),
            ])
            .send()
            .await
            .map_err(|e| SourceError::Request(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.invalidate_token();
            return Err(SourceError::Auth("token rejected".to_owned()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let scores: Vec<WireScore> = response
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;
        Ok(scores.into_iter().map(Score::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_ignore_trailing_slash() {
        let client = OsuClient::new(OsuConfig {
            base_url: "http://localhost:8080/".to_owned(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(client.token_url(), "http://localhost:8080/oauth/token");
        assert_eq!(
            client.recent_scores_url(PlayerId(7)),
            "http://localhost:8080/api/v2/users/7/scores/recent"
        );
    }

    #[test]
    fn test_ruleset_names() {
        assert_eq!(Ruleset::Fruits.to_string(), "fruits");
        assert_eq!("mania".parse::<Ruleset>().unwrap(), Ruleset::Mania);
        let config: OsuConfig = serde_json::from_str(r#"{"client_id": 5, "ruleset": "taiko"}"#).unwrap();
        assert_eq!(config.ruleset, Ruleset::Taiko);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[tokio::test]
    async fn test_cached_token_is_reused() {
        let client = OsuClient::new(OsuConfig::default()).unwrap();
        *client.token.lock() = Some(CachedToken {
            value: "cached".to_owned(),
            refresh_at: Instant::now() + Duration::from_secs(600),
        });

        // No request is made while the cached token is fresh.
        assert_eq!(client.access_token().await.unwrap(), "cached");

        client.invalidate_token();
        assert!(client.token.lock().is_none());
    }

    #[test]
    fn test_refresh_deadline() {
        let now = Instant::now();
        assert_eq!(refresh_deadline(now, 3600), Some(now + Duration::from_secs(3540)));
        assert_eq!(refresh_deadline(now, 30), Some(now));
        assert_eq!(refresh_deadline(now, u64::MAX), None);
    }
}
