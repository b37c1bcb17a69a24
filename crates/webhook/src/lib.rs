//! Webhook delivery of score notifications.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tally_primitives::{ChallengeMap, Mod, Score};
use tally_ratelimiter::{Transport, TransportError};
use tally_tracker::{Notification, NotificationFormatter};
use tracing::trace;

/// POSTs each notification as a JSON body to a fixed URL.
#[derive(Debug, Clone)]
pub struct WebhookTransport {
    http: Client,
    url: String,
}

impl WebhookTransport {
    pub fn new(url: impl Into<String>) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self::with_client(http, url))
    }

    pub fn with_client(http: Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for WebhookTransport {
    type Request = Notification;

    async fn deliver(&self, request: Notification) -> Result<(), TransportError> {
        let response = self
            .http
            .post(&self.url)
            .json(request.as_value())
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        trace!(%status, "Webhook delivered");
        Ok(())
    }
}

/// Formats a notification as a flat JSON document describing the score and
/// the map it was set on.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonNotificationFormatter;

impl NotificationFormatter for JsonNotificationFormatter {
    fn format(&self, map: &ChallengeMap, score: &Score) -> Notification {
        let mods = if score.mods.is_empty() {
            "NM".to_owned()
        } else {
            score.mods.iter().map(Mod::acronym).collect::<String>()
        };
        Notification::new(json!({
            "map": {
                "id": map.map_id,
                "number": map.index.saturating_add(1),
                "requirement": map.requirement.to_string(),
                "requester": map.requester,
            },
            "score": {
                "id": score.id,
                "player": score.user_id,
                "value": score.score,
                "mods": mods,
                "accuracy": score.accuracy_percent(),
                "rank": score.rank.to_string(),
                "max_combo": score.max_combo,
                "statistics": score.statistics,
                "created_at": score.created_at,
                "best_id": score.best_id,
            },
        }))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use tally_primitives::{Grade, MapId, Mod, ModRequirement, PlayerId, ScoreId};

    use super::*;

    #[test]
    fn test_format() {
        let map = ChallengeMap::new(MapId(1234), "HD+".parse::<ModRequirement>().unwrap())
            .with_index(2)
            .with_requester("someone");
        let score = Score {
            id: ScoreId(100),
            user_id: PlayerId(7),
            beatmap_id: MapId(1234),
            score: 500_000,
            mods: vec![Mod::DoubleTime, Mod::Hidden],
            accuracy: 0.9876,
            statistics: Default::default(),
            max_combo: 700,
            rank: Grade::S,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            best_id: Some(42),
        };

        let value = JsonNotificationFormatter.format(&map, &score).into_inner();
        assert_eq!(value["map"]["id"], 1234);
        assert_eq!(value["map"]["number"], 3);
        assert_eq!(value["map"]["requirement"], "HD+");
        assert_eq!(value["map"]["requester"], "someone");
        assert_eq!(value["score"]["player"], 7);
        assert_eq!(value["score"]["mods"], "DTHD");
        assert_eq!(value["score"]["accuracy"], 98.76);
        assert_eq!(value["score"]["rank"], "S");
        assert_eq!(value["score"]["statistics"]["count_300"], 0);
    }

    #[test]
    fn test_format_edge_values() {
        let map = ChallengeMap::new(MapId(1), ModRequirement::Any).with_index(u32::MAX);
        let score = Score {
            id: ScoreId(1),
            user_id: PlayerId(1),
            beatmap_id: MapId(1),
            score: 1,
            mods: Vec::new(),
            accuracy: 1.0,
            statistics: Default::default(),
            max_combo: 1,
            rank: Grade::S,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            best_id: None,
        };

        let value = JsonNotificationFormatter.format(&map, &score).into_inner();
        assert_eq!(value["map"]["number"], u64::from(u32::MAX));
        assert_eq!(value["score"]["mods"], "NM");
    }

    #[test]
    fn test_transport_keeps_url() {
        let transport = WebhookTransport::new("http://localhost/hook").unwrap();
        assert_eq!(transport.url(), "http://localhost/hook");
    }
}
