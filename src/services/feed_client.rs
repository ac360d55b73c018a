// src/services/feed_client.rs

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::{AppError, Result};
use crate::models::observation::MatchObservation;
use crate::models::status::MatchStatus;

/// Source of live fixture snapshots.
///
/// `Ok(vec![])` means "nothing live"; any failure to obtain a trustworthy
/// snapshot is an `Err`.
#[async_trait]
pub trait LiveFeed: Send + Sync {
    async fn fetch_live(&self, api_key: &str) -> Result<Vec<MatchObservation>>;
}

#[derive(Clone)]
pub struct ApiFootballClient {
    base_url: String,
    client: Client,
}

impl ApiFootballClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::external_api(format!("Failed to build feed client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }
}

#[async_trait]
impl LiveFeed for ApiFootballClient {
    async fn fetch_live(&self, api_key: &str) -> Result<Vec<MatchObservation>> {
        let url = format!("{}/fixtures", self.base_url);

        let response = self.client
            .get(&url)
            .query(&[("live", "all")])
            .header("x-apisports-key", api_key)
            .send()
            .await
            .map_err(|e| AppError::external_api(format!("Live feed request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::external_api(format!(
                "Live feed returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let body = response.text().await?;
        parse_fixtures(&body)
    }
}

#[derive(Debug, Deserialize)]
struct FixturesResponse {
    #[serde(default)]
    errors: serde_json::Value,
    #[serde(default)]
    response: Vec<FixtureItem>,
}

#[derive(Debug, Deserialize)]
struct FixtureItem {
    fixture: FixtureInfo,
    #[serde(default)]
    goals: Goals,
}

#[derive(Debug, Deserialize)]
struct FixtureInfo {
    id: i64,
    #[serde(default)]
    status: Option<FixtureStatus>,
}

#[derive(Debug, Deserialize)]
struct FixtureStatus {
    #[serde(default)]
    short: Option<String>,
    #[serde(default)]
    elapsed: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct Goals {
    home: Option<i32>,
    away: Option<i32>,
}

/// Parses a `/fixtures?live=all` body. The provider reports auth and quota
/// problems with a 200 and a non-empty `errors` member.
pub fn parse_fixtures(body: &str) -> Result<Vec<MatchObservation>> {
    let parsed: FixturesResponse = serde_json::from_str(body)
        .map_err(|e| AppError::external_api(format!("Malformed live feed payload: {}", e)))?;

    let has_errors = match &parsed.errors {
        serde_json::Value::Array(items) => !items.is_empty(),
        serde_json::Value::Object(map) => !map.is_empty(),
        serde_json::Value::Null => false,
        _ => true,
    };
    if has_errors {
        return Err(AppError::external_api(format!(
            "Live feed reported errors: {}",
            parsed.errors
        )));
    }

    Ok(parsed
        .response
        .into_iter()
        .map(|item| {
            let (status, elapsed) = match item.fixture.status {
                Some(s) => (
                    s.short
                        .filter(|code| !code.trim().is_empty())
                        .map(|code| MatchStatus::from_code(&code)),
                    s.elapsed,
                ),
                None => (None, None),
            };

            MatchObservation {
                match_id: item.fixture.id.to_string(),
                status,
                elapsed,
                home_goals: item.goals.home,
                away_goals: item.goals.away,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_live_fixtures() {
        let body = r#"{
            "errors": [],
            "results": 2,
            "response": [
                {"fixture": {"id": 101, "status": {"short": "1H", "elapsed": 23}},
                 "goals": {"home": 1, "away": 0}},
                {"fixture": {"id": 102, "status": {"short": "HT", "elapsed": 45}},
                 "goals": {"home": null, "away": null}}
            ]
        }"#;

        let observations = parse_fixtures(body).unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(
            observations[0],
            MatchObservation::new("101", "1H").with_score(1, 0).with_elapsed(23)
        );
        assert_eq!(observations[1].status, Some(MatchStatus::HalfTime));
        assert_eq!(observations[1].home_goals, None);
    }

    #[test]
    fn empty_response_is_not_an_error() {
        let observations = parse_fixtures(r#"{"errors": {}, "response": []}"#).unwrap();
        assert!(observations.is_empty());
    }

    #[test]
    fn provider_errors_fail_the_fetch() {
        let body = r#"{"errors": {"token": "Error/Missing application key."}, "response": []}"#;
        assert!(parse_fixtures(body).is_err());
    }

    #[test]
    fn malformed_body_fails_the_fetch() {
        assert!(parse_fixtures("<html>bad gateway</html>").is_err());
    }

    #[test]
    fn client_keeps_base_url() {
        let client = ApiFootballClient::new("https://v3.football.api-sports.io").unwrap();
        assert_eq!(client.base_url, "https://v3.football.api-sports.io");
    }

    #[test]
    fn missing_status_is_kept_as_none() {
        let body = r#"{"response": [{"fixture": {"id": 7}, "goals": {"home": 2, "away": 2}}]}"#;
        let observations = parse_fixtures(body).unwrap();
        assert_eq!(observations[0].status, None);
        assert_eq!(observations[0].home_goals, Some(2));
    }
}
