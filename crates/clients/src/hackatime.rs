// crates/clients/src/hackatime.rs
//! Client for the time-tracking admin API.
//!
//! Serves three lookups per reviewed submission: the author's user id (by
//! email), their per-project totals, and raw heartbeats one UTC calendar
//! day at a time. The trust-level lookup is independent and advisory --
//! callers run it regardless of heartbeat failures.

use chrono::NaiveDate;
use serde::Deserialize;

use harborview_core::{Heartbeat, TrackedProject, TrustLevel};

use crate::error::{ClientError, ClientResult};

const SERVICE: &str = "hackatime";

/// Configuration for [`HackatimeClient`].
#[derive(Debug, Clone)]
pub struct HackatimeConfig {
    /// Admin API root, e.g. `https://hackatime.hackclub.com/api/admin/v1`.
    pub base_url: String,
    pub admin_token: String,
}

impl HackatimeConfig {
    /// Read configuration from `HACKATIME_BASE_URL` / `HACKATIME_ADMIN_TOKEN`.
    pub fn from_env() -> ClientResult<Self> {
        let base_url = std::env::var("HACKATIME_BASE_URL")
            .unwrap_or_else(|_| "https://hackatime.hackclub.com/api/admin/v1".to_string());
        let admin_token = std::env::var("HACKATIME_ADMIN_TOKEN")
            .map_err(|_| ClientError::config(SERVICE, "HACKATIME_ADMIN_TOKEN is not set"))?;
        Ok(Self {
            base_url,
            admin_token,
        })
    }
}

// Wire shapes. Everything defaults: a field the service stops sending must
// degrade to empty, not break the review surface.

#[derive(Debug, Default, Deserialize)]
struct UserEnvelope {
    #[serde(default)]
    user: Option<UserRecord>,
}

#[derive(Debug, Default, Deserialize)]
struct UserRecord {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    trust_level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProjectsEnvelope {
    #[serde(default)]
    projects: Vec<TrackedProject>,
}

#[derive(Debug, Default, Deserialize)]
struct HeartbeatsEnvelope {
    #[serde(default)]
    heartbeats: Vec<Heartbeat>,
}

/// Time-tracking admin API client.
pub struct HackatimeClient {
    http: reqwest::Client,
    base_url: String,
    admin_token: String,
}

impl HackatimeClient {
    /// Build a client, validating configuration immediately. An empty or
    /// whitespace token is a programming error, not a runtime condition.
    pub fn new(config: HackatimeConfig) -> ClientResult<Self> {
        let token = config.admin_token.trim();
        if token.is_empty() {
            return Err(ClientError::config(SERVICE, "admin token is empty"));
        }
        if token.contains(char::is_whitespace) {
            return Err(ClientError::config(SERVICE, "admin token contains whitespace"));
        }
        if !config.base_url.starts_with("http") {
            return Err(ClientError::config(
                SERVICE,
                format!("base URL is not http(s): {}", config.base_url),
            ));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            admin_token: token.to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.admin_token)
            .send()
            .await
            .map_err(|source| ClientError::Request {
                service: SERVICE,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(SERVICE, status.as_u16(), message));
        }

        response.json::<T>().await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "Malformed time-tracking response");
            ClientError::schema(SERVICE, e.to_string())
        })
    }

    /// Resolve a user id from an email address. `None` when the service has
    /// no such user -- a not-found condition, never an error.
    pub async fn find_user_id_by_email(&self, email: &str) -> ClientResult<Option<u64>> {
        let path = format!("/users/lookup_email/{}", urlencoding::encode(email));
        match self.get_json::<UserEnvelope>(&path).await {
            Ok(envelope) => Ok(envelope.user.and_then(|u| u.id)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Per-project totals for a user.
    pub async fn get_user_projects(&self, user_id: u64) -> ClientResult<Vec<TrackedProject>> {
        let envelope = self
            .get_json::<ProjectsEnvelope>(&format!("/users/{user_id}/projects"))
            .await?;
        Ok(envelope.projects)
    }

    /// All heartbeats for one UTC calendar day.
    pub async fn get_heartbeats_for_day(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> ClientResult<Vec<Heartbeat>> {
        let path = format!(
            "/users/{user_id}/heartbeats?date={}",
            date.format("%Y-%m-%d")
        );
        let envelope = self.get_json::<HeartbeatsEnvelope>(&path).await?;
        Ok(envelope.heartbeats)
    }

    /// The user's externally computed trust level. Unknown or missing values
    /// degrade to [`TrustLevel::Unscored`].
    pub async fn get_trust_level(&self, user_id: u64) -> ClientResult<TrustLevel> {
        let envelope = self.get_json::<UserEnvelope>(&format!("/users/{user_id}")).await?;
        Ok(envelope
            .user
            .and_then(|u| u.trust_level)
            .map(|raw| TrustLevel::from_raw(&raw))
            .unwrap_or(TrustLevel::Unscored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: String) -> HackatimeClient {
        HackatimeClient::new(HackatimeConfig {
            base_url,
            admin_token: "test-token".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_empty_token_rejected_at_construction() {
        let err = HackatimeClient::new(HackatimeConfig {
            base_url: "https://example.test".to_string(),
            admin_token: "   ".to_string(),
        })
        .unwrap_err();
        assert!(matches!(err, ClientError::Config { .. }));
    }

    #[test]
    fn test_whitespace_token_rejected() {
        let err = HackatimeClient::new(HackatimeConfig {
            base_url: "https://example.test".to_string(),
            admin_token: "bad token".to_string(),
        })
        .unwrap_err();
        assert!(err.to_string().contains("whitespace"));
    }

    #[test]
    fn test_non_http_base_url_rejected() {
        let err = HackatimeClient::new(HackatimeConfig {
            base_url: "ftp://example.test".to_string(),
            admin_token: "tok".to_string(),
        })
        .unwrap_err();
        assert!(matches!(err, ClientError::Config { .. }));
    }

    #[tokio::test]
    async fn test_find_user_id_by_email() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/users/lookup_email/dev%40example.com")
            .with_status(200)
            .with_body(r#"{"user":{"id":1234,"trust_level":"blue"}}"#)
            .create_async()
            .await;

        let id = client(server.url())
            .find_user_id_by_email("dev@example.com")
            .await
            .unwrap();

        assert_eq!(id, Some(1234));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_find_user_id_404_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/lookup_email/ghost%40example.com")
            .with_status(404)
            .create_async()
            .await;

        let id = client(server.url())
            .find_user_id_by_email("ghost@example.com")
            .await
            .unwrap();
        assert_eq!(id, None);
    }

    #[tokio::test]
    async fn test_server_error_carries_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/7/projects")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let err = client(server.url()).get_user_projects(7).await.unwrap_err();
        assert_eq!(err.status(), Some(503));
    }

    #[tokio::test]
    async fn test_get_user_projects_defensive_fields() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/7/projects")
            .with_status(200)
            .with_body(
                r#"{"projects":[
                    {"name":"harborview","total_duration":5400,"first_heartbeat":1700000000,"last_heartbeat":1700090000},
                    {"name":"sparse"}
                ]}"#,
            )
            .create_async()
            .await;

        let projects = client(server.url()).get_user_projects(7).await.unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].total_duration, 5400);
        assert_eq!(projects[1].total_duration, 0);
        assert_eq!(projects[1].first_heartbeat, None);
    }

    #[tokio::test]
    async fn test_get_heartbeats_for_day() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/7/heartbeats")
            .match_query(mockito::Matcher::UrlEncoded(
                "date".into(),
                "2026-03-01".into(),
            ))
            .with_status(200)
            .with_body(
                r#"{"heartbeats":[
                    {"time":"2026-03-01T10:00:00Z","project":"harborview","entity":"src/main.rs"},
                    {"time":"2026-03-01T10:01:00Z","project":"harborview","entity":"src/lib.rs","lineno":3}
                ]}"#,
            )
            .create_async()
            .await;

        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let heartbeats = client(server.url())
            .get_heartbeats_for_day(7, date)
            .await
            .unwrap();

        assert_eq!(heartbeats.len(), 2);
        assert_eq!(heartbeats[1].lineno, Some(3));
    }

    #[tokio::test]
    async fn test_trust_level_defensive() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/7")
            .with_status(200)
            .with_body(r#"{"user":{"id":7,"trust_level":"red"}}"#)
            .create_async()
            .await;

        let trust = client(server.url()).get_trust_level(7).await.unwrap();
        assert_eq!(trust, TrustLevel::Convicted);
    }

    #[tokio::test]
    async fn test_trust_level_missing_is_unscored() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/7")
            .with_status(200)
            .with_body(r#"{"user":{"id":7}}"#)
            .create_async()
            .await;

        let trust = client(server.url()).get_trust_level(7).await.unwrap();
        assert_eq!(trust, TrustLevel::Unscored);
    }
}
