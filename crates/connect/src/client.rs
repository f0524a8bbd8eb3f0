//! HTTP client for the sync API.
//!
//! Thin reqwest wrapper implementing [`SyncBackend`]. Transport and error
//! bodies are converted into core error types here; nothing above this
//! layer sees reqwest.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;

use adsync_core::sync::SyncJobKind;
use adsync_core::{Error, Result};

use crate::connection::ConnectionStatus;
use crate::models::{ApiErrorBody, StartSyncResponse, SyncLogsPage};
use crate::traits::SyncBackend;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn start_endpoint(kind: SyncJobKind) -> &'static str {
    match kind {
        SyncJobKind::Full => "/api/meta/sync/start",
        SyncJobKind::Meta => "/api/meta/sync/start/meta",
        SyncJobKind::Instagram => "/api/meta/sync/start/instagram",
        SyncJobKind::InsightsLast7Days => "/api/meta/sync/start/insights-7d",
        SyncJobKind::InsightsLastDay => "/api/meta/sync/start/insights-1d",
    }
}

/// HTTP client for the sync backend.
#[derive(Debug, Clone)]
pub struct SyncApiClient {
    client: reqwest::Client,
    base_url: String,
    auth_header: Option<HeaderValue>,
}

impl SyncApiClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the backend (e.g. "https://api.example.com")
    /// * `access_token` - Optional bearer token; deployments behind session
    ///   auth pass `None`.
    pub fn new(base_url: &str, access_token: Option<&str>) -> Result<Self> {
        let auth_header = access_token
            .map(|token| {
                HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|e| Error::Unexpected(format!("Invalid access token format: {e}")))
            })
            .transpose()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Unexpected(format!("Failed to initialize HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header,
        })
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(auth) = &self.auth_header {
            headers.insert(AUTHORIZATION, auth.clone());
        }
        headers
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("[SyncApi] GET {url}");

        let response = self
            .client
            .get(&url)
            .headers(self.headers())
            .send()
            .await
            .map_err(|e| Error::Http(format!("Request failed: {e}")))?;

        Self::parse_response(response).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("[SyncApi] POST {url}");

        let response = self
            .client
            .post(&url)
            .headers(self.headers())
            .send()
            .await
            .map_err(|e| Error::Http(format!("Request failed: {e}")))?;

        Self::parse_response(response).await
    }

    /// Parse an HTTP response, converting error bodies appropriately.
    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(map_error_body(status.as_u16(), &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::Unexpected(format!("Failed to parse response: {e} - {body}")))
    }
}

/// Convert a non-success response body into a core error.
///
/// A body carrying `sync_requires_reconnect` means the user must redo the
/// OAuth handshake before syncing.
fn map_error_body(status: u16, body: &str) -> Error {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
        let message = parsed
            .detail
            .unwrap_or_else(|| format!("HTTP {status}"));
        if parsed.sync_requires_reconnect {
            return Error::ConnectionRequired(message);
        }
        return Error::Api { status, message };
    }
    Error::Api {
        status,
        message: body.chars().take(200).collect(),
    }
}

#[async_trait]
impl SyncBackend for SyncApiClient {
    async fn start_sync(&self, kind: SyncJobKind) -> Result<StartSyncResponse> {
        self.post(start_endpoint(kind)).await
    }

    async fn fetch_run_logs(&self, run_id: &str, since_id: i64) -> Result<SyncLogsPage> {
        self.get(&format!("/api/meta/sync/{run_id}/logs?since_id={since_id}"))
            .await
    }

    async fn connection_status(&self) -> Result<ConnectionStatus> {
        self.get("/api/meta/connection-status").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        assert!(SyncApiClient::new("https://api.example.com", Some("token")).is_ok());
        assert!(SyncApiClient::new("https://api.example.com", None).is_ok());
    }

    #[test]
    fn test_client_url_normalization() {
        let client = SyncApiClient::new("https://api.example.com/", None).unwrap();
        assert_eq!(client.base_url, "https://api.example.com");
    }

    #[test]
    fn test_start_endpoints() {
        assert_eq!(start_endpoint(SyncJobKind::Full), "/api/meta/sync/start");
        assert_eq!(
            start_endpoint(SyncJobKind::InsightsLastDay),
            "/api/meta/sync/start/insights-1d"
        );
    }

    #[test]
    fn test_error_body_with_reconnect_flag() {
        let err = map_error_body(
            409,
            r#"{"detail": "token expired", "sync_requires_reconnect": true}"#,
        );
        assert!(matches!(err, Error::ConnectionRequired(ref m) if m == "token expired"));
        assert!(err.requires_reconnect());
    }

    #[test]
    fn test_error_body_without_reconnect_flag() {
        let err = map_error_body(500, r#"{"detail": "worker unavailable"}"#);
        assert!(matches!(
            err,
            Error::Api { status: 500, ref message } if message == "worker unavailable"
        ));
    }

    #[test]
    fn test_error_body_unparseable() {
        let err = map_error_body(502, "<html>bad gateway</html>");
        assert!(matches!(err, Error::Api { status: 502, .. }));
    }
}
