use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::RefreshError;
use crate::config::ApiConfig;

/// Path of the refresh endpoint, relative to the API base URL.
pub const REFRESH_PATH: &str = "auth/refresh";

/// Exchanges a refresh token for a new access token.
#[async_trait::async_trait]
pub trait TokenRefresher: Send + Sync {
    /// A descriptive name for the refresher (for logs/debug).
    fn get_name(&self) -> &str;

    async fn refresh(&self, refresh_token: &str) -> Result<String, RefreshError>;
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: Option<String>,
}

/// Calls `POST {base}/auth/refresh` with `{"refresh_token": ...}` and expects
/// `{"access_token": ...}` back.
pub struct HttpTokenRefresher {
    http: reqwest::Client,
    url: String,
}

impl HttpTokenRefresher {
    pub fn new(http: reqwest::Client, config: &ApiConfig) -> Self {
        HttpTokenRefresher {
            http,
            url: config.url_for(REFRESH_PATH),
        }
    }
}

#[async_trait::async_trait]
impl TokenRefresher for HttpTokenRefresher {
    fn get_name(&self) -> &str {
        "http"
    }

    async fn refresh(&self, refresh_token: &str) -> Result<String, RefreshError> {
        debug!("Requesting a new access token from '{}'", self.url);

        let resp = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RefreshError::Rejected { status });
        }

        let body = resp
            .json::<RefreshResponse>()
            .await
            .map_err(|e| RefreshError::MalformedResponse(e.to_string()))?;

        match body.access_token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(RefreshError::MalformedResponse(
                "response has no access_token".to_string(),
            )),
        }
    }
}
