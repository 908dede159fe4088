use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where the remote API lives and how long we are willing to wait for it.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ApiConfig {
    /// Base URL every request path is joined onto, e.g. `https://api.carino.rw`.
    pub base_url: String,
    /// Upper bound for a single token refresh call. Every request queued
    /// behind the refresh waits at most this long.
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout_in_ms: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_in_ms: u64,
}

fn default_refresh_timeout() -> u64 {
    10_000
}

fn default_request_timeout() -> u64 {
    30_000
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        ApiConfig {
            base_url: base_url.into(),
            refresh_timeout_in_ms: default_refresh_timeout(),
            request_timeout_in_ms: default_request_timeout(),
        }
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_in_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_in_ms)
    }

    /// Joins `path` onto the base URL with exactly one slash between them.
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
