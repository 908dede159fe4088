use reqwest::StatusCode;
use std::time::Duration;

/// Why a token refresh did not produce a new access token.
///
/// `Clone` because one failure is handed to every request queued behind it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("no refresh token is stored")]
    MissingRefreshToken,
    #[error("refresh endpoint rejected the refresh token with {status}")]
    Rejected { status: StatusCode },
    #[error("refresh request failed: {0}")]
    Transport(String),
    #[error("refresh response is malformed: {0}")]
    MalformedResponse(String),
    #[error("refresh did not complete within {0:?}")]
    Timeout(Duration),
    #[error("session storage failed during refresh: {0}")]
    Storage(String),
    #[error("refresh was abandoned before it completed")]
    Abandoned,
    #[error("session ended while the refresh was running")]
    SessionEnded,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Network-level failure. Never triggers a refresh.
    #[error("request to '{path}' failed: {message}")]
    Transport { path: String, message: String },
    /// Any non-2xx response that is not an auth failure.
    #[error("'{path}' returned {status}")]
    Status {
        path: String,
        status: StatusCode,
        body: String,
    },
    /// A 401/403 that could not be recovered by refreshing.
    #[error("'{path}' was rejected with {status}")]
    Unauthorized {
        path: String,
        status: StatusCode,
        body: String,
    },
    #[error("token refresh failed: {0}")]
    Refresh(#[from] RefreshError),
    #[error("response body could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

impl ClientError {
    /// The HTTP status behind this error, when there was a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } | ClientError::Unauthorized { status, .. } => {
                Some(*status)
            }
            ClientError::Refresh(RefreshError::Rejected { status }) => Some(*status),
            _ => None,
        }
    }
}

/// 401 and 403 are handled identically: both are treated as a possibly
/// expired access token.
pub fn is_auth_failure(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}
