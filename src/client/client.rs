use std::sync::Arc;

use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::coordinator::{RefreshCoordinator, Signature, Ticket};
use super::error::{is_auth_failure, ClientError, RefreshError};
use super::refresh::{HttpTokenRefresher, TokenRefresher};
use super::request::{ApiRequest, ApiResponse};
use crate::config::ApiConfig;
use crate::metrics::RefreshStats;
use crate::navigation::{redirect_to_login, Navigator};
use crate::session::SessionStore;

/// HTTP client that signs requests with the stored bearer token and recovers
/// from expired tokens.
///
/// On a 401/403 the first failing request refreshes the token while any
/// request failing meanwhile waits for that same refresh; each is then
/// replayed once with the new token. A failed refresh, or a replay that is
/// rejected again, ends the session and redirects to the login view.
///
/// Clones share the session, the refresh state and the stats.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    config: ApiConfig,
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
    refresher: Arc<dyn TokenRefresher>,
    coordinator: RefreshCoordinator,
    stats: RefreshStats,
}

/// What a single network round trip produced.
enum Attempt {
    Success(ApiResponse),
    Failure(ApiResponse),
}

impl AuthClient {
    /// Creates a client refreshing against `{base_url}/auth/refresh`.
    pub fn new(
        config: ApiConfig,
        session: SessionStore,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ClientError> {
        let http = build_http_client(&config)?;
        let refresher = Arc::new(HttpTokenRefresher::new(http.clone(), &config));
        Ok(Self::from_parts(http, config, session, navigator, refresher))
    }

    /// Creates a client with a custom refresh strategy.
    pub fn with_refresher(
        config: ApiConfig,
        session: SessionStore,
        navigator: Arc<dyn Navigator>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Result<Self, ClientError> {
        let http = build_http_client(&config)?;
        Ok(Self::from_parts(http, config, session, navigator, refresher))
    }

    fn from_parts(
        http: reqwest::Client,
        config: ApiConfig,
        session: SessionStore,
        navigator: Arc<dyn Navigator>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        info!(
            "Creating auth client for '{}' (refresher '{}')",
            config.base_url,
            refresher.get_name()
        );
        AuthClient {
            inner: Arc::new(Inner {
                http,
                config,
                session,
                navigator,
                refresher,
                coordinator: RefreshCoordinator::new(),
                stats: RefreshStats::new(),
            }),
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    pub fn stats(&self) -> &RefreshStats {
        &self.inner.stats
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.inner.coordinator
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, ClientError> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<ApiResponse, ClientError> {
        self.send(ApiRequest::post(path, body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<ApiResponse, ClientError> {
        self.send(ApiRequest::put(path, body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, ClientError> {
        self.send(ApiRequest::delete(path)).await
    }

    /// Sends `request` and decodes the JSON body of the successful response.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ClientError> {
        Ok(self.send(request).await?.json()?)
    }

    /// Sends `request` signed with the current access token, recovering from
    /// an expired token once.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let signed = self.inner.coordinator.sign(self.current_token());
        let failure = match self.dispatch(&request, signed.token.as_deref()).await? {
            Attempt::Success(response) => return Ok(response),
            Attempt::Failure(response) => response,
        };

        if !is_auth_failure(failure.status) {
            return Err(status_error(&request, failure));
        }

        if request.is_auth_surface() {
            debug!(
                path = %request.path,
                status = %failure.status,
                "Auth failure on the auth surface; not refreshing"
            );
            return Err(unauthorized(&request, failure));
        }

        self.recover(&request, &signed).await
    }

    /// Reads the token at send time so a refresh is picked up by every
    /// subsequent request.
    fn current_token(&self) -> Option<String> {
        match self.inner.session.access_token() {
            Ok(token) => token,
            Err(e) => {
                warn!("Could not read access token; sending unauthenticated: {}", e);
                None
            }
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<Attempt, ClientError> {
        let url = self.inner.config.url_for(&request.path);
        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), &url)
            .headers(request.headers.clone())
            .header(ACCEPT, "application/json");

        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
                ClientError::Transport {
                    path: request.path.clone(),
                    message: format!("access token is not a valid header value: {}", e),
                }
            })?;
            builder = builder.header(AUTHORIZATION, value);
        }
        if let Some(body) = &request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").json(body);
        }

        let transport = |e: reqwest::Error| ClientError::Transport {
            path: request.path.clone(),
            message: e.to_string(),
        };
        let resp = builder.send().await.map_err(transport)?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.text().await.map_err(transport)?;

        debug!(method = %request.method, path = %request.path, status = %status, "Response received");

        let response = ApiResponse {
            status,
            headers,
            body,
        };
        Ok(if status.is_success() {
            Attempt::Success(response)
        } else {
            Attempt::Failure(response)
        })
    }

    /// Handles an auth failure on a first attempt. Whether this request
    /// replays, waits or refreshes is decided atomically by the coordinator.
    async fn recover(
        &self,
        request: &ApiRequest,
        signed: &Signature,
    ) -> Result<ApiResponse, ClientError> {
        let current = self.current_token();
        match self.inner.coordinator.join(signed, current.as_deref()) {
            Ticket::Replay(token) => {
                debug!(
                    path = %request.path,
                    "Signed with a stale token; replaying with the current one"
                );
                self.replay(request, &token).await
            }
            Ticket::Follower(outcome) => {
                self.inner.stats.record_queued_request();
                match outcome.await {
                    Ok(Ok(token)) => self.replay(request, &token).await,
                    Ok(Err(e)) => Err(ClientError::Refresh(e)),
                    Err(_) => Err(ClientError::Refresh(RefreshError::Abandoned)),
                }
            }
            Ticket::Leader(guard) => {
                self.inner.stats.record_refresh_attempt();
                let outcome = self
                    .refresh()
                    .await
                    .and_then(|token| self.persist_refreshed(token));
                self.inner.stats.record_refresh_result(outcome.is_ok());
                match outcome {
                    Ok(token) => {
                        let drained = guard.settle(Ok(token.clone()));
                        info!(
                            event_name = "client.refresh.success",
                            queued = drained,
                            "Access token refreshed"
                        );
                        self.replay(request, &token).await
                    }
                    Err(e) => {
                        let drained = guard.settle(Err(e.clone()));
                        warn!(
                            event_name = "client.refresh.failure",
                            queued = drained,
                            "Token refresh failed: {}",
                            e
                        );
                        // Whoever ended the session already cleared it and navigated.
                        if e != RefreshError::SessionEnded {
                            self.end_session();
                        }
                        Err(ClientError::Refresh(e))
                    }
                }
            }
        }
    }

    /// Stores the refreshed token before anyone is woken with it. A session
    /// cleared during the refresh stays cleared.
    fn persist_refreshed(&self, token: String) -> Result<String, RefreshError> {
        match self.inner.session.update_access_token(&token) {
            Ok(Some(tier)) => {
                debug!(tier = %tier, "Refreshed access token persisted");
                Ok(token)
            }
            Ok(None) => Err(RefreshError::SessionEnded),
            Err(e) => Err(RefreshError::Storage(e.to_string())),
        }
    }

    /// Calls the refresher, failing fast without a refresh token and bounding
    /// the call by the configured timeout.
    async fn refresh(&self) -> Result<String, RefreshError> {
        let refresh_token = match self.inner.session.refresh_token() {
            Ok(Some(token)) if !token.is_empty() => token,
            Ok(_) => return Err(RefreshError::MissingRefreshToken),
            Err(e) => return Err(RefreshError::Storage(e.to_string())),
        };

        let limit = self.inner.config.refresh_timeout();
        match timeout(limit, self.inner.refresher.refresh(&refresh_token)).await {
            Ok(result) => result,
            Err(_) => Err(RefreshError::Timeout(limit)),
        }
    }

    /// Sends the request a second and last time. Another auth failure ends
    /// the session instead of refreshing again.
    async fn replay(&self, request: &ApiRequest, token: &str) -> Result<ApiResponse, ClientError> {
        self.inner.stats.record_replay();
        match self.dispatch(request, Some(token)).await? {
            Attempt::Success(response) => Ok(response),
            Attempt::Failure(response) if is_auth_failure(response.status) => {
                warn!(path = %request.path, status = %response.status, "Replay rejected after refresh");
                self.end_session();
                Err(unauthorized(request, response))
            }
            Attempt::Failure(response) => Err(status_error(request, response)),
        }
    }

    fn end_session(&self) {
        if redirect_to_login(&self.inner.session, self.inner.navigator.as_ref()) {
            self.inner.stats.record_redirect();
        }
    }
}

fn build_http_client(config: &ApiConfig) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()
        .map_err(|e| ClientError::Build(e.to_string()))
}

fn status_error(request: &ApiRequest, response: ApiResponse) -> ClientError {
    ClientError::Status {
        path: request.path.clone(),
        status: response.status,
        body: response.body,
    }
}

fn unauthorized(request: &ApiRequest, response: ApiResponse) -> ClientError {
    ClientError::Unauthorized {
        path: request.path.clone(),
        status: response.status,
        body: response.body,
    }
}
