use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use carino_client::client::{AuthClient, HttpTokenRefresher, RefreshError, TokenRefresher};
use carino_client::config::ApiConfig;
use carino_client::navigation::HistoryNavigator;
use carino_client::session::{
    MemoryStorage, SessionStore, Storage, StorageError, Tier, AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY,
};
use mockito::ServerGuard;
use serde_json::json;
use tokio::sync::Semaphore;

/// Everything a client test needs, wired against one mock server.
pub struct Harness {
    pub server: ServerGuard,
    pub session: SessionStore,
    pub navigator: Arc<HistoryNavigator>,
    pub client: AuthClient,
}

pub async fn harness(current_path: &str) -> Harness {
    let server = mockito::Server::new_async().await;
    let config = ApiConfig::new(server.url());
    let refresher = Arc::new(HttpTokenRefresher::new(reqwest::Client::new(), &config));
    build(server, config, current_path, refresher)
}

/// A harness whose refresher waits at `gate` before calling the real
/// refresh endpoint.
pub async fn gated_harness(current_path: &str, refresh_timeout_in_ms: u64) -> (Harness, Arc<GatedRefresher>) {
    let server = mockito::Server::new_async().await;
    let mut config = ApiConfig::new(server.url());
    config.refresh_timeout_in_ms = refresh_timeout_in_ms;
    let inner = Arc::new(HttpTokenRefresher::new(reqwest::Client::new(), &config));
    let gated = Arc::new(GatedRefresher::new(inner));
    (build(server, config, current_path, gated.clone()), gated)
}

/// A harness whose durable tier accepts removals but rejects every write.
pub async fn read_only_durable_harness(current_path: &str) -> Harness {
    let server = mockito::Server::new_async().await;
    let config = ApiConfig::new(server.url());
    let seeded = MemoryStorage::new();
    seeded
        .set_items(&[
            (AUTH_TOKEN_KEY, "T1".to_string()),
            (REFRESH_TOKEN_KEY, "R1".to_string()),
        ])
        .expect("failed to seed durable tier");
    let session = SessionStore::new(
        Arc::new(ReadOnlyStorage { inner: seeded }),
        Arc::new(MemoryStorage::new()),
    );
    let navigator = Arc::new(HistoryNavigator::new(current_path));
    let client = AuthClient::new(config, session.clone(), navigator.clone())
        .expect("failed to build client");
    Harness {
        server,
        session,
        navigator,
        client,
    }
}

fn build(
    server: ServerGuard,
    config: ApiConfig,
    current_path: &str,
    refresher: Arc<dyn TokenRefresher>,
) -> Harness {
    let session = SessionStore::in_memory();
    let navigator = Arc::new(HistoryNavigator::new(current_path));
    let client =
        AuthClient::with_refresher(config, session.clone(), navigator.clone(), refresher)
            .expect("failed to build client");
    Harness {
        server,
        session,
        navigator,
        client,
    }
}

pub fn seed_session(session: &SessionStore, tier: Tier, access: &str, refresh: &str) {
    session
        .save(tier, access, refresh, &json!({"id": 1, "name": "System Administrator"}))
        .expect("failed to seed session");
}

/// Only an access token, as left behind by a partially written session.
pub fn seed_access_token_only(session: &SessionStore, access: &str) {
    session
        .durable()
        .set_item(AUTH_TOKEN_KEY, access.to_string())
        .expect("failed to seed access token");
}

/// Storage whose writes fail, as a full or read-only disk would.
pub struct ReadOnlyStorage {
    inner: MemoryStorage,
}

impl Storage for ReadOnlyStorage {
    fn name(&self) -> &str {
        "read-only"
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get_item(key)
    }

    fn set_items(&self, _entries: &[(&str, String)]) -> Result<(), StorageError> {
        Err(StorageError::Io {
            path: "session.json".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }

    fn remove_items(&self, keys: &[&str]) -> Result<(), StorageError> {
        self.inner.remove_items(keys)
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.inner.keys()
    }
}

/// Holds every refresh until [`GatedRefresher::release`] is called, then
/// delegates to the wrapped refresher.
pub struct GatedRefresher {
    inner: Arc<dyn TokenRefresher>,
    gate: Semaphore,
    calls: AtomicUsize,
}

impl GatedRefresher {
    pub fn new(inner: Arc<dyn TokenRefresher>) -> Self {
        GatedRefresher {
            inner,
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TokenRefresher for GatedRefresher {
    fn get_name(&self) -> &str {
        "gated"
    }

    async fn refresh(&self, refresh_token: &str) -> Result<String, RefreshError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _permit = self.gate.acquire().await.map_err(|_| RefreshError::Abandoned)?;
        self.inner.refresh(refresh_token).await
    }
}

/// Polls `condition` until it holds, failing the test after five seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
