//! Application startup.
//!
//! Opens the session tiers named in the configuration and wires the
//! navigator and the authenticated client around them.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::client::{AuthClient, ClientError};
use crate::config::{load_config, ConfigError, ConfigV1};
use crate::navigation::HistoryNavigator;
use crate::session::{FileStorage, MemoryStorage, SessionStore, StorageError};
use crate::state::AppState;
use crate::utils::{init_logging, LoggingError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error("failed to open session storage: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to create API client: {0}")]
    Client(#[from] ClientError),
}

/// Builds the shared state: a file-backed durable tier at
/// `session.durable_path`, an in-memory ephemeral tier, and a client for
/// `api.base_url`.
pub fn build_app_state(config: Arc<ConfigV1>) -> Result<AppState, StartupError> {
    let durable = FileStorage::open(&config.session.durable_path)?;
    debug!(path = %durable.path().display(), "Durable session tier opened");
    let session = SessionStore::new(Arc::new(durable), Arc::new(MemoryStorage::new()));

    let navigator = Arc::new(HistoryNavigator::default());
    let client = AuthClient::new(config.api.clone(), session.clone(), navigator.clone())?;

    info!(
        "Started {} {} against {}",
        config.logging.service_name, config.logging.service_version, config.api.base_url
    );

    Ok(AppState {
        config,
        session,
        navigator,
        client,
    })
}

/// Loads the config file, installs the global subscriber and builds the
/// state. A subscriber installed earlier by the host is left in place.
pub fn run(config_path: impl AsRef<Path>) -> Result<AppState, StartupError> {
    let config = load_config(config_path)?;
    match init_logging(&config.logging) {
        Ok(()) | Err(LoggingError::AlreadyInitialized) => {}
        Err(e) => return Err(e.into()),
    }
    build_app_state(Arc::new(config))
}
