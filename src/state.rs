//! Shared application state.
//!
//! Holds the configuration together with the session store, the navigator
//! and the authenticated client that every view shares.

use std::sync::Arc;

use crate::client::AuthClient;
use crate::config::ConfigV1;
use crate::dashboard::Dashboard;
use crate::login::LoginFlow;
use crate::navigation::HistoryNavigator;
use crate::session::{SessionStore, StorageError};

/// Application state shared across views.
///
/// Cloning is cheap; clones share the same session and refresh state.
#[derive(Clone)]
pub struct AppState {
    /// Configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    /// Durable and ephemeral session tiers.
    pub session: SessionStore,
    pub navigator: Arc<HistoryNavigator>,
    /// Client signing API calls with the stored token.
    pub client: AuthClient,
}

impl AppState {
    pub fn login_flow(&self) -> LoginFlow {
        LoginFlow::new(self.session.clone(), self.navigator.clone())
    }

    pub fn dashboard(&self) -> Result<Dashboard, StorageError> {
        Dashboard::open(self.session.clone())
    }
}
