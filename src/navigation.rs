//! Navigation seam and the redirect-to-login escalation path.

use std::sync::{Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::session::{SessionStore, StorageError};

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Whatever hosts the application's views: tracks where the user is and
/// moves them somewhere else.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn navigate(&self, path: &str);
}

#[derive(Debug)]
struct History {
    current: String,
    visited: Vec<String>,
}

/// An in-process navigator that remembers every navigation it performed.
#[derive(Debug)]
pub struct HistoryNavigator {
    history: Mutex<History>,
}

impl HistoryNavigator {
    pub fn new(initial_path: impl Into<String>) -> Self {
        HistoryNavigator {
            history: Mutex::new(History {
                current: initial_path.into(),
                visited: Vec::new(),
            }),
        }
    }

    /// Paths navigated to since construction, oldest first.
    pub fn visited(&self) -> Vec<String> {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history.visited.clone()
    }
}

impl Default for HistoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for HistoryNavigator {
    fn current_path(&self) -> String {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history.current.clone()
    }

    fn navigate(&self, path: &str) {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(from = %history.current, to = %path, "Navigating");
        history.current = path.to_string();
        history.visited.push(path.to_string());
    }
}

pub fn is_login_path(path: &str) -> bool {
    path.contains(LOGIN_PATH)
}

/// Ends the session after an unrecoverable auth failure.
///
/// Clears both tiers, remembers the current path for after the next login and
/// moves to the login view unless we are already there. Returns whether a
/// navigation happened. Storage failures are logged, never raised: the user
/// must still end up on the login view.
pub fn redirect_to_login(store: &SessionStore, navigator: &dyn Navigator) -> bool {
    if let Err(e) = store.clear() {
        warn!("Failed to clear session before redirect: {}", e);
    }

    let current = navigator.current_path();
    if is_login_path(&current) {
        debug!("Already on the login view; not redirecting again");
        return false;
    }

    if let Err(e) = store.set_redirect_path(&current) {
        warn!("Failed to remember redirect path '{}': {}", current, e);
    }
    info!(from = %current, "Session ended; redirecting to login");
    navigator.navigate(LOGIN_PATH);
    true
}

/// Explicit logout: drops the session from both tiers and navigates to
/// `redirect_url`.
pub fn logout_all(
    store: &SessionStore,
    navigator: &dyn Navigator,
    redirect_url: &str,
) -> Result<(), StorageError> {
    store.clear()?;
    info!("User logged out");
    navigator.navigate(redirect_url);
    Ok(())
}
