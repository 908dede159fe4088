//! Demo login: checks credentials against the built-in accounts and opens a
//! session for the matching user.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::UserProfile;
use crate::navigation::{Navigator, DASHBOARD_PATH};
use crate::session::{SessionStore, StorageError, Tier};

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("Invalid email or password. Please try again.")]
    InvalidCredentials,

    #[error("could not store session: {0}")]
    Storage(#[from] StorageError),
}

/// A built-in account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoAccount {
    pub id: u32,
    pub email: &'static str,
    pub password: &'static str,
    pub name: &'static str,
    pub role: &'static str,
}

impl DemoAccount {
    pub fn profile(&self) -> UserProfile {
        UserProfile::new(self.id, self.name, self.email, self.role)
    }
}

pub const DEMO_ACCOUNTS: [DemoAccount; 3] = [
    DemoAccount {
        id: 1,
        email: "admin@carino.rw",
        password: "admin123",
        name: "System Administrator",
        role: "admin",
    },
    DemoAccount {
        id: 2,
        email: "manager@carino.rw",
        password: "manager123",
        name: "Operations Manager",
        role: "manager",
    },
    DemoAccount {
        id: 3,
        email: "user@carino.rw",
        password: "user123",
        name: "Business Analyst",
        role: "user",
    },
];

/// The email/password pair used to pre-fill the form for `role`.
pub fn demo_credentials(role: &str) -> Option<(&'static str, &'static str)> {
    DEMO_ACCOUNTS
        .iter()
        .find(|account| account.role == role)
        .map(|account| (account.email, account.password))
}

fn find_account(email: &str, password: &str) -> Option<&'static DemoAccount> {
    DEMO_ACCOUNTS
        .iter()
        .find(|account| account.email == email && account.password == password)
}

pub struct LoginFlow {
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
}

impl LoginFlow {
    pub fn new(session: SessionStore, navigator: Arc<dyn Navigator>) -> Self {
        LoginFlow { session, navigator }
    }

    /// Where to go instead of showing the form, when a session already exists.
    pub fn bootstrap(&self) -> Result<Option<&'static str>, LoginError> {
        if self.session.is_logged_in()? {
            info!("Existing session found; skipping login");
            return Ok(Some(DASHBOARD_PATH));
        }
        Ok(None)
    }

    /// Logs in with the given credentials and navigates away from the form.
    /// Returns the tier the session was written to.
    pub fn submit(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<Tier, LoginError> {
        let Some(account) = find_account(email, password) else {
            warn!("Rejected login attempt");
            return Err(LoginError::InvalidCredentials);
        };

        let issued = Utc::now().timestamp_millis();
        let access_token = format!("mock-jwt-token-{}-{}", issued, account.id);
        let refresh_token = format!("mock-refresh-token-{}-{}", issued, account.id);

        let tier = self.session.login_all(
            &access_token,
            &refresh_token,
            &account.profile().to_value(),
            remember_me,
        )?;

        let target = self
            .session
            .take_redirect_path()?
            .unwrap_or_else(|| DASHBOARD_PATH.to_string());
        info!(role = account.role, tier = %tier, to = %target, "User logged in");
        self.navigator.navigate(&target);
        Ok(tier)
    }
}
