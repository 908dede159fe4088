use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::storage::{MemoryStorage, Storage, StorageError};
use super::{
    ACTIVE_SECTION_KEY, AUTH_TOKEN_KEY, REDIRECT_PATH_KEY, REFRESH_TOKEN_KEY, USER_INFO_KEY,
};

/// Keys that make up a session in either tier.
const SESSION_KEYS: [&str; 3] = [AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_INFO_KEY];

/// How long a session outlives the current process.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Survives restarts ("remember me").
    Durable,
    /// Lives only as long as the current process.
    Ephemeral,
}

impl Tier {
    pub fn from_remember_me(remember_me: bool) -> Self {
        if remember_me {
            Tier::Durable
        } else {
            Tier::Ephemeral
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Durable => f.write_str("durable"),
            Tier::Ephemeral => f.write_str("ephemeral"),
        }
    }
}

/// The credentials and profile read from whichever tier holds them.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub tier: Tier,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user_profile: Option<Value>,
}

/// Two-tier session persistence.
///
/// The durable tier is always consulted first. Writes go to exactly one tier;
/// `clear` always empties both.
#[derive(Clone)]
pub struct SessionStore {
    durable: Arc<dyn Storage>,
    ephemeral: Arc<dyn Storage>,
}

impl SessionStore {
    pub fn new(durable: Arc<dyn Storage>, ephemeral: Arc<dyn Storage>) -> Self {
        debug!(
            "Session tiers: durable '{}', ephemeral '{}'",
            durable.name(),
            ephemeral.name()
        );
        SessionStore { durable, ephemeral }
    }

    /// Both tiers backed by process memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), Arc::new(MemoryStorage::new()))
    }

    pub fn storage(&self, tier: Tier) -> &dyn Storage {
        match tier {
            Tier::Durable => self.durable.as_ref(),
            Tier::Ephemeral => self.ephemeral.as_ref(),
        }
    }

    /// A shared handle on one tier, for components that persist their own keys.
    pub fn shared(&self, tier: Tier) -> Arc<dyn Storage> {
        match tier {
            Tier::Durable => Arc::clone(&self.durable),
            Tier::Ephemeral => Arc::clone(&self.ephemeral),
        }
    }

    pub fn durable(&self) -> &dyn Storage {
        self.durable.as_ref()
    }

    pub fn ephemeral(&self) -> &dyn Storage {
        self.ephemeral.as_ref()
    }

    /// The tier currently holding session data, durable first.
    pub fn active_tier(&self) -> Result<Option<Tier>, StorageError> {
        for tier in [Tier::Durable, Tier::Ephemeral] {
            let storage = self.storage(tier);
            for key in SESSION_KEYS {
                if storage.get_item(key)?.is_some() {
                    return Ok(Some(tier));
                }
            }
        }
        Ok(None)
    }

    /// Reads the whole triple from the active tier. Keys are never mixed
    /// across tiers.
    pub fn load(&self) -> Result<Option<Session>, StorageError> {
        let Some(tier) = self.active_tier()? else {
            return Ok(None);
        };
        let storage = self.storage(tier);
        let user_profile = match storage.get_item(USER_INFO_KEY)? {
            Some(raw) => Some(serde_json::from_str(&raw)?),
            None => None,
        };

        Ok(Some(Session {
            tier,
            access_token: storage.get_item(AUTH_TOKEN_KEY)?,
            refresh_token: storage.get_item(REFRESH_TOKEN_KEY)?,
            user_profile,
        }))
    }

    /// Writes the triple to `tier` in one batch. The other tier is not touched.
    pub fn save(
        &self,
        tier: Tier,
        access_token: &str,
        refresh_token: &str,
        user_profile: &Value,
    ) -> Result<(), StorageError> {
        let profile = serde_json::to_string(user_profile)?;
        self.storage(tier).set_items(&[
            (AUTH_TOKEN_KEY, access_token.to_string()),
            (REFRESH_TOKEN_KEY, refresh_token.to_string()),
            (USER_INFO_KEY, profile),
        ])?;
        debug!(tier = %tier, "Session saved");
        Ok(())
    }

    /// Removes the session (and the dashboard preference) from both tiers.
    /// Both tiers are attempted even if the first one fails.
    pub fn clear(&self) -> Result<(), StorageError> {
        let keys = [
            AUTH_TOKEN_KEY,
            REFRESH_TOKEN_KEY,
            USER_INFO_KEY,
            ACTIVE_SECTION_KEY,
        ];
        let durable = self.durable.remove_items(&keys);
        let ephemeral = self.ephemeral.remove_items(&keys);
        if let Err(e) = &durable {
            warn!("Failed to clear durable session tier: {}", e);
        }
        if let Err(e) = &ephemeral {
            warn!("Failed to clear ephemeral session tier: {}", e);
        }
        debug!("Session cleared from both tiers");
        durable.and(ephemeral)
    }

    /// Stores a fresh login in the tier picked by `remember_me`, after
    /// removing any session left in the other tier.
    pub fn login_all(
        &self,
        access_token: &str,
        refresh_token: &str,
        user_profile: &Value,
        remember_me: bool,
    ) -> Result<Tier, StorageError> {
        let tier = Tier::from_remember_me(remember_me);
        self.clear()?;
        self.save(tier, access_token, refresh_token, user_profile)?;
        info!(tier = %tier, "User session stored");
        Ok(tier)
    }

    pub fn access_token(&self) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.and_then(|s| s.access_token))
    }

    pub fn refresh_token(&self) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.and_then(|s| s.refresh_token))
    }

    pub fn user_profile(&self) -> Result<Option<Value>, StorageError> {
        Ok(self.load()?.and_then(|s| s.user_profile))
    }

    pub fn is_logged_in(&self) -> Result<bool, StorageError> {
        Ok(self.access_token()?.is_some())
    }

    /// Replaces the access token in the tier holding the session and returns
    /// that tier. Without a session nothing is written and `None` is returned.
    pub fn update_access_token(&self, access_token: &str) -> Result<Option<Tier>, StorageError> {
        let Some(tier) = self.active_tier()? else {
            debug!("No session to update; access token discarded");
            return Ok(None);
        };
        self.storage(tier)
            .set_item(AUTH_TOKEN_KEY, access_token.to_string())?;
        debug!(tier = %tier, "Access token updated");
        Ok(Some(tier))
    }

    pub fn set_redirect_path(&self, path: &str) -> Result<(), StorageError> {
        self.durable.set_item(REDIRECT_PATH_KEY, path.to_string())
    }

    /// Returns and forgets the remembered post-login path.
    pub fn take_redirect_path(&self) -> Result<Option<String>, StorageError> {
        let path = self.durable.get_item(REDIRECT_PATH_KEY)?;
        if path.is_some() {
            self.durable.remove_item(REDIRECT_PATH_KEY)?;
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile() -> Value {
        json!({"id": 1, "name": "System Administrator", "role": "admin"})
    }

    #[test]
    fn test_save_ephemeral_leaves_durable_untouched() {
        let store = SessionStore::in_memory();
        store.durable().set_item("unrelated", "x".to_string()).unwrap();

        store.save(Tier::Ephemeral, "T1", "R1", &profile()).unwrap();

        assert_eq!(store.durable().keys().unwrap(), vec!["unrelated".to_string()]);
        assert_eq!(store.ephemeral().get_item(AUTH_TOKEN_KEY).unwrap().as_deref(), Some("T1"));
    }

    #[test]
    fn test_save_durable_leaves_ephemeral_untouched() {
        let store = SessionStore::in_memory();
        store.save(Tier::Durable, "T1", "R1", &profile()).unwrap();
        assert!(store.ephemeral().is_empty().unwrap());
        assert_eq!(store.durable().get_item(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("R1"));
    }

    #[test]
    fn test_load_prefers_durable_and_never_mixes_tiers() {
        let store = SessionStore::in_memory();
        store.save(Tier::Ephemeral, "T-eph", "R-eph", &profile()).unwrap();
        store.durable().set_item(AUTH_TOKEN_KEY, "T-dur".to_string()).unwrap();

        let session = store.load().unwrap().expect("session should load");
        assert_eq!(session.tier, Tier::Durable);
        assert_eq!(session.access_token.as_deref(), Some("T-dur"));
        // The durable tier has no refresh token; the ephemeral one is not consulted.
        assert_eq!(session.refresh_token, None);
        assert_eq!(session.user_profile, None);
    }

    #[test]
    fn test_load_returns_profile_json() {
        let store = SessionStore::in_memory();
        store.save(Tier::Ephemeral, "T1", "R1", &profile()).unwrap();
        let session = store.load().unwrap().unwrap();
        assert_eq!(session.tier, Tier::Ephemeral);
        assert_eq!(session.user_profile, Some(profile()));
        assert!(store.is_logged_in().unwrap());
    }

    #[test]
    fn test_load_empty_store() {
        let store = SessionStore::in_memory();
        assert_eq!(store.load().unwrap(), None);
        assert!(!store.is_logged_in().unwrap());
        assert_eq!(store.refresh_token().unwrap(), None);
    }

    #[test]
    fn test_corrupt_profile_is_an_error() {
        let store = SessionStore::in_memory();
        store.ephemeral().set_item(USER_INFO_KEY, "{oops".to_string()).unwrap();
        assert!(matches!(store.load(), Err(StorageError::Serialization(_))));
    }

    #[test]
    fn test_clear_empties_both_tiers_and_is_idempotent() {
        let store = SessionStore::in_memory();
        store.save(Tier::Durable, "T1", "R1", &profile()).unwrap();
        store.save(Tier::Ephemeral, "T2", "R2", &profile()).unwrap();
        store.ephemeral().set_item(ACTIVE_SECTION_KEY, "clients".to_string()).unwrap();

        store.clear().unwrap();
        assert!(store.durable().is_empty().unwrap());
        assert!(store.ephemeral().is_empty().unwrap());

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_login_all_without_remember_me_uses_ephemeral_tier() {
        let store = SessionStore::in_memory();
        let tier = store.login_all("T1", "R1", &profile(), false).unwrap();

        assert_eq!(tier, Tier::Ephemeral);
        assert!(store.durable().is_empty().unwrap());
        assert_eq!(store.ephemeral().get_item(AUTH_TOKEN_KEY).unwrap().as_deref(), Some("T1"));
        assert_eq!(store.ephemeral().get_item(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("R1"));
        assert_eq!(store.user_profile().unwrap(), Some(profile()));
    }

    #[test]
    fn test_login_all_replaces_session_in_other_tier() {
        let store = SessionStore::in_memory();
        store.login_all("T1", "R1", &profile(), true).unwrap();
        store.login_all("T2", "R2", &profile(), false).unwrap();

        assert!(store.durable().is_empty().unwrap());
        assert_eq!(store.access_token().unwrap().as_deref(), Some("T2"));
    }

    #[test]
    fn test_update_access_token_targets_active_tier() {
        let store = SessionStore::in_memory();
        store.login_all("T1", "R1", &profile(), false).unwrap();

        let tier = store.update_access_token("T2").unwrap();
        assert_eq!(tier, Some(Tier::Ephemeral));
        assert!(store.durable().is_empty().unwrap());
        assert_eq!(store.access_token().unwrap().as_deref(), Some("T2"));
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("R1"));
    }

    #[test]
    fn test_update_access_token_without_session_writes_nothing() {
        let store = SessionStore::in_memory();
        store.login_all("T1", "R1", &profile(), false).unwrap();
        store.clear().unwrap();

        assert_eq!(store.update_access_token("T2").unwrap(), None);
        assert!(store.durable().is_empty().unwrap());
        assert!(store.ephemeral().is_empty().unwrap());
        assert!(!store.is_logged_in().unwrap());
    }

    #[test]
    fn test_redirect_path_is_taken_once() {
        let store = SessionStore::in_memory();
        store.set_redirect_path("/dashboard").unwrap();
        assert_eq!(store.take_redirect_path().unwrap().as_deref(), Some("/dashboard"));
        assert_eq!(store.take_redirect_path().unwrap(), None);
    }

    #[test]
    fn test_tier_from_remember_me() {
        assert_eq!(Tier::from_remember_me(true), Tier::Durable);
        assert_eq!(Tier::from_remember_me(false), Tier::Ephemeral);
        assert_eq!(Tier::Ephemeral.to_string(), "ephemeral");
    }
}
