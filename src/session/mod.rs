pub mod file_storage;
pub mod storage;
pub mod store;

// Re-export the primary session items so code outside can do
// "use crate::session::{SessionStore, Tier};"
pub use file_storage::FileStorage;
pub use storage::{MemoryStorage, Storage, StorageError};
pub use store::{Session, SessionStore, Tier};

/// Key holding the bearer access token in either tier.
pub const AUTH_TOKEN_KEY: &str = "authToken";
/// Key holding the refresh token in either tier.
pub const REFRESH_TOKEN_KEY: &str = "refresh";
/// Key holding the JSON-serialized user profile in either tier.
pub const USER_INFO_KEY: &str = "userInfo";
/// Dashboard preference cleared together with the session.
pub const ACTIVE_SECTION_KEY: &str = "activeSection";
/// Path to return to after the next successful login (durable tier only).
pub const REDIRECT_PATH_KEY: &str = "redirectPath";
