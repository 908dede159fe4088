pub mod client;
pub mod coordinator;
pub mod error;
pub mod refresh;
pub mod request;

// Re-export from client.rs so we can do "use crate::client::AuthClient;"
pub use client::AuthClient;
pub use coordinator::{RefreshCoordinator, RefreshGuard, Signature, Ticket};
pub use error::{ClientError, RefreshError};
pub use refresh::{HttpTokenRefresher, TokenRefresher, REFRESH_PATH};
pub use request::{ApiRequest, ApiResponse};
