use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The profile stored under `userInfo` after a login.
///
/// The session store keeps it as opaque JSON; this is the shape the demo
/// login writes and the dashboard reads back.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: u32,
    pub name: String,
    pub email: String,
    /// One of the hardcoded demo roles ("admin", "manager", "user").
    pub role: String,
    pub avatar: Option<String>,
}

impl UserProfile {
    pub fn new(id: u32, name: &str, email: &str, role: &str) -> Self {
        UserProfile {
            id,
            name: name.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            avatar: None,
        }
    }

    /// Interprets a stored profile. Anything not shaped like a profile yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}
