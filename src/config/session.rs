use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Session persistence settings.
///
/// - durable_path: JSON file backing the durable ("remember me") tier.
///   The ephemeral tier always lives in process memory.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct SessionConfig {
    #[serde(default = "default_durable_path")]
    pub durable_path: PathBuf,
}

fn default_durable_path() -> PathBuf {
    PathBuf::from("./carino-session.json")
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            durable_path: default_durable_path(),
        }
    }
}
