use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default runner API root
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/v1";

/// Default delay between status polls, in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Configured poll intervals below this are raised to it
pub const MIN_POLL_INTERVAL_MS: u64 = 100;

/// Language version requested when none is given
pub const DEFAULT_VERSION: &str = "1.1";

/// User id sent on cancel when none is configured
pub const DEFAULT_USER_ID: &str = "anonymous";

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSnipperConfig {
    #[serde(default)]
    pub server: RawServerConfig,

    #[serde(default)]
    pub execution: RawExecutionConfig,

    #[serde(default)]
    pub auth: RawAuthConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawServerConfig {
    pub base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawExecutionConfig {
    pub poll_interval_ms: Option<u64>,
    pub default_version: Option<String>,
    pub environment: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawAuthConfig {
    pub user_id: Option<String>,
    pub token: Option<String>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SnipperConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

impl SnipperConfig {
    /// Copy safe to print: the token is masked
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.auth.token.is_some() {
            config.auth.token = Some("********".to_string());
        }
        config
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Root URL of the runner API
    pub base_url: String,

    /// Per-request timeout; none when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionConfig {
    pub poll_interval_ms: u64,

    pub default_version: String,

    /// Environment passed to every run, before `--env` flags
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            default_version: DEFAULT_VERSION.to_string(),
            environment: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthConfig {
    /// Identity sent with cancel requests
    pub user_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            user_id: DEFAULT_USER_ID.to_string(),
            token: None,
        }
    }
}
