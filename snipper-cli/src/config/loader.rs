use super::types::{
    AuthConfig, DEFAULT_BASE_URL, DEFAULT_POLL_INTERVAL_MS, DEFAULT_USER_ID, DEFAULT_VERSION,
    ExecutionConfig, MIN_POLL_INTERVAL_MS, RawAuthConfig, RawExecutionConfig, RawServerConfig,
    RawSnipperConfig, ServerConfig, SnipperConfig,
};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Env var holding the bearer token; wins over any config file
pub const TOKEN_ENV: &str = "SNIPPER_TOKEN";

/// Env var overriding `server.base_url`
pub const BASE_URL_ENV: &str = "SNIPPER_BASE_URL";

/// Env var overriding the project config directory
pub const PROJECT_CONFIG_DIR_ENV: &str = "SNIPPER_PROJECT_CONFIG_DIR";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project + environment)
    pub fn load() -> Result<SnipperConfig> {
        let raw = Self::load_layers(&[Self::user_config_path(), Self::project_config_path()])?;
        Ok(Self::finalize(Self::apply_env(raw)))
    }

    /// Get user config path (`$XDG_CONFIG_HOME/snipper/config.toml`)
    pub fn user_config_path() -> PathBuf {
        snipper_paths::user_config_file()
    }

    /// Get project config path
    /// Can be overridden with SNIPPER_PROJECT_CONFIG_DIR env var (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var(PROJECT_CONFIG_DIR_ENV) {
            PathBuf::from(dir).join(snipper_paths::CONFIG_FILE_NAME)
        } else {
            PathBuf::from(".snipper").join(snipper_paths::CONFIG_FILE_NAME)
        }
    }

    /// Read config files in order, later files overriding earlier ones.
    /// Missing files are skipped.
    fn load_layers(paths: &[PathBuf]) -> Result<RawSnipperConfig> {
        let mut raw = RawSnipperConfig::default();
        for path in paths {
            if let Some(layer) = Self::read_layer(path)? {
                raw = Self::merge_raw(raw, layer);
            }
        }
        Ok(raw)
    }

    fn read_layer(path: &Path) -> Result<Option<RawSnipperConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        debug!(path = %path.display(), "Loading config layer");
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let layer = toml::from_str(&contents)
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(Some(layer))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawSnipperConfig, overlay: RawSnipperConfig) -> RawSnipperConfig {
        RawSnipperConfig {
            server: RawServerConfig {
                base_url: overlay.server.base_url.or(base.server.base_url),
                request_timeout_secs: overlay
                    .server
                    .request_timeout_secs
                    .or(base.server.request_timeout_secs),
            },
            execution: RawExecutionConfig {
                poll_interval_ms: overlay
                    .execution
                    .poll_interval_ms
                    .or(base.execution.poll_interval_ms),
                default_version: overlay
                    .execution
                    .default_version
                    .or(base.execution.default_version),
                environment: match (base.execution.environment, overlay.execution.environment) {
                    (Some(mut base_env), Some(overlay_env)) => {
                        base_env.extend(overlay_env);
                        Some(base_env)
                    }
                    (base_env, overlay_env) => overlay_env.or(base_env),
                },
            },
            auth: RawAuthConfig {
                user_id: overlay.auth.user_id.or(base.auth.user_id),
                token: overlay.auth.token.or(base.auth.token),
            },
        }
    }

    /// Apply SNIPPER_TOKEN and SNIPPER_BASE_URL on top of the file layers
    fn apply_env(mut raw: RawSnipperConfig) -> RawSnipperConfig {
        if let Ok(token) = std::env::var(TOKEN_ENV)
            && !token.is_empty()
        {
            raw.auth.token = Some(token);
        }
        if let Ok(base_url) = std::env::var(BASE_URL_ENV)
            && !base_url.is_empty()
        {
            raw.server.base_url = Some(base_url);
        }
        raw
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawSnipperConfig) -> SnipperConfig {
        SnipperConfig {
            server: ServerConfig {
                base_url: raw
                    .server
                    .base_url
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                request_timeout_secs: raw.server.request_timeout_secs,
            },
            execution: ExecutionConfig {
                poll_interval_ms: raw
                    .execution
                    .poll_interval_ms
                    .unwrap_or(DEFAULT_POLL_INTERVAL_MS)
                    .max(MIN_POLL_INTERVAL_MS),
                default_version: raw
                    .execution
                    .default_version
                    .unwrap_or_else(|| DEFAULT_VERSION.to_string()),
                environment: raw.execution.environment.unwrap_or_default(),
            },
            auth: AuthConfig {
                user_id: raw
                    .auth
                    .user_id
                    .unwrap_or_else(|| DEFAULT_USER_ID.to_string()),
                token: raw.auth.token,
            },
        }
    }
}
