//! XDG Base Directory paths for snipper.
//!
//! The CLI resolves its user configuration the same way on every platform
//! (`~/.config/snipper`), like gh or kubectl, instead of the platform-native
//! application support directories.

use std::path::PathBuf;

/// Name of the configuration file inside every config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Get the snipper config directory.
///
/// Returns `$XDG_CONFIG_HOME/snipper` if set, otherwise `~/.config/snipper`.
///
/// # Examples
///
/// ```
/// use snipper_paths::config_dir;
///
/// let config = config_dir();
/// assert!(config.ends_with("snipper"));
/// ```
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config).join("snipper")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".config/snipper")
    } else {
        PathBuf::from(".config/snipper")
    }
}

/// Path of the user-level config file.
pub fn user_config_file() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}
