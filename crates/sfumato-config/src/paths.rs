//! Platform-specific configuration paths.
//!
//! - **User config**: `~/.config/sfumato/` (Linux),
//!   `~/Library/Application Support/sfumato/` (macOS), `%APPDATA%\sfumato\`
//!   (Windows)
//! - **Default settings file**: `config.toml` inside the user config directory

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Application name used for directory paths.
#[cfg(feature = "std")]
const APP_NAME: &str = "sfumato";

/// File name of the default settings file.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
#[cfg(feature = "std")]
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Path of the default settings file.
#[cfg(feature = "std")]
pub fn default_config_path() -> PathBuf {
    user_config_dir().join(CONFIG_FILE_NAME)
}

/// Ensure the user config directory exists.
///
/// Creates the directory and any parent directories if they don't exist.
#[cfg(feature = "std")]
pub fn ensure_user_config_dir() -> Result<PathBuf, ConfigError> {
    let dir = user_config_dir();
    ensure_dir(&dir)?;
    Ok(dir)
}

pub(crate) fn ensure_dir(dir: &Path) -> Result<(), ConfigError> {
    if !dir.as_os_str().is_empty() && !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::create_dir(dir, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "std")]
    #[test]
    fn config_path_lives_in_app_dir() {
        let path = default_config_path();
        assert!(path.ends_with("sfumato/config.toml"));
        assert!(path.starts_with(user_config_dir()));
    }

    #[test]
    fn ensure_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_dir(&nested).unwrap();
    }
}
