use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

/// Config file name looked up in the working directory and the config dir.
pub const CONFIG_FILE_NAME: &str = "caddie.json";

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV_VAR: &str = "CADDIE_CONFIG";

/// Base caddie config directory (universal ~/.config/caddie/ on all platforms)
pub fn caddie() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected("APPDATA environment variable not set on Windows")
        })?;
        Ok(PathBuf::from(appdata).join("caddie"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected("HOME environment variable not set on Unix-like system")
        })?;
        Ok(PathBuf::from(home).join(".config").join("caddie"))
    }
}

/// Global caddie.json path
pub fn global_config() -> Result<PathBuf> {
    Ok(caddie()?.join(CONFIG_FILE_NAME))
}

/// Candidate config locations in lookup order.
///
/// An explicit path wins outright; otherwise `$CADDIE_CONFIG`, then
/// `./caddie.json`, then the global config.
pub fn config_candidates(explicit: Option<&str>) -> Vec<PathBuf> {
    if let Some(path) = explicit {
        return vec![PathBuf::from(shellexpand::tilde(path).to_string())];
    }

    let mut candidates = Vec::new();
    if let Ok(path) = env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            candidates.push(PathBuf::from(shellexpand::tilde(&path).to_string()));
        }
    }
    if let Ok(cwd) = env::current_dir() {
        candidates.push(cwd.join(CONFIG_FILE_NAME));
    }
    if let Ok(global) = global_config() {
        candidates.push(global);
    }
    candidates
}
