//! Path Utilities
//!
//! Resolves the application directory (~/.chalkline/).

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the Chalkline directory (~/.chalkline/)
pub fn chalkline_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".chalkline"))
}

/// Get the config file path (~/.chalkline/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(chalkline_dir()?.join("config.json"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Get the Chalkline directory, creating it if it doesn't exist
pub fn ensure_chalkline_dir() -> AppResult<PathBuf> {
    let path = chalkline_dir()?;
    ensure_dir(&path)?;
    Ok(path)
}
