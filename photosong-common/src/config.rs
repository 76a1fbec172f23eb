//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file (`root_folder` key)
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "PHOTOSONG_ROOT_FOLDER";

/// Environment variable naming an explicit TOML config file
pub const CONFIG_FILE_ENV: &str = "PHOTOSONG_CONFIG";

/// Resolve the service root folder
///
/// `toml_root` is the `root_folder` value already parsed from the TOML file, if any.
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_root: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        debug!("Root folder from command line: {}", path.display());
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            debug!("Root folder from {}: {}", ROOT_FOLDER_ENV, path);
            return PathBuf::from(path);
        }
    }

    if let Some(path) = toml_root {
        debug!("Root folder from TOML config: {}", path.display());
        return path.to_path_buf();
    }

    default_root_folder()
}

/// Locate the TOML config file for a module
///
/// Checks `PHOTOSONG_CONFIG` first, then `<config dir>/photosong/<module>.toml`,
/// then `/etc/photosong/<module>.toml` on Linux. Returns `None` if nothing exists.
pub fn locate_config_file(module_name: &str) -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        warn!("{} points at missing file: {}", CONFIG_FILE_ENV, path.display());
    }

    let file_name = format!("{}.toml", module_name);

    if let Some(user_config) = dirs::config_dir().map(|d| d.join("photosong").join(&file_name)) {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/photosong").join(&file_name);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Parse a TOML file into any deserializable config struct
pub fn load_toml_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/photosong (or /var/lib/photosong for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("photosong"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/photosong"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("photosong"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/photosong"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("photosong"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\photosong"))
    } else {
        PathBuf::from("./photosong_data")
    }
}
