use crate::core::error::{WharfError, WharfResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the default global content store directory
///
/// Platform-specific locations:
/// - Windows: %LOCALAPPDATA%\wharf\store
/// - Linux: ~/.cache/wharf/store
/// - macOS: ~/Library/Caches/wharf/store
pub fn default_store_dir() -> WharfResult<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .ok_or_else(|| WharfError::Path("Could not determine cache directory".to_string()))?;
    Ok(cache_dir.join("wharf").join("store"))
}

/// Get the modules directory for a project (./packages_modules)
pub fn modules_dir(project_root: &Path) -> PathBuf {
    project_root.join("packages_modules")
}

/// Get the virtual store directory for a project (./packages_modules/.wharf)
pub fn virtual_store_dir(project_root: &Path) -> PathBuf {
    modules_dir(project_root).join(".wharf")
}

/// Get the wanted lockfile path for a project root
pub fn lockfile_path(project_root: &Path) -> PathBuf {
    project_root.join("wharf-lock.yaml")
}

/// Ensure a directory exists, creating it and its parents if necessary
pub fn ensure_dir(path: &Path) -> WharfResult<()> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| {
            WharfError::Path(format!(
                "Failed to create directory {}: {}",
                path.display(),
                e
            ))
        })?;
    }
    Ok(())
}
