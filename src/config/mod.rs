//! Install configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use wharf_core::core::path::{default_store_dir, lockfile_path, modules_dir, virtual_store_dir};
use wharf_core::{WharfError, WharfResult};

/// The optional per-project configuration file
pub const CONFIG_FILE: &str = "wharf.yaml";

/// Everything an install run needs to know about its environment.
///
/// All fields have sensible defaults; a project with no `wharf.yaml` gets
/// an isolated layout, the shared platform store and a non-frozen install.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallConfig {
    /// Project root directory (not serialized, always set by the caller)
    #[serde(skip)]
    pub root: PathBuf,

    /// Content store location (defaults to the platform cache directory)
    ///
    /// Default locations:
    /// - Linux: ~/.cache/wharf/store
    /// - macOS: ~/Library/Caches/wharf/store
    /// - Windows: %LOCALAPPDATA%\wharf\store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<PathBuf>,

    /// Virtual store location (defaults to `packages_modules/.wharf`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_store_dir: Option<PathBuf>,

    /// Registry base URL
    #[serde(default = "default_registry_url")]
    pub registry_url: String,

    /// Flatten the module tree instead of the isolated layout
    #[serde(default)]
    pub hoisted: bool,

    /// Fail instead of writing when the lockfile would change
    #[serde(default)]
    pub frozen_lockfile: bool,

    /// Treat a lockfile from an incompatible format version as absent
    #[serde(default)]
    pub ignore_incompatible_lockfile: bool,

    /// Resolve everything fresh, ignoring locked versions
    #[serde(default)]
    pub force_update: bool,

    /// Upper bound on concurrent registry requests
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_fetches: usize,
}

fn default_registry_url() -> String {
    "https://registry.npmjs.org".to_string()
}

fn default_max_concurrent() -> usize {
    16
}

impl InstallConfig {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            store_dir: None,
            virtual_store_dir: None,
            registry_url: default_registry_url(),
            hoisted: false,
            frozen_lockfile: false,
            ignore_incompatible_lockfile: false,
            force_update: false,
            max_concurrent_fetches: default_max_concurrent(),
        }
    }

    /// Load the project configuration, falling back to defaults when the
    /// file is absent.
    pub fn load(root: &Path) -> WharfResult<Self> {
        let path = root.join(CONFIG_FILE);
        let mut config = match fs::read_to_string(&path) {
            Ok(content) => serde_yaml::from_str::<InstallConfig>(&content)
                .map_err(|e| WharfError::Config(format!("Invalid {}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::new(root.to_path_buf()),
            Err(e) => return Err(e.into()),
        };
        config.root = root.to_path_buf();
        Ok(config)
    }

    /// The resolved content store directory
    pub fn store_dir(&self) -> WharfResult<PathBuf> {
        match &self.store_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_store_dir(),
        }
    }

    /// The resolved virtual store directory
    pub fn virtual_store_dir(&self) -> PathBuf {
        self.virtual_store_dir
            .clone()
            .unwrap_or_else(|| virtual_store_dir(&self.root))
    }

    /// The module directory of one importer (`.` is the project root)
    pub fn modules_dir_for(&self, importer_id: &str) -> PathBuf {
        if importer_id == "." {
            modules_dir(&self.root)
        } else {
            modules_dir(&self.root.join(importer_id))
        }
    }

    /// Where the wanted lockfile lives
    pub fn lockfile_path(&self) -> PathBuf {
        lockfile_path(&self.root)
    }
}
