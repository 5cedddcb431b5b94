//! Content-addressable package store.
//!
//! Fetched package contents live under `<root>/v1/<aa>/<rest>/package`,
//! addressed by a digest of the package identity and its integrity string.
//! Every project on the machine shares one store; the linker points module
//! directories at store entries instead of copying files around.

use crate::di::{FetchedContents, PackageFetcher};
use crate::resolver::graph::PackageRef;
use base64::Engine;
use flate2::read::GzDecoder;
use sha2::{Digest, Sha256, Sha512};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use wharf_core::core::path::ensure_dir;
use wharf_core::{WharfError, WharfResult};

/// Checksum algorithm for verifying package integrity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumAlgorithm {
    /// SHA-256, `sha256:<hex>`
    Sha256,
    /// SHA-512 in SRI form, `sha512-<base64>` (what npm registries publish)
    Sha512Sri,
    /// BLAKE3, `blake3:<hex>` (default for locally computed digests)
    #[default]
    Blake3,
}

impl ChecksumAlgorithm {
    /// Sniff the algorithm from a prefixed integrity string
    pub fn from_integrity(integrity: &str) -> Self {
        if integrity.starts_with("sha512-") {
            ChecksumAlgorithm::Sha512Sri
        } else if integrity.starts_with("sha256:") {
            ChecksumAlgorithm::Sha256
        } else {
            // Unprefixed digests are treated as BLAKE3
            ChecksumAlgorithm::Blake3
        }
    }

    /// Digest `data` into the same prefixed form the algorithm was sniffed from
    pub fn digest(&self, data: &[u8]) -> String {
        match self {
            ChecksumAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(data);
                format!("sha256:{}", hex::encode(hasher.finalize()))
            }
            ChecksumAlgorithm::Sha512Sri => {
                let mut hasher = Sha512::new();
                hasher.update(data);
                format!(
                    "sha512-{}",
                    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
                )
            }
            ChecksumAlgorithm::Blake3 => format!("blake3:{}", blake3::hash(data).to_hex()),
        }
    }
}

/// Verify raw bytes against a prefixed integrity string
pub fn verify_integrity(data: &[u8], expected: &str) -> bool {
    let algorithm = ChecksumAlgorithm::from_integrity(expected);
    let actual = algorithm.digest(data);
    // Compare without prefix so unprefixed legacy digests still match
    let strip = |s: &str| {
        s.split_once(':')
            .or_else(|| s.split_once('-'))
            .map(|(_, h)| h.to_string())
            .unwrap_or_else(|| s.to_string())
    };
    strip(expected) == strip(&actual)
}

/// A materialized store entry
#[derive(Debug, Clone)]
pub struct StoreEntry {
    /// The content-address key (hex digest)
    pub key: String,
    /// The entry directory under the store root
    pub dir: PathBuf,
    /// Integrity of the stored contents, verified or computed on fetch
    pub integrity: Option<String>,
}

impl StoreEntry {
    /// Directory holding the actual package files, the target of links
    pub fn contents_dir(&self) -> PathBuf {
        self.dir.join("package")
    }
}

/// Result of a prune pass over the store
#[derive(Debug, Default)]
pub struct StorePruneResult {
    pub entries_removed: usize,
    pub bytes_freed: u64,
}

/// Shared content-addressable store.
///
/// `ensure` is safe to call concurrently for the same package: a per-key
/// lock serializes materialization so exactly one caller fetches while the
/// rest wait and then observe the finished entry.
pub struct ContentStore {
    root: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ContentStore {
    pub fn new(root: PathBuf) -> WharfResult<Self> {
        ensure_dir(&root)?;
        Ok(Self {
            root,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The content-address key of a package identity.
    ///
    /// The integrity string participates so that re-published contents under
    /// the same version never collide with the old entry.
    pub fn content_key(pkg: &PackageRef, integrity: Option<&str>) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(pkg.key().as_bytes());
        if let Some(integrity) = integrity {
            hasher.update(b"\0");
            hasher.update(integrity.as_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }

    fn entry_dir(&self, key: &str) -> PathBuf {
        let (prefix, rest) = key.split_at(2);
        self.root.join("v1").join(prefix).join(rest)
    }

    /// Whether an entry for the key is already materialized
    pub fn contains(&self, key: &str) -> bool {
        self.entry_dir(key).join("package").is_dir()
    }

    /// Materialize the store entry for a package, fetching if absent.
    ///
    /// On a hit nothing is fetched. On a miss the contents are fetched,
    /// verified against `expected_integrity` when one is known, staged under
    /// a temporary directory and renamed into place, so a failed fetch never
    /// leaves a partial entry behind.
    pub async fn ensure(
        &self,
        pkg: &PackageRef,
        expected_integrity: Option<&str>,
        fetcher: &dyn PackageFetcher,
    ) -> WharfResult<StoreEntry> {
        let key = Self::content_key(pkg, expected_integrity);
        let dir = self.entry_dir(&key);

        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(key.clone()).or_default().clone()
        };
        let _guard = lock.lock().await;

        if dir.join("package").is_dir() {
            tracing::debug!(package = %pkg, key = %key, "store hit");
            let integrity = expected_integrity.map(str::to_string);
            return Ok(StoreEntry { key, dir, integrity });
        }

        tracing::debug!(package = %pkg, key = %key, "store miss, fetching");
        let fetched = fetcher.fetch(pkg).await?;
        let expected = expected_integrity
            .map(str::to_string)
            .or(fetched.integrity);

        let stage = self.stage_dir(&key)?;
        let result = self.materialize(pkg, &fetched.contents, expected.as_deref(), &stage);
        let integrity = match result {
            Ok(integrity) => integrity,
            Err(e) => {
                let _ = fs::remove_dir_all(&stage);
                return Err(e);
            }
        };

        if let Some(parent) = dir.parent() {
            ensure_dir(parent)?;
        }
        match fs::rename(&stage, &dir) {
            Ok(()) => {}
            // Lost a cross-process race; the other writer's entry is as good
            Err(_) if dir.join("package").is_dir() => {
                let _ = fs::remove_dir_all(&stage);
            }
            Err(e) => {
                let _ = fs::remove_dir_all(&stage);
                return Err(e.into());
            }
        }

        Ok(StoreEntry {
            key,
            dir,
            integrity: Some(integrity),
        })
    }

    fn stage_dir(&self, key: &str) -> WharfResult<PathBuf> {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let stage = self.root.join("tmp").join(format!("{}.{}", key, nanos));
        ensure_dir(&stage)?;
        Ok(stage)
    }

    /// Write fetched contents into the staging directory, verifying along
    /// the way. Returns the integrity of what was written.
    fn materialize(
        &self,
        pkg: &PackageRef,
        contents: &FetchedContents,
        expected: Option<&str>,
        stage: &Path,
    ) -> WharfResult<String> {
        let package_dir = stage.join("package");
        ensure_dir(&package_dir)?;

        match contents {
            FetchedContents::Archive(bytes) => {
                if let Some(expected) = expected {
                    if !verify_integrity(bytes, expected) {
                        return Err(WharfError::Store(format!(
                            "Integrity mismatch for {}: expected {}",
                            pkg, expected
                        )));
                    }
                }
                unpack_tarball(bytes, &package_dir)?;
                Ok(expected
                    .map(str::to_string)
                    .unwrap_or_else(|| ChecksumAlgorithm::Blake3.digest(bytes)))
            }
            FetchedContents::Unpacked(files) => {
                let mut hasher = blake3::Hasher::new();
                for file in files {
                    let dest = package_dir.join(&file.path);
                    if let Some(parent) = dest.parent() {
                        ensure_dir(parent)?;
                    }
                    fs::write(&dest, &file.contents)?;
                    hasher.update(file.path.to_string_lossy().as_bytes());
                    hasher.update(b"\0");
                    hasher.update(&file.contents);
                }
                Ok(format!("blake3:{}", hasher.finalize().to_hex()))
            }
        }
    }

    /// Remove every entry whose content key is not in `live`.
    pub fn prune(&self, live: &HashSet<String>) -> WharfResult<StorePruneResult> {
        let mut result = StorePruneResult::default();
        let v1 = self.root.join("v1");
        if !v1.is_dir() {
            return Ok(result);
        }

        for prefix_entry in fs::read_dir(&v1)? {
            let prefix_entry = prefix_entry?;
            let prefix = prefix_entry.file_name().to_string_lossy().into_owned();
            if !prefix_entry.path().is_dir() {
                continue;
            }
            for rest_entry in fs::read_dir(prefix_entry.path())? {
                let rest_entry = rest_entry?;
                let rest = rest_entry.file_name().to_string_lossy().into_owned();
                let key = format!("{}{}", prefix, rest);
                if live.contains(&key) {
                    continue;
                }
                result.bytes_freed += dir_size(&rest_entry.path());
                fs::remove_dir_all(rest_entry.path())?;
                result.entries_removed += 1;
            }
        }

        // Stale staging leftovers from interrupted fetches go too
        let tmp = self.root.join("tmp");
        if tmp.is_dir() {
            for entry in fs::read_dir(&tmp)? {
                let entry = entry?;
                result.bytes_freed += dir_size(&entry.path());
                fs::remove_dir_all(entry.path())?;
            }
        }

        Ok(result)
    }
}

fn dir_size(dir: &Path) -> u64 {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Unpack a gzipped tarball, stripping the conventional leading `package/`
/// path component npm tarballs carry.
fn unpack_tarball(bytes: &[u8], dest: &Path) -> WharfResult<()> {
    let decoder = GzDecoder::new(bytes);
    let mut archive = tar::Archive::new(decoder);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let mut components = path.components();
        let first = components.next();
        let stripped: PathBuf = if first.map(|c| c.as_os_str() == "package").unwrap_or(false) {
            components.collect()
        } else {
            path
        };
        if stripped.as_os_str().is_empty() {
            continue;
        }
        let target = dest.join(stripped);
        if let Some(parent) = target.parent() {
            ensure_dir(parent)?;
        }
        entry.unpack(&target)?;
    }
    Ok(())
}
