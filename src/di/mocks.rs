//! In-memory test doubles for the collaborator traits.
//!
//! Used by unit tests and the integration suites; kept out of `#[cfg(test)]`
//! so `tests/` can use them too.

use crate::di::traits::{
    FetchedContents, FetchedPackage, MetadataSource, PackageFetcher, PackageFile, PackageMetadata,
    VersionMetadata,
};
use crate::resolver::graph::PackageRef;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use wharf_core::{Version, WharfError, WharfResult};

/// A metadata source backed by a fixed in-memory table
#[derive(Default)]
pub struct MockMetadataSource {
    packages: Mutex<HashMap<String, PackageMetadata>>,
    lookups: AtomicUsize,
}

impl MockMetadataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a package version with the given runtime dependencies
    pub fn add_version(&self, name: &str, version: &str, dependencies: &[(&str, &str)]) {
        let mut meta = VersionMetadata::new(Version::parse(version).unwrap());
        for (dep, range) in dependencies {
            meta.dependencies.insert((*dep).to_string(), (*range).to_string());
        }
        self.add(name, meta);
    }

    /// Register a fully specified version metadata entry
    pub fn add(&self, name: &str, meta: VersionMetadata) {
        let mut packages = self.packages.lock().unwrap();
        packages
            .entry(name.to_string())
            .or_insert_with(|| PackageMetadata::new(name))
            .versions
            .push(meta);
    }

    /// How many metadata documents have been requested
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataSource for MockMetadataSource {
    async fn package_metadata(&self, name: &str) -> WharfResult<PackageMetadata> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let packages = self.packages.lock().unwrap();
        packages
            .get(name)
            .cloned()
            .ok_or_else(|| WharfError::Package(format!("No metadata for '{}'", name)))
    }
}

/// A fetcher that synthesizes package contents in memory.
///
/// Counts fetches and can be told to fail or to stall, for exercising the
/// store's at-most-once and retry behavior.
#[derive(Default)]
pub struct MockPackageFetcher {
    fetches: AtomicUsize,
    fail_remaining: AtomicUsize,
    delay: Option<Duration>,
}

impl MockPackageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` fetch calls before succeeding again
    pub fn fail_next(&self, n: usize) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    /// Sleep this long inside every fetch (widens concurrency windows)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many times fetch was invoked
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PackageFetcher for MockPackageFetcher {
    async fn fetch(&self, pkg: &PackageRef) -> WharfResult<FetchedPackage> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(WharfError::StoreFetch {
                package: pkg.key(),
                reason: "simulated fetch failure".to_string(),
            });
        }
        let files = vec![
            PackageFile::new(
                "package.yaml",
                format!("name: {}\nversion: {}\n", pkg.name, pkg.version),
            ),
            PackageFile::new("lib/main.txt", format!("contents of {}", pkg.key())),
        ];
        Ok(FetchedPackage {
            contents: FetchedContents::Unpacked(files),
            integrity: None,
        })
    }
}
