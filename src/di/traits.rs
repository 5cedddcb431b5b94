//! Trait definitions for dependency injection

use crate::resolver::graph::PackageRef;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::path::PathBuf;
use wharf_core::{Version, WharfResult};

/// Metadata for one published version of a package
#[derive(Debug, Clone)]
pub struct VersionMetadata {
    pub version: Version,
    /// Runtime dependencies (name -> range)
    pub dependencies: IndexMap<String, String>,
    /// Optional dependencies; resolution failures for these are tolerated
    pub optional_dependencies: IndexMap<String, String>,
    /// Peer dependency ranges, matched against the consumer's ancestor chain
    pub peer_dependencies: IndexMap<String, String>,
    /// Expected integrity of the package contents, when the source knows it
    pub integrity: Option<String>,
    /// Tarball location, when the package resolves to a direct archive
    pub tarball: Option<String>,
}

impl VersionMetadata {
    pub fn new(version: Version) -> Self {
        Self {
            version,
            dependencies: IndexMap::new(),
            optional_dependencies: IndexMap::new(),
            peer_dependencies: IndexMap::new(),
            integrity: None,
            tarball: None,
        }
    }
}

/// The metadata document for a package: every candidate version the
/// source knows about
#[derive(Debug, Clone)]
pub struct PackageMetadata {
    pub name: String,
    pub versions: Vec<VersionMetadata>,
}

impl PackageMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            versions: Vec::new(),
        }
    }

    /// Find the metadata for one exact version
    pub fn version(&self, version: &Version) -> Option<&VersionMetadata> {
        self.versions.iter().find(|v| &v.version == version)
    }

    /// The highest version satisfying a constraint, if any
    pub fn highest_matching(
        &self,
        constraint: &wharf_core::VersionConstraint,
    ) -> Option<&VersionMetadata> {
        self.versions
            .iter()
            .filter(|v| v.version.satisfies(constraint))
            .max_by(|a, b| a.version.cmp(&b.version))
    }
}

/// A single file inside a fetched package
#[derive(Debug, Clone)]
pub struct PackageFile {
    /// Path relative to the package root
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

impl PackageFile {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// What a fetcher hands back: either an already-unpacked file set or a
/// gzipped tarball for the store to unpack
#[derive(Debug, Clone)]
pub enum FetchedContents {
    Unpacked(Vec<PackageFile>),
    Archive(Vec<u8>),
}

/// A fetched package plus the integrity the transport reported, if any
#[derive(Debug, Clone)]
pub struct FetchedPackage {
    pub contents: FetchedContents,
    pub integrity: Option<String>,
}

/// Trait for package metadata lookup
///
/// Supplies the candidate versions for a package name. Retry policy lives
/// behind this trait; the resolver surfaces errors without retrying.
/// Implementations should be thread-safe (Send + Sync).
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Fetch the metadata document for a package
    async fn package_metadata(&self, name: &str) -> WharfResult<PackageMetadata>;
}

/// Trait for fetching resolved package contents
///
/// Consumed by the content store on cache misses. Timeouts and retries are
/// this collaborator's responsibility; the store reports a single terminal
/// failure upward.
#[async_trait]
pub trait PackageFetcher: Send + Sync {
    /// Fetch the contents of a resolved package
    async fn fetch(&self, pkg: &PackageRef) -> WharfResult<FetchedPackage>;
}
