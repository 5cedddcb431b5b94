//! Registry client: package metadata lookups and tarball downloads.

use crate::di::{FetchedContents, FetchedPackage, MetadataSource, PackageFetcher, VersionMetadata};
use crate::resolver::graph::{PackageRef, ResolutionKind};
use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::Mutex;
use wharf_core::{Version, WharfError, WharfResult};

use crate::di::PackageMetadata;

/// The registry metadata document for one package
#[derive(Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    name: String,
    #[serde(default)]
    versions: IndexMap<String, RegistryVersion>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryVersion {
    #[serde(default)]
    dependencies: IndexMap<String, String>,
    #[serde(default)]
    optional_dependencies: IndexMap<String, String>,
    #[serde(default)]
    peer_dependencies: IndexMap<String, String>,
    #[serde(default)]
    dist: RegistryDist,
}

#[derive(Deserialize, Default)]
struct RegistryDist {
    #[serde(default)]
    integrity: Option<String>,
    #[serde(default)]
    tarball: Option<String>,
}

/// Client for a package registry.
///
/// Metadata documents are cached for the lifetime of the client, so a
/// resolve pass followed by fetches hits the network once per package name.
pub struct RegistryClient {
    client: Client,
    base_url: String,
    metadata_cache: Mutex<HashMap<String, PackageMetadata>>,
}

impl RegistryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            metadata_cache: Mutex::new(HashMap::new()),
        }
    }

    fn metadata_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }

    /// The conventional tarball location, used when the metadata document
    /// does not carry an explicit one.
    fn default_tarball_url(&self, name: &str, version: &Version) -> String {
        let basename = name.rsplit('/').next().unwrap_or(name);
        format!("{}/{}/-/{}-{}.tgz", self.base_url, name, basename, version)
    }

    async fn fetch_metadata(&self, name: &str) -> WharfResult<PackageMetadata> {
        let url = self.metadata_url(name);
        tracing::debug!(url = %url, "fetching registry metadata");
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(WharfError::Http(response.error_for_status().unwrap_err()));
        }

        let doc: RegistryDocument = response
            .json()
            .await
            .map_err(|e| WharfError::Package(format!("Invalid metadata for {}: {}", name, e)))?;

        let mut versions = Vec::with_capacity(doc.versions.len());
        for (version_str, raw) in doc.versions {
            let version = match Version::parse(&version_str) {
                Ok(version) => version,
                // Registries carry the occasional unparseable legacy version
                Err(_) => {
                    tracing::debug!(package = name, version = %version_str, "skipping unparseable version");
                    continue;
                }
            };
            versions.push(VersionMetadata {
                version,
                dependencies: raw.dependencies,
                optional_dependencies: raw.optional_dependencies,
                peer_dependencies: raw.peer_dependencies,
                integrity: raw.dist.integrity,
                tarball: raw.dist.tarball,
            });
        }

        let name = if doc.name.is_empty() {
            name.to_string()
        } else {
            doc.name
        };
        Ok(PackageMetadata { name, versions })
    }
}

#[async_trait]
impl MetadataSource for RegistryClient {
    async fn package_metadata(&self, name: &str) -> WharfResult<PackageMetadata> {
        {
            let cache = self.metadata_cache.lock().await;
            if let Some(metadata) = cache.get(name) {
                return Ok(metadata.clone());
            }
        }

        let metadata = self.fetch_metadata(name).await?;

        let mut cache = self.metadata_cache.lock().await;
        cache.insert(name.to_string(), metadata.clone());
        Ok(metadata)
    }
}

#[async_trait]
impl PackageFetcher for RegistryClient {
    async fn fetch(&self, pkg: &PackageRef) -> WharfResult<FetchedPackage> {
        let (url, integrity) = match &pkg.kind {
            ResolutionKind::Tarball { url } => (url.clone(), None),
            _ => {
                let metadata = self.package_metadata(&pkg.name).await?;
                let meta = metadata.version(&pkg.version);
                let url = meta
                    .and_then(|m| m.tarball.clone())
                    .unwrap_or_else(|| self.default_tarball_url(&pkg.name, &pkg.version));
                (url, meta.and_then(|m| m.integrity.clone()))
            }
        };

        tracing::debug!(package = %pkg, url = %url, "downloading tarball");
        let response = self.client.get(&url).send().await.map_err(|e| {
            WharfError::StoreFetch {
                package: pkg.key(),
                reason: e.to_string(),
            }
        })?;

        if !response.status().is_success() {
            return Err(WharfError::StoreFetch {
                package: pkg.key(),
                reason: format!("registry returned {} for {}", response.status(), url),
            });
        }

        let bytes = response.bytes().await.map_err(|e| WharfError::StoreFetch {
            package: pkg.key(),
            reason: e.to_string(),
        })?;

        Ok(FetchedPackage {
            contents: FetchedContents::Archive(bytes.to_vec()),
            integrity,
        })
    }
}
