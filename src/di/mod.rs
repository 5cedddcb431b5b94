//! Dependency injection infrastructure.
//!
//! The resolver and store consume their collaborators (metadata source,
//! package fetcher) through the traits defined here, so production registry
//! clients and in-memory test doubles are interchangeable.

pub mod mocks;
pub mod traits;

pub use traits::{
    FetchedContents, FetchedPackage, MetadataSource, PackageFetcher, PackageFile, PackageMetadata,
    VersionMetadata,
};
