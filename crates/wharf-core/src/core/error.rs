use std::path::PathBuf;
use thiserror::Error;

pub type WharfResult<T> = Result<T, WharfError>;

#[derive(Error, Debug)]
pub enum WharfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Path error: {0}")]
    Path(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Package error: {0}")]
    Package(String),

    #[error("Version error: {0}")]
    Version(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Lockfile error: {0}")]
    Lockfile(String),

    /// The lockfile on disk was written by an incompatible (different major)
    /// format version and cannot be interpreted.
    #[error("Lockfile at {path} was generated by an incompatible version of wharf")]
    LockfileBreakingChange { path: PathBuf },

    /// The caller requested that the lockfile must not change, but
    /// reconciliation produced differences.
    #[error(
        "Cannot proceed with a frozen lockfile: \
         {added} package(s) would be added, {removed} removed, {changed} changed"
    )]
    FrozenLockfile {
        added: usize,
        removed: usize,
        changed: usize,
    },

    /// No candidate version satisfies the requested range.
    #[error("No version of '{package}' satisfies '{range}' (required via {importer})")]
    Resolution {
        importer: String,
        package: String,
        range: String,
    },

    /// Two alias specifiers map the same visible name to different packages.
    #[error("Alias '{alias}' refers to both '{first}' and '{second}'")]
    AliasConflict {
        alias: String,
        first: String,
        second: String,
    },

    /// Fetching or verifying a package for the content store failed.
    #[error("Failed to fetch '{package}' into the store: {reason}")]
    StoreFetch { package: String, reason: String },

    /// One or more link-site operations failed. Linking of unrelated
    /// subtrees completed before this was raised.
    #[error("{failed} of {total} link operation(s) failed:\n{details}")]
    Link {
        failed: usize,
        total: usize,
        details: String,
    },
}
