//! Error types, version handling, and path helpers.

pub mod error;
pub mod path;
pub mod version;

pub use error::{WharfError, WharfResult};
