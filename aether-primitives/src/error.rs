//! Shared error definitions for kernel primitives.

use thiserror::Error;

/// Result alias used throughout the kernel primitives.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing primitive types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Tool manifest failed validation.
    #[error("invalid tool manifest: {reason}")]
    InvalidManifest {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Capability tag was not recognised.
    #[error("unknown capability `{tag}`")]
    UnknownCapability {
        /// The offending tag.
        tag: String,
    },
}
