//! Typed errors for a delivery attempt.
//!
//! Every variant ends the attempt for that message; none of them is retried.

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The HTTP client itself could not be set up.
    #[error("Failed to initialise HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The fallback directory is unusable.
    #[error("Fallback storage unavailable: {0}")]
    Fallback(#[from] FallbackError),

    /// The message could not be encoded as JSON.
    #[error("Failed to serialise message: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The request could not be assembled (malformed URL, bad header, ...).
    #[error("Failed to build request for {url}: {source}")]
    Build {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The request was built but sending it failed (connect, timeout, ...).
    #[error("Failed to send request to {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl DeliveryError {
    /// Returns `true` if this failure should be persisted by the fallback writer.
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        matches!(self, Self::Build { .. } | Self::Transport { .. })
    }
}

/// Errors writing a fallback artifact
#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Fallback directory {0} does not exist or is not a directory")]
    NotADirectory(PathBuf),
}
