//! Error types for filter list profiles.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading or updating a profile.
///
/// None of these leave a profile half-updated: on error the previously
/// published rules stay in place.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to read filter list {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("download failed: {0}")]
    Transport(#[from] TransportError),

    #[error("invalid filter list: {0}")]
    InvalidList(String),

    #[error("failed to save filter list to {path:?}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("update cancelled")]
    Cancelled,

    #[error("task join error: {0}")]
    Join(#[source] tokio::task::JoinError),
}

impl From<tokio::task::JoinError> for ProfileError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            Self::Cancelled
        } else {
            Self::Join(err)
        }
    }
}

/// Errors reported by a [`Transport`](crate::Transport).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed for {url}: status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("timeout fetching {url}")]
    Timeout { url: String },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("failed to load public suffix list: {0}")]
    Psl(#[from] cb_core::psl::PslError),
}
