//! pixiv-dl: a polite bulk artwork downloader
//!
//! This crate enumerates an artist's works (or takes artwork IDs directly),
//! resolves per-artwork metadata and page lists from the site's AJAX API, and
//! downloads every original-resolution image into a
//! `{user}-{id}/{title}-{artwork}` directory tree, skipping files that already
//! exist and recording failures in a shared ledger.

pub mod api;
pub mod config;
pub mod download;
pub mod fetch;
pub mod ledger;
pub mod output;

use thiserror::Error;

/// Main error type for pixiv-dl operations
#[derive(Debug, Error)]
pub enum PixivError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Failed to write error file {path}: {source}")]
    ErrorFile {
        path: String,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No download directory configured and none could be discovered")]
    NoDownloadDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid ID in config: {0}")]
    InvalidId(String),

    #[error("phpsessid is empty or still the placeholder value; set it in the config file")]
    MissingSession,
}

/// Result type alias for pixiv-dl operations
pub type Result<T> = std::result::Result<T, PixivError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use download::{download_artwork, download_user, run, RunContext};
pub use ledger::Ledger;
