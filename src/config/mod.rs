//! Configuration module for pixiv-dl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use pixiv_dl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("pdi.toml")).unwrap();
//! println!("Users to download: {:?}", config.targets.user_ids);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AuthConfig, Config, DownloadConfig, FailureAttribution, LoggingConfig, NetworkConfig,
    OutputConfig, TargetsConfig, DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, parse_config, parse_id_list,
    resolve_download_root, write_default_config,
};
pub use validation::validate_targets;
