use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Commented template written when no configuration file exists yet
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# pixiv-dl configuration
#
# Fill in phpsessid, list the users and/or artworks to fetch, then run again.

[auth]
# PHPSESSID cookie of a logged-in browser session (required)
phpsessid = "PHPSESSID"

[targets]
# Users whose complete works are downloaded
user-ids = []
# Individual artworks
artwork-ids = []

[download]
# Root download directory; leave empty to use the system download folder
path = ""
artwork-threads = 2
img-threads = 3
max-attempts = 3

[output]
error-file = "error.json"

[logging]
debug = false
"#;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use pixiv_dl::config::load_config;
///
/// let config = load_config(Path::new("pdi.toml")).unwrap();
/// println!("Image threads: {}", config.download.img_threads);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so a run can be tied back to the configuration that
/// drove it.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Writes the commented default configuration to `path`
///
/// Parent directories are created as needed. An existing file is never
/// overwritten.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Err(ConfigError::Validation(format!(
            "refusing to overwrite existing config file {}",
            path.display()
        )));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)?;
    Ok(())
}

/// Splits a loosely formatted ID list into IDs
///
/// Items may be separated by `|`, whitespace, or both; blank items are dropped.
///
/// ```
/// use pixiv_dl::config::parse_id_list;
///
/// assert_eq!(parse_id_list(" 1 | 2 3|"), vec!["1", "2", "3"]);
/// ```
pub fn parse_id_list(input: &str) -> Vec<String> {
    input
        .split('|')
        .flat_map(str::split_whitespace)
        .map(str::to_string)
        .collect()
}

/// Resolves the root directory downloads are written under
///
/// A configured path wins; otherwise the platform download directory is used.
pub fn resolve_download_root(configured: &str) -> Option<PathBuf> {
    let configured = configured.trim();
    if !configured.is_empty() {
        return Some(PathBuf::from(configured));
    }
    dirs::download_dir()
}
