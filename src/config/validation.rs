use crate::config::types::{AuthConfig, Config, DownloadConfig, NetworkConfig, TargetsConfig};
use crate::ConfigError;
use url::Url;

/// Placeholder written into freshly generated config files
pub(crate) const SESSION_PLACEHOLDER: &str = "PHPSESSID";

const MAX_THREADS: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_auth_config(&config.auth)?;
    validate_targets(&config.targets)?;
    validate_download_config(&config.download)?;
    validate_network_config(&config.network)?;
    Ok(())
}

fn validate_auth_config(config: &AuthConfig) -> Result<(), ConfigError> {
    let session = config.phpsessid.trim();
    if session.is_empty() || session == SESSION_PLACEHOLDER {
        return Err(ConfigError::MissingSession);
    }
    Ok(())
}

/// Validates configured user and artwork IDs
pub fn validate_targets(targets: &TargetsConfig) -> Result<(), ConfigError> {
    for id in targets.user_ids.iter().chain(&targets.artwork_ids) {
        validate_id(id)?;
    }
    Ok(())
}

/// IDs are decimal numbers on the wire, kept as strings
fn validate_id(id: &str) -> Result<(), ConfigError> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConfigError::InvalidId(format!(
            "'{}' is not a numeric ID",
            id
        )));
    }
    Ok(())
}

fn validate_download_config(config: &DownloadConfig) -> Result<(), ConfigError> {
    if config.artwork_threads < 1 || config.artwork_threads > MAX_THREADS {
        return Err(ConfigError::Validation(format!(
            "artwork-threads must be between 1 and {}, got {}",
            MAX_THREADS, config.artwork_threads
        )));
    }

    if config.img_threads < 1 || config.img_threads > MAX_THREADS {
        return Err(ConfigError::Validation(format!(
            "img-threads must be between 1 and {}, got {}",
            MAX_THREADS, config.img_threads
        )));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(
            "max-attempts must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_network_config(config: &NetworkConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    let (min, max) = (
        config.min_requests_per_second,
        config.max_requests_per_second,
    );
    if !(min > 0.0 && max > 0.0) {
        return Err(ConfigError::Validation(format!(
            "request rates must be positive, got {} and {}",
            min, max
        )));
    }
    if min > max {
        return Err(ConfigError::Validation(format!(
            "min-requests-per-second ({}) exceeds max-requests-per-second ({})",
            min, max
        )));
    }

    if config.connect_timeout_secs == 0 || config.read_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeouts must be at least one second".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}
