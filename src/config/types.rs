use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Browser-like user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Main configuration structure for pixiv-dl
///
/// Constructed once at startup and shared read-only with every task.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub targets: TargetsConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Session credentials
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Value of the `PHPSESSID` cookie of a logged-in browser session
    pub phpsessid: String,
}

/// What to download
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetsConfig {
    /// Users whose complete works are downloaded
    #[serde(rename = "user-ids", default)]
    pub user_ids: Vec<String>,

    /// Individual artworks
    #[serde(rename = "artwork-ids", default)]
    pub artwork_ids: Vec<String>,
}

/// Which user a failed metadata lookup is charged to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureAttribution {
    /// The user the artwork was requested through, when there is one
    #[default]
    Requested,
    /// Always the `unknown` bucket, since no owner was resolved
    Unknown,
}

/// Download behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Root download directory; empty means the OS download directory
    pub path: String,

    /// Concurrent artworks per user
    #[serde(rename = "artwork-threads")]
    pub artwork_threads: usize,

    /// Concurrent images per artwork
    #[serde(rename = "img-threads")]
    pub img_threads: usize,

    /// Attempts per image before it is recorded as failed
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    #[serde(rename = "failure-attribution")]
    pub failure_attribution: FailureAttribution,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            artwork_threads: 2,
            img_threads: 3,
            max_attempts: 3,
            failure_attribution: FailureAttribution::default(),
        }
    }
}

/// HTTP client, rate limit and retry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Site root the AJAX endpoints hang off
    #[serde(rename = "base-url")]
    pub base_url: String,

    pub referer: String,

    #[serde(rename = "user-agent")]
    pub user_agent: String,

    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    #[serde(rename = "read-timeout-secs")]
    pub read_timeout_secs: u64,

    /// Lower bound of the request rate (sets the longest gap)
    #[serde(rename = "min-requests-per-second")]
    pub min_requests_per_second: f64,

    /// Upper bound of the request rate (sets the shortest gap)
    #[serde(rename = "max-requests-per-second")]
    pub max_requests_per_second: f64,

    /// Automatic retries on 429/5xx responses, after the first attempt
    #[serde(rename = "status-retries")]
    pub status_retries: u32,

    /// Base of the exponential backoff between automatic retries (milliseconds)
    #[serde(rename = "backoff-base-ms")]
    pub backoff_base_ms: u64,

    /// Pause after a 429 that carries no Retry-After header (milliseconds)
    #[serde(rename = "rate-limited-fallback-ms")]
    pub rate_limited_fallback_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.pixiv.net".to_string(),
            referer: "https://www.pixiv.net/".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout_secs: 5,
            read_timeout_secs: 5,
            min_requests_per_second: 1.0,
            max_requests_per_second: 2.0,
            status_retries: 3,
            backoff_base_ms: 1000,
            rate_limited_fallback_ms: 1000,
        }
    }
}

impl NetworkConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path of the JSON error sidecar file
    #[serde(rename = "error-file")]
    pub error_file: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            error_file: PathBuf::from("error.json"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log at debug level unless the command line says otherwise
    pub debug: bool,

    /// Also append logs to this file
    pub file: Option<PathBuf>,
}
