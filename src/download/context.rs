use crate::api::PixivApi;
use crate::config::{Config, FailureAttribution};
use crate::fetch::FetchClient;
use crate::ledger::Ledger;
use crate::output::ErrorJournal;
use crate::PixivError;
use std::path::PathBuf;

/// Download knobs every task reads
#[derive(Debug, Clone)]
pub struct DownloadSettings {
    /// Directory the `{user}-{id}` folders are created in
    pub root: PathBuf,

    /// Artwork pool size per user
    pub artwork_threads: usize,

    /// Image pool size per artwork
    pub img_threads: usize,

    /// Attempts per image
    pub max_attempts: u32,

    pub failure_attribution: FailureAttribution,
}

impl DownloadSettings {
    pub fn from_config(config: &Config, root: PathBuf) -> Self {
        Self {
            root,
            artwork_threads: config.download.artwork_threads,
            img_threads: config.download.img_threads,
            max_attempts: config.download.max_attempts,
            failure_attribution: config.download.failure_attribution,
        }
    }
}

/// Everything a run's tasks share
///
/// Built once at startup and handed to every task behind an `Arc`.
#[derive(Debug)]
pub struct RunContext {
    pub api: PixivApi,
    pub ledger: Ledger,
    pub journal: ErrorJournal,
    pub settings: DownloadSettings,
}

impl RunContext {
    pub fn new(api: PixivApi, settings: DownloadSettings, journal: ErrorJournal) -> Self {
        Self {
            api,
            ledger: Ledger::new(),
            journal,
            settings,
        }
    }

    /// Builds the fetch client, API and error journal described by `config`
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `root` - Resolved download root
    pub fn from_config(config: &Config, root: PathBuf) -> Result<Self, PixivError> {
        let client = FetchClient::from_config(config)?;
        let api = PixivApi::new(client, &config.network.base_url);
        let journal = ErrorJournal::new(config.output.error_file.clone());
        Ok(Self::new(
            api,
            DownloadSettings::from_config(config, root),
            journal,
        ))
    }
}

/// Context against `base_url` with a fast limiter, rooted at `dir/downloads`
#[cfg(test)]
pub(crate) fn test_context(base_url: &str, dir: &std::path::Path) -> RunContext {
    let config = crate::config::parse_config(&format!(
        r#"
[auth]
phpsessid = "test-session"

[network]
base-url = "{}"
min-requests-per-second = 1000.0
max-requests-per-second = 1000.0
backoff-base-ms = 10
"#,
        base_url
    ))
    .unwrap();
    let mut context = RunContext::from_config(&config, dir.join("downloads")).unwrap();
    context.journal = ErrorJournal::new(dir.join("error.json"));
    context
}
