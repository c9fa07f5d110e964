//! pixiv-dl main entry point
//!
//! This is the command-line interface for the pixiv-dl bulk downloader.

use anyhow::Context;
use clap::Parser;
use pixiv_dl::config::{
    load_config_with_hash, parse_id_list, resolve_download_root, validate_targets,
    write_default_config, Config,
};
use pixiv_dl::output::print_summary;
use pixiv_dl::{run, PixivError, RunContext};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// How long the final error stays on screen before exiting
const ERROR_PAUSE: Duration = Duration::from_secs(5);

/// Exit status after Ctrl-C
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// pixiv-dl: a polite bulk artwork downloader
///
/// Downloads every original-resolution image of the configured users and
/// artworks into `{user}-{id}/{title}-{artwork}` folders. Files already on
/// disk are skipped, so an interrupted run can simply be started again.
#[derive(Parser, Debug)]
#[command(name = "pixiv-dl")]
#[command(version = "1.0.0")]
#[command(about = "A polite bulk artwork downloader", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (created with defaults if missing)
    #[arg(value_name = "CONFIG", default_value = "pdi.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// User IDs to download instead of the configured ones ("1|2 3")
    #[arg(long, value_name = "IDS")]
    user: Option<String>,

    /// Artwork IDs to download instead of the configured ones ("1|2 3")
    #[arg(long, value_name = "IDS")]
    artwork: Option<String>,

    /// Validate config and show what would be downloaded without downloading
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run_cli(cli).await {
        tracing::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        tokio::time::sleep(ERROR_PAUSE).await;
        std::process::exit(1);
    }
}

async fn run_cli(cli: Cli) -> anyhow::Result<()> {
    if !cli.config.exists() {
        write_default_config(&cli.config).with_context(|| {
            format!("failed to create config file {}", cli.config.display())
        })?;
        println!(
            "Created default configuration at {}. Fill in phpsessid and targets, then run again.",
            cli.config.display()
        );
        return Ok(());
    }

    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration {}", cli.config.display()))?;

    // The guard flushes the log file on drop, so it lives until the end of the run
    let _log_guard = setup_logging(
        cli.verbose,
        cli.quiet,
        config.logging.debug,
        config.logging.file.as_deref(),
    )?;
    tracing::info!(
        "Configuration loaded from {} (hash: {})",
        cli.config.display(),
        config_hash
    );

    if let Some(ids) = &cli.user {
        config.targets.user_ids = parse_id_list(ids);
    }
    if let Some(ids) = &cli.artwork {
        config.targets.artwork_ids = parse_id_list(ids);
    }
    validate_targets(&config.targets).map_err(PixivError::from)?;

    let root = resolve_download_root(&config.download.path).ok_or(PixivError::NoDownloadDir)?;

    if cli.dry_run {
        handle_dry_run(&config, &root);
        return Ok(());
    }

    handle_download(config, root).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// When `file` is set, everything is also appended to that file without
/// colors. The returned guard must be kept alive for the file to be flushed.
fn setup_logging(
    verbose: u8,
    quiet: bool,
    debug: bool,
    file: Option<&Path>,
) -> anyhow::Result<Option<WorkerGuard>> {
    let directives = if quiet {
        "error"
    } else {
        match (verbose, debug) {
            (0, false) => "pixiv_dl=info,warn",
            (0, true) | (1, _) => "pixiv_dl=debug,info",
            (2, _) => "pixiv_dl=trace,debug",
            _ => "trace",
        }
    };

    let console = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    let (file_layer, guard) = match file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("log file {} has no file name", path.display()))?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(directives))
        .with(console)
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Handles the --dry-run mode: validates config and shows what would be downloaded
fn handle_dry_run(config: &Config, root: &Path) {
    println!("=== pixiv-dl Dry Run ===\n");

    println!("Download:");
    println!("  Root: {}", root.display());
    println!("  Artwork threads per user: {}", config.download.artwork_threads);
    println!("  Image threads per artwork: {}", config.download.img_threads);
    println!("  Attempts per image: {}", config.download.max_attempts);

    println!("\nNetwork:");
    println!("  Base URL: {}", config.network.base_url);
    println!(
        "  Request rate: {}-{} per second",
        config.network.min_requests_per_second, config.network.max_requests_per_second
    );
    println!(
        "  Timeouts: {}s connect, {}s read",
        config.network.connect_timeout_secs, config.network.read_timeout_secs
    );
    println!("  Status retries: {}", config.network.status_retries);

    println!("\nOutput:");
    println!("  Error file: {}", config.output.error_file.display());

    println!("\nUsers ({}):", config.targets.user_ids.len());
    for user_id in &config.targets.user_ids {
        println!("  - {}", user_id);
    }

    println!("\nArtworks ({}):", config.targets.artwork_ids.len());
    for artwork_id in &config.targets.artwork_ids {
        println!("  - {}", artwork_id);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main download operation
async fn handle_download(config: Config, root: PathBuf) -> anyhow::Result<()> {
    tracing::info!(
        "Users: {}, artworks: {}, download root: {}",
        config.targets.user_ids.len(),
        config.targets.artwork_ids.len(),
        root.display()
    );

    let ctx = Arc::new(RunContext::from_config(&config, root)?);
    let users = config.targets.user_ids;
    let artworks = config.targets.artwork_ids;

    tokio::select! {
        result = run(Arc::clone(&ctx), &users, &artworks) => {
            let summary = result?;
            print_summary(&summary);
            tracing::info!("Download completed");
            Ok(())
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, stopping");
            if let Err(e) = ctx.journal.persist(&ctx.ledger).await {
                tracing::error!("Could not write error file: {}", e);
            }
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    }
}
