//! Single image download
//!
//! One URL to one file: skip if the file exists, otherwise retry the fetch up
//! to the configured number of attempts, and file an error record (plus a
//! fresh `error.json` snapshot) when every attempt failed.

use crate::download::path::{sanitize_path, with_image_extension};
use crate::download::RunContext;
use crate::fetch::FetchError;
use crate::ledger::ErrorRecord;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One image to fetch, with the artwork context its bookkeeping needs
#[derive(Debug, Clone)]
pub struct ImageJob {
    pub url: String,

    /// Destination without extension
    pub save_path: PathBuf,

    pub user_id: String,
    pub user_name: String,
    pub title: String,
    pub artwork_id: String,
}

/// How an image task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    Downloaded(PathBuf),
    AlreadyExists(PathBuf),
    /// Every attempt failed; an error record was filed
    Failed(PathBuf),
}

/// Errors that abort an image task instead of being retried
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
enum AttemptError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Image(#[from] ImageError),
}

/// Downloads one image into `job.save_path` plus the URL's extension
///
/// Fetch failures are retried up to `max_attempts` times in total; the fetch
/// client's own status retries and backoff happen inside each attempt. A
/// filesystem write error ends the task with `Err` so the owning artwork task
/// can record it.
pub async fn download_image(ctx: &RunContext, job: ImageJob) -> Result<ImageOutcome, ImageError> {
    let save_path = sanitize_path(&job.save_path);
    let final_path = sanitize_path(&with_image_extension(&save_path, &job.url));

    if tokio::fs::try_exists(&final_path).await.unwrap_or(false) {
        ctx.ledger.record_existing_image(&job.user_id, &final_path);
        tracing::debug!("File exists, skipping: {}", final_path.display());
        return Ok(ImageOutcome::AlreadyExists(final_path));
    }

    let max_attempts = ctx.settings.max_attempts;
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        tracing::debug!("Downloading {} to {}", job.url, final_path.display());

        match fetch_and_write(ctx, &job.url, &final_path).await {
            Ok(bytes) => {
                ctx.ledger.record_image_success(&job.user_id);
                tracing::debug!("Saved {} ({} bytes)", final_path.display(), bytes);
                return Ok(ImageOutcome::Downloaded(final_path));
            }
            Err(AttemptError::Fetch(e)) => {
                tracing::warn!(
                    "Download failed, attempt {}/{}: {}: {}",
                    attempt,
                    max_attempts,
                    job.url,
                    e
                );
                last_error = e.to_string();
            }
            Err(AttemptError::Image(e)) => return Err(e),
        }
    }

    let record = ErrorRecord {
        url: job.url.clone(),
        final_save_path: final_path.display().to_string(),
        reason: last_error,
    };
    let key = ctx.ledger.record_image_failure(
        &job.user_id,
        &job.user_name,
        &job.title,
        &job.artwork_id,
        record,
    );
    tracing::error!(
        "Giving up on {} after {} attempts ({})",
        final_path.display(),
        max_attempts,
        key
    );

    if let Err(e) = ctx.journal.persist(&ctx.ledger).await {
        tracing::error!("Could not record error to {}: {}", ctx.journal.path().display(), e);
    }

    Ok(ImageOutcome::Failed(final_path))
}

async fn fetch_and_write(ctx: &RunContext, url: &str, path: &Path) -> Result<usize, AttemptError> {
    let bytes = ctx.api.client().get_bytes(url).await?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| write_error(parent, source))?;
    }

    if let Err(source) = tokio::fs::write(path, &bytes).await {
        // Existing files count as complete, so no partial file may remain
        let _ = tokio::fs::remove_file(path).await;
        return Err(write_error(path, source).into());
    }

    Ok(bytes.len())
}

fn write_error(path: &Path, source: std::io::Error) -> ImageError {
    ImageError::Write {
        path: path.display().to_string(),
        source,
    }
}
