//! Artwork download task
//!
//! Resolves one artwork's owner, title and pages, creates its folder, and
//! fans the images out over a bounded pool. Every failure inside the task is
//! caught at its boundary and turned into ledger entries; the caller never
//! sees an error.

use crate::config::FailureAttribution;
use crate::download::image::{download_image, ImageError, ImageJob, ImageOutcome};
use crate::download::path::{artwork_folder, image_stem};
use crate::download::pool::WorkerPool;
use crate::download::RunContext;
use crate::ledger::{error_trace, ArtworkFailure, Outcome, UNKNOWN_USER};
use rand::Rng;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinError;

/// Pause before each image submission, in milliseconds
const SUBMIT_JITTER_MS: RangeInclusive<u64> = 10..=200;

/// How an artwork task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtworkOutcome {
    /// Folder created and every image task ran to an outcome
    Completed {
        downloaded: usize,
        existing: usize,
        failed: usize,
    },
    /// Owner or title could not be resolved; nothing was attempted
    MetadataUnavailable,
    /// The task failed at its boundary; details are in the error dictionary
    Failed,
}

/// Failures caught at the artwork task boundary
#[derive(Debug, Error)]
pub enum ArtworkError {
    #[error("failed to create folder {path}: {source}")]
    CreateFolder {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("image task failed: {0}")]
    Image(#[from] ImageError),

    #[error("image task panicked: {0}")]
    Panicked(String),

    #[error("image task was cancelled")]
    Cancelled,
}

impl ArtworkError {
    /// Short name of the failure kind, stored in the error dictionary
    pub fn kind(&self) -> &'static str {
        match self {
            ArtworkError::CreateFolder { .. } => "CreateFolder",
            ArtworkError::Image(ImageError::Write { .. }) => "ImageWrite",
            ArtworkError::Panicked(_) => "Panicked",
            ArtworkError::Cancelled => "Cancelled",
        }
    }
}

impl From<JoinError> for ArtworkError {
    fn from(error: JoinError) -> Self {
        if !error.is_panic() {
            return ArtworkError::Cancelled;
        }
        let payload = error.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        ArtworkError::Panicked(message)
    }
}

/// What is known about the artwork so far, for failure attribution
#[derive(Debug, Default)]
struct Progress {
    user_id: Option<String>,
    user_name: Option<String>,
    title: Option<String>,
}

/// Downloads every image of one artwork
///
/// # Arguments
///
/// * `ctx` - Shared run context
/// * `artwork_id` - Artwork to download
/// * `requested_user` - User the artwork was reached through, if any. Only
///   used to attribute a failed metadata lookup; the owner is always
///   re-resolved.
///
/// # Returns
///
/// The outcome; failures are already recorded in the ledger.
pub async fn download_artwork(
    ctx: Arc<RunContext>,
    artwork_id: String,
    requested_user: Option<String>,
) -> ArtworkOutcome {
    let mut progress = Progress {
        user_id: requested_user.clone(),
        ..Progress::default()
    };

    match run_artwork(&ctx, &artwork_id, requested_user.as_deref(), &mut progress).await {
        Ok(outcome) => outcome,
        Err(e) => {
            let user_id = progress.user_id.as_deref().unwrap_or(UNKNOWN_USER);
            let user_label = progress.user_name.as_deref().unwrap_or(user_id);
            let title = progress.title.clone().unwrap_or_else(|| UNKNOWN_USER.to_string());

            tracing::error!("Error downloading artwork {}: {}", artwork_id, e);
            let trace = error_trace(&e);
            tracing::debug!("Error chain:\n{}", trace);

            let key = ctx.ledger.record_artwork_failure(
                user_id,
                user_label,
                ArtworkFailure {
                    message: e.to_string(),
                    kind: e.kind().to_string(),
                    trace,
                    artwork_id: artwork_id.clone(),
                    title,
                },
            );
            tracing::error!("Recorded artwork failure {} for user {}", key, user_label);
            ArtworkOutcome::Failed
        }
    }
}

async fn run_artwork(
    ctx: &Arc<RunContext>,
    artwork_id: &str,
    requested_user: Option<&str>,
    progress: &mut Progress,
) -> Result<ArtworkOutcome, ArtworkError> {
    let Some(meta) = ctx.api.fetch_artwork_info(artwork_id).await else {
        let user_id = match ctx.settings.failure_attribution {
            FailureAttribution::Requested => requested_user.unwrap_or(UNKNOWN_USER),
            FailureAttribution::Unknown => UNKNOWN_USER,
        };
        ctx.ledger.record_artwork(user_id, Outcome::DownloadFailed);
        tracing::warn!("Could not resolve artwork {}, skipping it", artwork_id);
        return Ok(ArtworkOutcome::MetadataUnavailable);
    };

    progress.user_id = Some(meta.user_id.clone());
    progress.user_name = Some(meta.user_name.clone());
    progress.title = Some(meta.title.clone());

    let folder = artwork_folder(
        &ctx.settings.root,
        &meta.user_name,
        &meta.user_id,
        &meta.title,
        artwork_id,
    );
    tracing::debug!("Download folder: {}", folder.display());
    tokio::fs::create_dir_all(&folder)
        .await
        .map_err(|source| ArtworkError::CreateFolder {
            path: folder.display().to_string(),
            source,
        })?;

    let urls = ctx.api.fetch_image_urls(artwork_id).await;

    let mut pool = WorkerPool::new(ctx.settings.img_threads);
    for (index, url) in urls.into_iter().enumerate() {
        let job = ImageJob {
            url,
            save_path: folder.join(image_stem(&meta.title, artwork_id, index + 1)),
            user_id: meta.user_id.clone(),
            user_name: meta.user_name.clone(),
            title: meta.title.clone(),
            artwork_id: artwork_id.to_string(),
        };

        let jitter = Duration::from_millis(rand::rng().random_range(SUBMIT_JITTER_MS));
        tokio::time::sleep(jitter).await;

        let ctx = Arc::clone(ctx);
        pool.spawn(async move { download_image(&ctx, job).await });
    }

    let (mut downloaded, mut existing, mut failed) = (0, 0, 0);
    let mut first_error: Option<ArtworkError> = None;
    for result in pool.drain().await {
        match result {
            Ok(Ok(ImageOutcome::Downloaded(_))) => downloaded += 1,
            Ok(Ok(ImageOutcome::AlreadyExists(_))) => existing += 1,
            Ok(Ok(ImageOutcome::Failed(_))) => failed += 1,
            Ok(Err(e)) => {
                first_error.get_or_insert(e.into());
            }
            Err(e) => {
                first_error.get_or_insert(e.into());
            }
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }

    ctx.ledger.record_artwork(&meta.user_id, Outcome::Success);
    tracing::info!(
        "Artwork {} done: {} downloaded, {} already present, {} failed",
        artwork_id,
        downloaded,
        existing,
        failed
    );

    Ok(ArtworkOutcome::Completed {
        downloaded,
        existing,
        failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_join_error_panic_message() {
        let handle = tokio::spawn(async {
            panic!("disk on fire");
        });
        let error: ArtworkError = handle.await.unwrap_err().into();

        assert_eq!(error.kind(), "Panicked");
        assert!(error.to_string().contains("disk on fire"));
    }

    #[test]
    fn test_error_kind_names() {
        let error = ArtworkError::CreateFolder {
            path: "/dl/x".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(error.kind(), "CreateFolder");
        assert!(error_trace(&error).contains("caused by: denied"));
    }
}
