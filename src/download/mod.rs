//! Download tasks
//!
//! A run walks the configured users one at a time. Each user's artworks go
//! through a pool of artwork tasks, and each artwork's images through a
//! nested pool of image tasks. Every task records its own outcome in the
//! shared [`Ledger`](crate::ledger::Ledger); nothing propagates upward.

mod artwork;
mod context;
mod image;
mod path;
mod pool;
mod user;

pub use artwork::{download_artwork, ArtworkError, ArtworkOutcome};
pub use context::{DownloadSettings, RunContext};
pub use image::{download_image, ImageError, ImageJob, ImageOutcome};
pub use path::{
    artwork_folder, image_extension, image_stem, sanitize_component, sanitize_path,
    with_image_extension, ILLEGAL_CHARS,
};
pub use pool::WorkerPool;
pub use user::download_user;

use crate::output::RunSummary;
use crate::PixivError;
use chrono::Utc;
use std::sync::Arc;

/// Runs every user download, then every direct artwork download
///
/// Writes the final error file once all tasks have drained.
///
/// # Arguments
///
/// * `ctx` - Shared run context
/// * `user_ids` - Users whose whole portfolio is downloaded, in order
/// * `artwork_ids` - Individual artworks, processed after the users
///
/// # Returns
///
/// The summary of the run, or an error if the final error file could not be
/// written.
pub async fn run(
    ctx: Arc<RunContext>,
    user_ids: &[String],
    artwork_ids: &[String],
) -> Result<RunSummary, PixivError> {
    let started_at = Utc::now();

    if user_ids.is_empty() && artwork_ids.is_empty() {
        tracing::warn!("No user or artwork IDs configured, nothing to download");
    }

    for (index, user_id) in user_ids.iter().enumerate() {
        tracing::info!(
            "Downloading user {} ({}/{})",
            user_id,
            index + 1,
            user_ids.len()
        );
        download_user(Arc::clone(&ctx), user_id.clone()).await;
    }

    for artwork_id in artwork_ids {
        tracing::info!("Downloading artwork {}", artwork_id);
        download_artwork(Arc::clone(&ctx), artwork_id.clone(), None).await;
    }

    let summary = RunSummary::from_ledger(&ctx.ledger, started_at);
    ctx.journal.persist(&ctx.ledger).await?;
    tracing::info!("Error file written to {}", ctx.journal.path().display());

    Ok(summary)
}
