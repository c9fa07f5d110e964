use crate::download::artwork::{download_artwork, ArtworkOutcome};
use crate::download::pool::WorkerPool;
use crate::download::RunContext;
use crate::ledger::Outcome;
use std::sync::Arc;

/// Downloads every artwork of one user
///
/// Artwork tasks run on a pool of `artwork_threads` workers and the call
/// returns once all of them have finished.
///
/// # Returns
///
/// The number of artworks that were submitted.
pub async fn download_user(ctx: Arc<RunContext>, user_id: String) -> usize {
    let artwork_ids = ctx.api.fetch_user_artworks(&user_id).await;
    if artwork_ids.is_empty() {
        tracing::warn!("User {} has no artworks to download", user_id);
        return 0;
    }

    let total = artwork_ids.len();
    tracing::info!("User {}: {} artworks queued", user_id, total);

    let mut pool = WorkerPool::new(ctx.settings.artwork_threads);
    for artwork_id in artwork_ids {
        let ctx = Arc::clone(&ctx);
        let requested = Some(user_id.clone());
        pool.spawn(download_artwork(ctx, artwork_id, requested));
    }

    let mut failed = 0;
    for result in pool.drain().await {
        match result {
            Ok(ArtworkOutcome::Completed { .. }) => {}
            Ok(ArtworkOutcome::MetadataUnavailable | ArtworkOutcome::Failed) => failed += 1,
            Err(e) => {
                failed += 1;
                ctx.ledger.record_artwork(&user_id, Outcome::DownloadFailed);
                tracing::error!("Artwork task for user {} did not finish: {}", user_id, e);
            }
        }
    }

    tracing::info!(
        "User {} finished: {} of {} artworks completed",
        user_id,
        total - failed,
        total
    );
    total
}
