//! End-of-run summary
//!
//! This module turns the ledger into a [`RunSummary`] once every pool has
//! drained, and logs it in human-readable form.

use crate::ledger::{ErrorDict, Ledger, Outcome, SkippedStats, Tally, UserStats};
use chrono::{DateTime, Utc};

/// Snapshot of a finished run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub users: UserStats,
    pub skipped: SkippedStats,
}

impl RunSummary {
    /// Takes a snapshot of `ledger`, stamping now as the finish time
    pub fn from_ledger(ledger: &Ledger, started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: Utc::now(),
            users: ledger.user_stats(),
            skipped: ledger.skipped_stats(),
        }
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }

    pub fn tally(&self, outcome: Outcome, user_id: &str) -> Tally {
        self.users.tally(outcome, user_id)
    }

    pub fn errors(&self) -> &ErrorDict {
        &self.skipped.error_dict
    }

    /// Whether anything ended up in the failure tables
    pub fn has_failures(&self) -> bool {
        !self.users.download_failed.is_empty() || !self.skipped.download_failed.is_empty()
    }
}

/// Logs the summary: per-user outcomes, failed paths, skipped total
pub fn print_summary(summary: &RunSummary) {
    tracing::info!("=== Download Summary ===");

    for (user_id, tally) in &summary.users.success {
        tracing::info!(
            "User {}: downloaded {} artworks, {} images",
            user_id,
            tally.artworks,
            tally.images
        );
    }

    for (user_id, tally) in &summary.users.download_failed {
        tracing::info!(
            "User {}: {} artworks failed, {} images failed",
            user_id,
            tally.artworks,
            tally.images
        );
    }

    for (user_id, tally) in &summary.users.file_exists {
        tracing::info!(
            "User {}: {} images already on disk",
            user_id,
            tally.images
        );
    }

    for (path, count) in &summary.skipped.download_failed {
        tracing::info!("File {} failed to download ({} times)", path, count);
    }

    tracing::info!(
        "Skipped {} images in total; finished in {}s",
        summary.skipped.skipped_images_count,
        summary.duration_seconds()
    );
}
