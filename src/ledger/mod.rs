//! Run-wide success/failure/skip ledger
//!
//! The ledger is shared by every task of a run. The raw tables are never
//! handed out for mutation: callers record outcomes through the methods
//! below, each of which takes the lock of the one table it touches, and read
//! back cloned snapshots.

mod errors;
mod stats;

pub use errors::{error_trace, ArtworkFailure, ErrorDict, ErrorEntry, ErrorRecord};
pub use stats::{Outcome, SkippedStats, Tally, UserStats};

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Key used when no user ID is known
pub const UNKNOWN_USER: &str = "unknown";

/// Synchronized counters and error records of one run
#[derive(Debug, Default)]
pub struct Ledger {
    users: Mutex<UserStats>,
    skipped: Mutex<SkippedStats>,
}

/// Counters stay meaningful after a panicking recorder, so poisoning is ignored
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Key of the next error entry under one user and title
fn next_entry_key(
    dict: &ErrorDict,
    user: &str,
    title: &str,
    artwork_id: &str,
) -> String {
    let recorded = dict
        .get(user)
        .and_then(|titles| titles.get(title))
        .map_or(0, |entries| entries.len());
    format!("{}-{}-{}", title, artwork_id, recorded + 1)
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one artwork under `outcome` for `user_id`
    pub fn record_artwork(&self, user_id: &str, outcome: Outcome) {
        lock(&self.users).entry(outcome, user_id).artworks += 1;
    }

    /// Counts one downloaded image for `user_id`
    pub fn record_image_success(&self, user_id: &str) {
        lock(&self.users).entry(Outcome::Success, user_id).images += 1;
    }

    /// Counts an image skipped because `path` already exists
    pub fn record_existing_image(&self, user_id: &str, path: &Path) {
        lock(&self.users).entry(Outcome::FileExists, user_id).images += 1;

        let mut skipped = lock(&self.skipped);
        skipped.skipped_images_count += 1;
        *skipped
            .file_exists
            .entry(path.display().to_string())
            .or_default() += 1;
    }

    /// Records an image that exhausted its attempts
    ///
    /// The entry lands under `user_name` → `title` with key
    /// `{title}-{artwork_id}-{n}`, `n` being one more than the entries already
    /// recorded there. Returns the key.
    pub fn record_image_failure(
        &self,
        user_id: &str,
        user_name: &str,
        title: &str,
        artwork_id: &str,
        record: ErrorRecord,
    ) -> String {
        lock(&self.users).entry(Outcome::DownloadFailed, user_id).images += 1;

        let mut skipped = lock(&self.skipped);
        skipped.skipped_images_count += 1;
        *skipped
            .download_failed
            .entry(record.final_save_path.clone())
            .or_default() += 1;

        let key = next_entry_key(&skipped.error_dict, user_name, title, artwork_id);
        skipped
            .error_dict
            .entry(user_name.to_string())
            .or_default()
            .entry(title.to_string())
            .or_default()
            .insert(key.clone(), ErrorEntry::Image(record));
        key
    }

    /// Records an artwork task that failed at its boundary
    ///
    /// Counts the artwork as failed for `user_id` and files the details under
    /// `user_label` → `title`. Returns the entry key.
    pub fn record_artwork_failure(
        &self,
        user_id: &str,
        user_label: &str,
        failure: ArtworkFailure,
    ) -> String {
        self.record_artwork(user_id, Outcome::DownloadFailed);

        let mut skipped = lock(&self.skipped);
        let key = next_entry_key(
            &skipped.error_dict,
            user_label,
            &failure.title,
            &failure.artwork_id,
        );
        skipped
            .error_dict
            .entry(user_label.to_string())
            .or_default()
            .entry(failure.title.clone())
            .or_default()
            .insert(key.clone(), ErrorEntry::Artwork(failure));
        key
    }

    pub fn user_stats(&self) -> UserStats {
        lock(&self.users).clone()
    }

    pub fn skipped_stats(&self) -> SkippedStats {
        lock(&self.skipped).clone()
    }

    pub fn error_dict(&self) -> ErrorDict {
        lock(&self.skipped).error_dict.clone()
    }

    pub fn skipped_images_count(&self) -> u64 {
        lock(&self.skipped).skipped_images_count
    }
}
