//! Counter tables
//!
//! Per-user tallies for the three outcomes of a run, plus the skip
//! bookkeeping that backs the end-of-run report.

use crate::ledger::errors::ErrorDict;
use serde::Serialize;
use std::collections::BTreeMap;

/// Artwork and image counts of one user under one outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub artworks: u64,
    pub images: u64,
}

/// Which table an increment lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Success,
    DownloadFailed,
    FileExists,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::DownloadFailed => "download_failed",
            Outcome::FileExists => "file_exists",
        }
    }
}

/// Per-user tallies keyed by user ID
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserStats {
    pub success: BTreeMap<String, Tally>,
    pub download_failed: BTreeMap<String, Tally>,
    pub file_exists: BTreeMap<String, Tally>,
}

impl UserStats {
    pub fn table(&self, outcome: Outcome) -> &BTreeMap<String, Tally> {
        match outcome {
            Outcome::Success => &self.success,
            Outcome::DownloadFailed => &self.download_failed,
            Outcome::FileExists => &self.file_exists,
        }
    }

    pub(crate) fn entry(&mut self, outcome: Outcome, user_id: &str) -> &mut Tally {
        let table = match outcome {
            Outcome::Success => &mut self.success,
            Outcome::DownloadFailed => &mut self.download_failed,
            Outcome::FileExists => &mut self.file_exists,
        };
        table.entry(user_id.to_string()).or_default()
    }

    /// Tally of `user_id` under `outcome`, zero if never touched
    pub fn tally(&self, outcome: Outcome, user_id: &str) -> Tally {
        self.table(outcome).get(user_id).copied().unwrap_or_default()
    }

    /// Sum of one outcome's tallies across all users
    pub fn total(&self, outcome: Outcome) -> Tally {
        self.table(outcome)
            .values()
            .fold(Tally::default(), |acc, t| Tally {
                artworks: acc.artworks + t.artworks,
                images: acc.images + t.images,
            })
    }
}

/// Image-level skip bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SkippedStats {
    /// Images not downloaded in this run, for any reason
    pub skipped_images_count: u64,

    /// Final path → times it was found already on disk
    pub file_exists: BTreeMap<String, u64>,

    /// user name → title → image key → error
    pub error_dict: ErrorDict,

    /// Final path → times it exhausted its attempts
    pub download_failed: BTreeMap<String, u64>,
}
