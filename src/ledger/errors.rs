//! Error records kept for the `error.json` sidecar

use serde::Serialize;
use std::collections::BTreeMap;

/// user → title → entry key → entry
pub type ErrorDict = BTreeMap<String, BTreeMap<String, BTreeMap<String, ErrorEntry>>>;

/// An image that exhausted its attempts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub url: String,
    pub final_save_path: String,
    pub reason: String,
}

/// An artwork task that failed at its boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkFailure {
    pub message: String,
    pub kind: String,
    /// Error source chain, outermost first, one cause per line
    pub trace: String,
    pub artwork_id: String,
    pub title: String,
}

/// Either kind of failure, serialized without a tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorEntry {
    Image(ErrorRecord),
    Artwork(ArtworkFailure),
}

/// Formats an error and its `source()` chain, one line per cause
pub fn error_trace(error: &(dyn std::error::Error + 'static)) -> String {
    let mut lines = vec![error.to_string()];
    let mut current = error.source();
    while let Some(cause) = current {
        lines.push(format!("caused by: {}", cause));
        current = cause.source();
    }
    lines.join("\n")
}
