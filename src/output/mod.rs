//! Output module for run reporting
//!
//! This module handles:
//! - Writing the `error.json` sidecar as full snapshots
//! - Building and logging the end-of-run summary

mod error_file;
pub mod report;

pub use error_file::ErrorJournal;
pub use report::{print_summary, RunSummary};
