//! The `error.json` sidecar
//!
//! Each write is a full snapshot of the ledger's error dictionary. Writers
//! are serialized and the snapshot is taken while holding the write lock, so
//! a later write can never be overtaken by an older snapshot.

use crate::ledger::Ledger;
use crate::PixivError;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Serialized writer of the error sidecar file
#[derive(Debug)]
pub struct ErrorJournal {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ErrorJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the file with the ledger's current error dictionary
    pub async fn persist(&self, ledger: &Ledger) -> Result<(), PixivError> {
        let _guard = self.write_lock.lock().await;

        let json = to_pretty_json(&ledger.error_dict())?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.write_error(source))?;
        }
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|source| self.write_error(source))?;

        tracing::debug!("Error file written: {}", self.path.display());
        Ok(())
    }

    fn write_error(&self, source: std::io::Error) -> PixivError {
        PixivError::ErrorFile {
            path: self.path.display().to_string(),
            source,
        }
    }
}

/// Four-space indented JSON, non-ASCII kept as UTF-8
fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}
