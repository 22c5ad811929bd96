//! Durable ledger of article URLs that have already been processed.
//!
//! The ledger is a JSON array of URL strings, sorted, loaded fully at startup
//! and rewritten fully on every insertion. Writes go to a temporary file in
//! the same directory which is then renamed over the target, so a reader
//! never observes a half-written file.
//!
//! # Failure model
//!
//! - A missing or unparsable ledger loads as an empty set (logged).
//! - A failed write is logged and leaves memory ahead of disk; the URL still
//!   counts as seen for the rest of the process.

use crate::error::PersistError;
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

/// Set of URLs that must never be emitted as new articles again.
#[derive(Debug)]
pub struct SeenStore {
    path: PathBuf,
    urls: BTreeSet<String>,
}

impl SeenStore {
    /// Load the ledger at `path`, falling back to an empty set.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let urls = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Vec<String>>(&text) {
                Ok(list) => list.into_iter().collect(),
                Err(e) => {
                    warn!(error = %e, "Seen-URL ledger is unreadable; starting empty");
                    BTreeSet::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No seen-URL ledger yet");
                BTreeSet::new()
            }
            Err(e) => {
                warn!(error = %e, "Failed to read seen-URL ledger; starting empty");
                BTreeSet::new()
            }
        };
        info!(count = urls.len(), "Loaded seen URLs");
        Self { path, urls }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Record `url` and persist. Returns `false` if it was already present.
    pub fn mark(&mut self, url: &str) -> bool {
        if !self.urls.insert(url.to_string()) {
            return false;
        }
        if let Err(e) = self.persist() {
            warn!(%url, path = %self.path.display(), error = %e, "Failed to persist seen URLs");
        }
        true
    }

    /// Forget every URL. Administrative reset only.
    pub fn clear(&mut self) {
        let dropped = self.urls.len();
        self.urls.clear();
        match self.persist() {
            Ok(()) => info!(dropped, "Cleared seen-URL ledger"),
            Err(e) => warn!(error = %e, "Failed to persist cleared seen-URL ledger"),
        }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }

    fn persist(&self) -> Result<(), PersistError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        // BTreeSet iterates in order, so the file is deterministic.
        let body = serde_json::to_string_pretty(&self.urls)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(body.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&self.path).map_err(|e| PersistError::Io(e.error))?;
        Ok(())
    }
}
