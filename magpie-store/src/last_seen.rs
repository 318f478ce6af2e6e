//! Single-timestamp store
//!
//! Remembers one point in time across process restarts, e.g. "when did the
//! last collection run finish".

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::disk::{backup_path, write_replace};
use crate::StoreError;

/// Default primary filename.
pub const DEFAULT_LAST_SEEN_FILE: &str = "last_time.json";

/// Durable single-timestamp store with a primary and a backup file.
///
/// Both files are written together and agree after a successful [`store`].
/// Loading prefers the primary, falls back to the backup, and falls back to
/// the current time when both are missing or malformed.
///
/// [`store`]: LastSeenStore::store
#[derive(Debug)]
pub struct LastSeenStore {
    path: PathBuf,
    backup: PathBuf,
    last_seen: DateTime<Utc>,
}

impl LastSeenStore {
    /// Open a store backed by `path`, loading whatever state survives.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let backup = backup_path(&path);
        let last_seen = load_timestamp(&path, &backup);
        Self {
            path,
            backup,
            last_seen,
        }
    }

    /// The currently held timestamp.
    pub fn get(&self) -> DateTime<Utc> {
        self.last_seen
    }

    /// Re-read from disk: primary first, backup second, now as last resort.
    pub fn load(&mut self) -> DateTime<Utc> {
        self.last_seen = load_timestamp(&self.path, &self.backup);
        self.last_seen
    }

    /// Persist a timestamp to both files; `None` stamps the current time.
    pub fn store(&mut self, time: Option<DateTime<Utc>>) -> Result<(), StoreError> {
        self.last_seen = time.unwrap_or_else(Utc::now);
        let body = serde_json::to_string(&self.last_seen)?;
        write_replace(&self.path, &body)?;
        write_replace(&self.backup, &body)?;
        Ok(())
    }
}

fn load_timestamp(path: &Path, backup: &Path) -> DateTime<Utc> {
    read_timestamp(path)
        .or_else(|| {
            debug!("primary {} unreadable, trying backup", path.display());
            read_timestamp(backup)
        })
        .unwrap_or_else(|| {
            debug!("no usable state at {}, starting from now", path.display());
            Utc::now()
        })
}

fn read_timestamp(path: &Path) -> Option<DateTime<Utc>> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}
