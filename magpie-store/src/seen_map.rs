//! Keyed-timestamp store
//!
//! The map variant of [`LastSeenStore`]: tracks per-key progress, e.g.
//! "when was feed 17 last collected". Loaded and saved as a whole.
//!
//! [`LastSeenStore`]: crate::LastSeenStore

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::disk::{backup_path, write_replace};
use crate::StoreError;

/// Default primary filename.
pub const DEFAULT_SEEN_MAP_FILE: &str = "last_memory.json";

/// Durable map of integer keys to timestamps, dual-file like the
/// single-value store. JSON object keys are string-encoded integers on
/// disk; integer keys are restored on load. Missing or malformed files
/// fall back to an empty map.
#[derive(Debug)]
pub struct SeenMapStore {
    path: PathBuf,
    backup: PathBuf,
    memory: HashMap<i64, DateTime<Utc>>,
}

impl SeenMapStore {
    /// Open a store backed by `path`, loading whatever state survives.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let backup = backup_path(&path);
        let memory = load_map(&path, &backup);
        Self {
            path,
            backup,
            memory,
        }
    }

    /// The currently held map.
    pub fn get(&self) -> &HashMap<i64, DateTime<Utc>> {
        &self.memory
    }

    /// Re-read from disk: primary first, backup second, empty last.
    pub fn load(&mut self) -> &HashMap<i64, DateTime<Utc>> {
        self.memory = load_map(&self.path, &self.backup);
        &self.memory
    }

    /// Record one key's timestamp in memory; call [`store`] to persist.
    ///
    /// [`store`]: SeenMapStore::store
    pub fn mark(&mut self, key: i64, time: DateTime<Utc>) {
        self.memory.insert(key, time);
    }

    /// Persist a map to both files; `None` persists the held map.
    pub fn store(&mut self, progress: Option<HashMap<i64, DateTime<Utc>>>) -> Result<(), StoreError> {
        if let Some(progress) = progress {
            self.memory = progress;
        }
        let body = serde_json::to_string(&self.memory)?;
        write_replace(&self.path, &body)?;
        write_replace(&self.backup, &body)?;
        Ok(())
    }
}

fn load_map(path: &Path, backup: &Path) -> HashMap<i64, DateTime<Utc>> {
    read_map(path)
        .or_else(|| {
            debug!("primary {} unreadable, trying backup", path.display());
            read_map(backup)
        })
        .unwrap_or_else(|| {
            debug!("no usable state at {}, starting empty", path.display());
            HashMap::new()
        })
}

fn read_map(path: &Path) -> Option<HashMap<i64, DateTime<Utc>>> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}
