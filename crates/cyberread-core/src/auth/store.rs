//! Durable storage for the session record.
//!
//! The record holds exactly three keys: `token`, `user` and `lastActive`
//! (milliseconds since the epoch). They are always written and cleared
//! together; a store never exposes one without the others having been
//! written in the same operation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::models::Identity;

/// Session file name in the data directory
const SESSION_FILE: &str = "session.json";

/// The persisted session record. Fields are optional so that a damaged or
/// partially written record can still be read and recognized as such.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Identity>,
    #[serde(rename = "lastActive", default, skip_serializing_if = "Option::is_none")]
    pub last_active: Option<i64>,
}

/// Whole-record storage for the session.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<PersistedSession>>;
    fn save(&self, record: &PersistedSession) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// JSON file store. Writes go to a temp file first and are renamed into
/// place, so readers see either the old record or the new one.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<PersistedSession>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents =
            std::fs::read_to_string(&self.path).context("Failed to read session file")?;
        let record: PersistedSession =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        Ok(Some(record))
    }

    fn save(&self, record: &PersistedSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create data directory")?;
        }
        let contents = serde_json::to_string_pretty(record)?;
        let temp = self.temp_path();
        std::fs::write(&temp, contents).context("Failed to write session file")?;
        std::fs::rename(&temp, &self.path).context("Failed to move session file into place")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        for path in [self.temp_path(), self.path.clone()] {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to remove {}", path.display()))
                }
            }
        }
        Ok(())
    }
}

/// In-memory store, for tests and embedders that manage persistence
/// themselves.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    record: Mutex<Option<PersistedSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: PersistedSession) -> Self {
        Self {
            record: Mutex::new(Some(record)),
        }
    }

    pub fn snapshot(&self) -> Option<PersistedSession> {
        self.record.lock().clone()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<PersistedSession>> {
        Ok(self.record.lock().clone())
    }

    fn save(&self, record: &PersistedSession) -> Result<()> {
        *self.record.lock() = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.record.lock() = None;
        Ok(())
    }
}
