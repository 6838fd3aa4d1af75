//! Settings persisted as a single JSON document on disk.
//!
//! # Atomic Writes
//!
//! Every write replaces the whole document using write-to-temp-then-rename:
//! 1. Write to `<path>.tmp`
//! 2. fsync the file
//! 3. Rename to `<path>`
//! 4. fsync the parent directory
//!
//! Readers therefore see either the old or the new document, never a partial
//! write. A missing file is an empty record (first run).

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::settings::{Settings, SettingsStore, StoreError};

/// Current schema version. Increment when making breaking changes.
pub const SCHEMA_VERSION: u32 = 1;

/// On-disk envelope around [`Settings`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSettings {
    /// Schema version for forward-compatible migrations.
    pub schema_version: u32,

    /// When the document was last written.
    pub saved_at: DateTime<Utc>,

    /// The stored keys.
    pub settings: Settings,
}

/// A [`SettingsStore`] backed by one JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn load_locked(&self) -> Result<Settings, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        read_settings(&self.path)
    }

    fn update_locked<F>(&self, f: F) -> Result<Settings, StoreError>
    where
        F: FnOnce(&mut Settings) -> bool,
    {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut settings = read_settings(&self.path)?;
        if f(&mut settings) {
            write_settings_atomic(&self.path, &settings)?;
            debug!(path = %self.path.display(), "Saved settings");
        } else {
            trace!("Update made no changes, skipping write");
        }
        Ok(settings)
    }
}

impl SettingsStore for FileStore {
    async fn load(&self) -> Result<Settings, StoreError> {
        self.load_locked()
    }

    async fn update<F>(&self, f: F) -> Result<Settings, StoreError>
    where
        F: FnOnce(&mut Settings) -> bool + Send,
    {
        self.update_locked(f)
    }
}

/// Reads the settings document, returning an empty record if it doesn't exist.
///
/// Malformed JSON and schema mismatches are propagated.
pub fn read_settings(path: &Path) -> Result<Settings, StoreError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Settings::default()),
        Err(e) => return Err(e.into()),
    };
    let persisted: PersistedSettings = serde_json::from_slice(&bytes)?;

    if persisted.schema_version != SCHEMA_VERSION {
        return Err(StoreError::SchemaMismatch {
            expected: SCHEMA_VERSION,
            got: persisted.schema_version,
        });
    }

    Ok(persisted.settings)
}

/// Writes the settings document atomically (temp file, fsync, rename, fsync dir).
pub fn write_settings_atomic(path: &Path, settings: &Settings) -> Result<(), StoreError> {
    if let Some(parent) = parent_dir(path) {
        std::fs::create_dir_all(parent)?;
    }

    let persisted = PersistedSettings {
        schema_version: SCHEMA_VERSION,
        saved_at: Utc::now(),
        settings: settings.clone(),
    };
    let bytes = serde_json::to_vec_pretty(&persisted)?;

    let tmp_path = path.with_extension("json.tmp");
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }

    std::fs::rename(&tmp_path, path)?;

    // The rename only survives power loss once the directory entry is synced.
    if let Some(parent) = parent_dir(path) {
        File::open(parent)?.sync_all()?;
    }

    Ok(())
}

/// Returns the parent directory, or `None` for bare file names.
fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}
