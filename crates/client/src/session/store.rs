//! Key-value backends for session state.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;

use crate::error::SessionError;

/// Where session documents live.
///
/// One JSON document per key. Implementations do no merging: the last
/// `save` for a key wins.
pub trait SessionStore: Send + Sync {
    /// Read the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read. A stored value that
    /// is not valid JSON is an error too; callers decide whether to drop it.
    fn load(&self, key: &str) -> Result<Option<Value>, SessionError>;

    /// Replace the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn save(&self, key: &str, value: &Value) -> Result<(), SessionError>;

    /// Delete the document stored under `key`. Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), SessionError>;
}

fn check_key(key: &str) -> Result<(), SessionError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(SessionError::InvalidKey(key.to_owned()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Store
// ─────────────────────────────────────────────────────────────────────────────

/// Session documents as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    /// Use `dir` for session files. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The session directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> Result<PathBuf, SessionError> {
        check_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

fn write_then_rename(temp_path: &Path, path: &Path, value: &Value) -> Result<(), SessionError> {
    let mut writer = BufWriter::new(File::create(temp_path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    drop(writer);
    fs::rename(temp_path, path)?;
    Ok(())
}

impl SessionStore for FileSessionStore {
    fn load(&self, key: &str) -> Result<Option<Value>, SessionError> {
        let path = self.path(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, key: &str, value: &Value) -> Result<(), SessionError> {
        let path = self.path(key)?;
        fs::create_dir_all(&self.dir)?;

        // Write to temp file then rename (atomic on POSIX)
        let temp_path = path.with_extension("json.tmp");
        if let Err(err) = write_then_rename(&temp_path, &path, value) {
            match fs::remove_file(&temp_path) {
                Ok(()) => {}
                Err(cleanup) if cleanup.kind() == ErrorKind::NotFound => {}
                Err(cleanup) => {
                    tracing::warn!(path = %temp_path.display(), error = %cleanup, "Session temp file left behind");
                }
            }
            return Err(err);
        }
        tracing::debug!(key, path = %path.display(), "Session saved");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let path = self.path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Store
// ─────────────────────────────────────────────────────────────────────────────

/// Session documents held in process memory.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<String, Value>>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self, key: &str) -> Result<Option<Value>, SessionError> {
        check_key(key)?;
        let values = self.values.lock().map_err(|_| SessionError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &Value) -> Result<(), SessionError> {
        check_key(key)?;
        let mut values = self.values.lock().map_err(|_| SessionError::Poisoned)?;
        values.insert(key.to_owned(), value.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        check_key(key)?;
        let mut values = self.values.lock().map_err(|_| SessionError::Poisoned)?;
        values.remove(key);
        Ok(())
    }
}
