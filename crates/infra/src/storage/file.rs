//! Durable key/value storage backed by one file per key
//!
//! Keys are percent-encoded into file names under the state directory.
//! Writes go to a unique temp file first and are renamed into place.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use crmchat_core::{KeyValueStorage, StorageError};
use tracing::debug;

use crate::errors::InfraError;

/// File-backed [`KeyValueStorage`]
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Store under `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding `key`
    ///
    /// # Errors
    /// Returns [`StorageError::InvalidKey`] for empty keys.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.trim().is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        // '.' survives encoding; a leading dot would hide the file or
        // produce "." / ".."
        let encoded = urlencoding::encode(key).replace('.', "%2E");
        Ok(self.dir.join(format!("{encoded}.json")))
    }

    fn write_atomic(&self, path: &Path, value: &str) -> Result<(), InfraError> {
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        fs::create_dir_all(&self.dir).map_err(|e| InfraError::io(&self.dir, e))?;

        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let tmp_path = path.with_file_name(format!("{file_name}.{}.{seq}.tmp", std::process::id()));

        write_private(&tmp_path, value).map_err(|e| InfraError::io(&tmp_path, e))?;
        fs::rename(&tmp_path, path).map_err(|e| InfraError::io(path, e))
    }
}

#[cfg(unix)]
fn write_private(path: &Path, value: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file =
        fs::OpenOptions::new().write(true).create(true).truncate(true).mode(0o600).open(path)?;
    file.write_all(value.as_bytes())?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, value: &str) -> std::io::Result<()> {
    fs::write(path, value)
}

impl KeyValueStorage for FileKeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(InfraError::io(path, err).into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        self.write_atomic(&path, value)?;
        debug!(key, "Stored item");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(InfraError::io(path, err).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for storage::file.
    use tempfile::TempDir;

    use super::*;

    /// Validates `FileKeyValueStore` basic item lifecycle.
    ///
    /// Assertions:
    /// - Confirms a stored value reads back unchanged.
    /// - Ensures removing a missing key is not an error.
    #[test]
    fn test_set_get_remove_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(dir.path().join("state"));

        assert_eq!(store.get_item("oidc-storage").unwrap(), None);
        store.set_item("oidc-storage", r#"{"isAuthenticated":true}"#).unwrap();
        assert_eq!(
            store.get_item("oidc-storage").unwrap().as_deref(),
            Some(r#"{"isAuthenticated":true}"#)
        );

        store.remove_item("oidc-storage").unwrap();
        assert_eq!(store.get_item("oidc-storage").unwrap(), None);
        // Removing twice is fine
        store.remove_item("oidc-storage").unwrap();
    }

    /// Validates key encoding for keys with path separators.
    ///
    /// Assertions:
    /// - Confirms every key maps to a file directly inside the directory.
    /// - Ensures a blank key is rejected.
    #[test]
    fn test_keys_with_separators_stay_inside_the_directory() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(dir.path());

        let key = "oidc.user:https://id.example.test/realms/crm:crmchat";
        let path = store.path_for(key).unwrap();
        assert_eq!(path.parent(), Some(dir.path()));

        store.set_item(key, "{}").unwrap();
        assert_eq!(store.get_item(key).unwrap().as_deref(), Some("{}"));

        let dotted = store.path_for("..").unwrap();
        assert_eq!(dotted.parent(), Some(dir.path()));
        assert!(store.path_for("  ").is_err());
    }

    /// Validates that atomic overwrites clean up after themselves.
    #[test]
    fn test_overwrite_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(dir.path());

        store.set_item("k", "a much longer first value").unwrap();
        store.set_item("k", "short").unwrap();

        assert_eq!(store.get_item("k").unwrap().as_deref(), Some("short"));
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    /// Validates owner-only permissions on written files.
    #[cfg(unix)]
    #[test]
    fn test_files_are_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(dir.path());
        store.set_item("k", "secret").unwrap();

        let mode = fs::metadata(store.path_for("k").unwrap()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
