//! Where rendered save documents live.
//!
//! - [`MemoryStorage`] — in-process map, for tests and transient slots
//! - [`FileSystemStorage`] — one file per name under a root directory
//!
//! Names are flat file names: no separators, no `..`. Writes to disk go
//! through a temporary sibling file and a rename so a crash never leaves a
//! half-written save behind.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(io::Error),
    #[error("invalid name: {0}")]
    InvalidName(String),
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound(err.to_string())
        } else {
            StorageError::Io(err)
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A flat namespace of text documents.
pub trait SaveStorage: Send + Sync {
    fn read(&self, name: &str) -> StorageResult<String>;

    /// Create or replace.
    fn write(&self, name: &str, contents: &str) -> StorageResult<()>;

    fn exists(&self, name: &str) -> StorageResult<bool>;

    fn delete(&self, name: &str) -> StorageResult<()>;

    /// All names, sorted.
    fn list(&self) -> StorageResult<Vec<String>>;
}

fn validate_name(name: &str) -> StorageResult<()> {
    if name.is_empty() {
        return Err(StorageError::InvalidName("empty name".into()));
    }
    if name.contains(['/', '\\']) || name == "." || name.contains("..") {
        return Err(StorageError::InvalidName(name.to_owned()));
    }
    Ok(())
}

/// In-memory storage. Clones share the same contents.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    files: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

impl SaveStorage for MemoryStorage {
    fn read(&self, name: &str) -> StorageResult<String> {
        validate_name(name)?;
        self.files
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(name.to_owned()))
    }

    fn write(&self, name: &str, contents: &str) -> StorageResult<()> {
        validate_name(name)?;
        self.files.write().insert(name.to_owned(), contents.to_owned());
        Ok(())
    }

    fn exists(&self, name: &str) -> StorageResult<bool> {
        validate_name(name)?;
        Ok(self.files.read().contains_key(name))
    }

    fn delete(&self, name: &str) -> StorageResult<()> {
        validate_name(name)?;
        self.files
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(name.to_owned()))
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        let mut names: Vec<String> = self.files.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

/// Saves as files in one directory.
///
/// The directory is created on first write.
pub struct FileSystemStorage {
    root: PathBuf,
}

impl FileSystemStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> StorageResult<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }
}

const TMP_SUFFIX: &str = ".tmp";

fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(TMP_SUFFIX);
    let tmp_path = path.with_file_name(tmp_name);
    fs::write(&tmp_path, contents)?;

    // `rename` replaces an existing target, so the old save stays intact
    // until the new one is complete.
    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }
    Ok(())
}

impl SaveStorage for FileSystemStorage {
    fn read(&self, name: &str) -> StorageResult<String> {
        Ok(fs::read_to_string(self.resolve(name)?)?)
    }

    fn write(&self, name: &str, contents: &str) -> StorageResult<()> {
        let path = self.resolve(name)?;
        write_atomic(&path, contents)?;
        log::debug!("Wrote {} bytes to {}", contents.len(), path.display());
        Ok(())
    }

    fn exists(&self, name: &str) -> StorageResult<bool> {
        Ok(self.resolve(name)?.is_file())
    }

    fn delete(&self, name: &str) -> StorageResult<()> {
        Ok(fs::remove_file(self.resolve(name)?)?)
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.ends_with(TMP_SUFFIX) {
                    names.push(name.to_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_read_write_delete() {
        let storage = MemoryStorage::new();
        storage.write("a.json", "{}").unwrap();
        assert_eq!(storage.read("a.json").unwrap(), "{}");
        assert!(storage.exists("a.json").unwrap());

        storage.delete("a.json").unwrap();
        assert!(!storage.exists("a.json").unwrap());
        assert!(matches!(
            storage.read("a.json"),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            storage.delete("a.json"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn memory_clones_share_contents() {
        let storage = MemoryStorage::new();
        let other = storage.clone();
        storage.write("b.json", "1").unwrap();
        storage.write("a.json", "2").unwrap();
        assert_eq!(other.list().unwrap(), vec!["a.json", "b.json"]);
    }

    #[test]
    fn names_are_validated() {
        let storage = MemoryStorage::new();
        for bad in ["", ".", "../x", "dir/file", "dir\\file"] {
            assert!(
                matches!(storage.write(bad, "x"), Err(StorageError::InvalidName(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn atomic_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slot.json");
        write_atomic(&path, "old").unwrap();
        write_atomic(&path, "new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        let mut tmp_name = path.file_name().unwrap().to_os_string();
        tmp_name.push(TMP_SUFFIX);
        assert!(!path.with_file_name(tmp_name).exists());
    }

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err: StorageError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, StorageError::NotFound(_)));
        let err: StorageError = io::Error::new(io::ErrorKind::PermissionDenied, "no").into();
        assert!(matches!(err, StorageError::Io(_)));
    }
}
