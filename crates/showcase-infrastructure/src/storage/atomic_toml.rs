//! Atomic TOML file operations.
//!
//! Writes go to a sibling temp file that is fsynced and renamed over the
//! target, so readers only ever see a complete old or new document.
//! Read-modify-write sequences are serialized through an `fs2` lock file.

use serde::{Serialize, de::DeserializeOwned};
use showcase_core::ShowcaseError;
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum AtomicTomlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Lock error: {0}")]
    Lock(String),
}

impl From<AtomicTomlError> for ShowcaseError {
    fn from(err: AtomicTomlError) -> Self {
        match err {
            AtomicTomlError::Io(e) => e.into(),
            AtomicTomlError::Parse(e) => e.into(),
            AtomicTomlError::Serialize(e) => e.into(),
            AtomicTomlError::Lock(message) => ShowcaseError::io(message),
        }
    }
}

/// Handle to a TOML document that is only ever replaced whole.
pub struct AtomicTomlFile<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> AtomicTomlFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and deserializes the document.
    ///
    /// Returns `Ok(None)` when the file is missing or blank.
    pub fn load(&self) -> Result<Option<T>, AtomicTomlError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(toml::from_str(&content)?))
    }

    /// Replaces the document atomically (tmp file + fsync + rename).
    pub fn save(&self, data: &T) -> Result<(), AtomicTomlError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(data)?;

        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(toml_string.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Read-modify-write under the exclusive lock.
    ///
    /// `f` sees the current document (or `default_value` when there is none);
    /// the result is written back only when `f` returns `Ok`. The value `f`
    /// returns is passed through.
    pub fn update<R, F>(&self, default_value: T, f: F) -> Result<R, AtomicTomlError>
    where
        F: FnOnce(&mut T) -> Result<R, AtomicTomlError>,
    {
        let _lock = FileLock::acquire(&self.path)?;

        let mut data = self.load()?.unwrap_or(default_value);
        let output = f(&mut data)?;
        self.save(&data)?;

        Ok(output)
    }

    /// Deletes the document under the exclusive lock.
    ///
    /// A single `remove_file`: either the whole document is gone or nothing
    /// changed. A missing file counts as removed.
    pub fn remove(&self) -> Result<(), AtomicTomlError> {
        let _lock = FileLock::acquire(&self.path)?;

        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn temp_path(&self) -> Result<PathBuf, AtomicTomlError> {
        let parent = self.path.parent().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Path has no parent directory",
            )
        })?;
        let file_name = self.path.file_name().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "Path has no file name")
        })?;

        Ok(parent.join(format!(".{}.tmp", file_name.to_string_lossy())))
    }
}

/// Exclusive lock on `<path>.lock`, released on drop.
///
/// The lock file is never unlinked, so every opener locks the same inode.
struct FileLock {
    file: File,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, AtomicTomlError> {
        let lock_path = path.with_extension("lock");

        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        fs2::FileExt::lock_exclusive(&file)
            .map_err(|e| AtomicTomlError::Lock(format!("Failed to acquire lock: {}", e)))?;

        Ok(FileLock { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
    struct Counter {
        label: String,
        count: u32,
    }

    #[test]
    fn test_load_missing_and_blank_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("counter.toml");
        let file = AtomicTomlFile::<Counter>::new(path.clone());
        assert!(file.load().unwrap().is_none());

        fs::write(&path, "   \n").unwrap();
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_update_returns_closure_output_and_persists() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::<Counter>::new(temp_dir.path().join("nested/counter.toml"));

        let after_first = file
            .update(Counter::default(), |counter| {
                counter.count += 3;
                Ok(counter.count)
            })
            .unwrap();
        let after_second = file
            .update(Counter::default(), |counter| {
                counter.count += 4;
                Ok(counter.count)
            })
            .unwrap();

        assert_eq!(after_first, 3);
        assert_eq!(after_second, 7);
        assert_eq!(file.load().unwrap().unwrap().count, 7);
    }

    #[test]
    fn test_failed_update_leaves_document_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::<Counter>::new(temp_dir.path().join("counter.toml"));
        file.save(&Counter {
            label: "kept".to_string(),
            count: 1,
        })
        .unwrap();

        let result: Result<(), _> = file.update(Counter::default(), |counter| {
            counter.count = 99;
            Err(AtomicTomlError::Lock("simulated".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(file.load().unwrap().unwrap().count, 1);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("counter.toml");
        let file = AtomicTomlFile::<Counter>::new(path.clone());

        file.update(Counter::default(), |_| Ok(())).unwrap();

        assert!(path.exists());
        assert!(!temp_dir.path().join(".counter.toml.tmp").exists());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("counter.toml");
        let file = AtomicTomlFile::<Counter>::new(path.clone());
        file.save(&Counter::default()).unwrap();

        file.remove().unwrap();
        assert!(!path.exists());
        file.remove().unwrap();
    }

    #[test]
    fn test_parse_error_converts_to_serialization_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("counter.toml");
        fs::write(&path, "count = [unclosed").unwrap();

        let err: ShowcaseError = AtomicTomlFile::<Counter>::new(path).load().unwrap_err().into();
        assert!(matches!(err, ShowcaseError::Serialization { .. }));
    }
}
