//! File-based storage backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A byte store backed by a single file.
///
/// - `flush()` pushes buffered data to the OS
/// - `sync()` calls `File::sync_all()`
///
/// Use [`FileBackend::open_exclusive`] when the file is a journal owned by
/// one engine; the advisory lock is released when the backend is dropped.
///
/// # Example
///
/// ```no_run
/// use metarev_storage::{FileBackend, StorageBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open_exclusive(Path::new("meta.journal")).unwrap();
/// backend.append(b"record").unwrap();
/// backend.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: Mutex<File>,
    size: u64,
    locked: bool,
}

impl FileBackend {
    /// Opens or creates the file at `path` without locking it.
    ///
    /// Read-only tooling (inspection, verification) uses this.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            size,
            locked: false,
        })
    }

    /// Opens or creates the file and takes an exclusive advisory lock.
    ///
    /// Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] if another handle holds the lock.
    pub fn open_exclusive(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut backend = Self::open(path)?;
        backend
            .file
            .get_mut()
            .try_lock_exclusive()
            .map_err(|_| StorageError::Locked {
                path: path.display().to_string(),
            })?;
        backend.locked = true;
        Ok(backend)
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if this handle holds the exclusive lock.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let end = offset.saturating_add(len as u64);
        if offset > self.size || end > self.size {
            return Err(StorageError::ReadPastEnd {
                offset,
                len,
                size: self.size,
            });
        }
        if len == 0 {
            return Ok(Vec::new());
        }

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let offset = self.size;
        if data.is_empty() {
            return Ok(offset);
        }

        let file = self.file.get_mut();
        file.seek(SeekFrom::End(0))?;
        file.write_all(data)?;
        self.size += data.len() as u64;
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.file.get_mut().flush()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.size)
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.file.get_mut().sync_all()?;
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        if new_size > self.size {
            return Err(StorageError::TruncatePastEnd {
                requested: new_size,
                size: self.size,
            });
        }
        let file = self.file.get_mut();
        file.set_len(new_size)?;
        file.sync_all()?;
        self.size = new_size;
        Ok(())
    }
}

impl Drop for FileBackend {
    fn drop(&mut self) {
        if self.locked {
            let _ = FileExt::unlock(&*self.file.get_mut());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn append_read_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("meta.journal");

        {
            let mut backend = FileBackend::open(&path).unwrap();
            assert_eq!(backend.append(b"first").unwrap(), 0);
            assert_eq!(backend.append(b"second").unwrap(), 5);
            backend.sync().unwrap();
        }

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.size().unwrap(), 11);
        assert_eq!(backend.read_at(5, 6).unwrap(), b"second");
        assert!(matches!(
            backend.read_at(8, 6),
            Err(StorageError::ReadPastEnd { .. })
        ));
    }

    #[test]
    fn exclusive_lock_blocks_second_owner() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("meta.journal");

        let first = FileBackend::open_exclusive(&path).unwrap();
        assert!(first.is_locked());
        assert!(matches!(
            FileBackend::open_exclusive(&path),
            Err(StorageError::Locked { .. })
        ));

        drop(first);
        assert!(FileBackend::open_exclusive(&path).is_ok());
    }

    #[test]
    fn unlocked_open_does_not_take_lock() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("meta.journal");

        let _reader = FileBackend::open(&path).unwrap();
        assert!(FileBackend::open_exclusive(&path).is_ok());
    }

    #[test]
    fn truncate_shortens_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("meta.journal");

        let mut backend = FileBackend::open(&path).unwrap();
        backend.append(b"keep|drop").unwrap();
        backend.truncate(4).unwrap();
        assert_eq!(backend.size().unwrap(), 4);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 4);
        assert!(matches!(
            backend.truncate(9),
            Err(StorageError::TruncatePastEnd { .. })
        ));
    }
}
