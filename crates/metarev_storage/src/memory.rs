//! In-memory storage backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::sync::Arc;

/// An in-memory byte store.
///
/// Clones share the same buffer, so a test can keep a handle, drop the
/// engine that owned the backend, and reopen a new engine over the same
/// bytes to exercise journal replay.
///
/// # Example
///
/// ```rust
/// use metarev_storage::{InMemoryBackend, StorageBackend};
///
/// let mut backend = InMemoryBackend::new();
/// let handle = backend.clone();
/// backend.append(b"record").unwrap();
/// assert_eq!(handle.size().unwrap(), 6);
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryBackend {
    data: Arc<RwLock<Vec<u8>>>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend pre-filled with `data`.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    /// Returns a copy of the stored bytes.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }

    /// Overwrites a single byte. Used to simulate on-disk corruption.
    ///
    /// Returns false if `offset` is out of range.
    pub fn corrupt_byte(&self, offset: usize, byte: u8) -> bool {
        match self.data.write().get_mut(offset) {
            Some(slot) => {
                *slot = byte;
                true
            }
            None => false,
        }
    }
}

impl StorageBackend for InMemoryBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let data = self.data.read();
        let size = data.len() as u64;
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        let end = start.saturating_add(len);

        if offset > size || end > data.len() {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        Ok(data[start..end].to_vec())
    }

    fn append(&mut self, bytes: &[u8]) -> StorageResult<u64> {
        let mut data = self.data.write();
        let offset = data.len() as u64;
        data.extend_from_slice(bytes);
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let mut data = self.data.write();
        let size = data.len() as u64;
        if new_size > size {
            return Err(StorageError::TruncatePastEnd {
                requested: new_size,
                size,
            });
        }
        data.truncate(new_size as usize);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_buffer() {
        let mut writer = InMemoryBackend::new();
        let reader = writer.clone();

        writer.append(b"MREV").unwrap();
        assert_eq!(reader.read_at(0, 4).unwrap(), b"MREV");
    }

    #[test]
    fn offsets_follow_appends() {
        let mut backend = InMemoryBackend::new();
        assert_eq!(backend.append(b"abc").unwrap(), 0);
        assert_eq!(backend.append(b"de").unwrap(), 3);
        assert_eq!(backend.size().unwrap(), 5);
    }

    #[test]
    fn read_past_end_fails() {
        let backend = InMemoryBackend::with_data(b"hello".to_vec());
        assert!(matches!(
            backend.read_at(3, 10),
            Err(StorageError::ReadPastEnd { .. })
        ));
        assert!(matches!(
            backend.read_at(10, 0),
            Err(StorageError::ReadPastEnd { .. })
        ));
        assert!(backend.read_at(5, 0).unwrap().is_empty());
    }

    #[test]
    fn truncate_drops_torn_tail() {
        let mut backend = InMemoryBackend::with_data(b"whole-record|torn".to_vec());
        backend.truncate(12).unwrap();
        assert_eq!(backend.data(), b"whole-record");
        assert!(matches!(
            backend.truncate(100),
            Err(StorageError::TruncatePastEnd { .. })
        ));
    }

    #[test]
    fn corrupt_byte_in_range_only() {
        let backend = InMemoryBackend::with_data(vec![0; 4]);
        assert!(backend.corrupt_byte(2, 0xff));
        assert!(!backend.corrupt_byte(4, 0xff));
        assert_eq!(backend.data(), vec![0, 0, 0xff, 0]);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn appends_are_readable_at_their_offsets(
                chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..16), 0..8),
            ) {
                let mut backend = InMemoryBackend::new();
                let mut offsets = Vec::new();
                for chunk in &chunks {
                    offsets.push(backend.append(chunk).unwrap());
                }
                let mut expected = 0u64;
                for (offset, chunk) in offsets.iter().zip(&chunks) {
                    prop_assert_eq!(*offset, expected);
                    prop_assert_eq!(&backend.read_at(*offset, chunk.len()).unwrap(), chunk);
                    expected += chunk.len() as u64;
                }
                prop_assert_eq!(backend.size().unwrap(), expected);
            }

            #[test]
            fn truncate_keeps_prefix(data in prop::collection::vec(any::<u8>(), 0..64), cut in 0usize..64) {
                let cut = cut.min(data.len());
                let mut backend = InMemoryBackend::with_data(data.clone());
                backend.truncate(cut as u64).unwrap();
                prop_assert_eq!(backend.data(), data[..cut].to_vec());
            }
        }
    }
}
