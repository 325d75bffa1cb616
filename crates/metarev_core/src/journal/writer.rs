//! Journal writer and scanner.

use crate::error::{CoreError, CoreResult};
use crate::journal::record::{JournalRecord, JournalRecordType, JOURNAL_MAGIC, JOURNAL_VERSION};
use metarev_codec::CodecError;
use metarev_storage::StorageBackend;
use parking_lot::Mutex;
use tracing::warn;

/// magic (4) + version (2) + type (1) + length (4)
const HEADER_SIZE: usize = 11;

const CRC_SIZE: usize = 4;

/// Result of scanning the journal from the start.
#[derive(Debug, Default)]
pub struct JournalScan {
    /// Every complete record with its starting offset.
    pub records: Vec<(u64, JournalRecord)>,
    /// Offset of an incomplete trailing record, if the journal ends in one.
    pub torn_tail: Option<u64>,
}

/// Append-only record log over a storage backend.
pub struct Journal {
    backend: Mutex<Box<dyn StorageBackend>>,
    sync_on_write: bool,
}

impl Journal {
    /// Creates a journal over `backend`.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_write: bool) -> Self {
        Self {
            backend: Mutex::new(backend),
            sync_on_write,
        }
    }

    /// Appends a record and returns its offset.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be encoded, exceeds 4 GiB, or
    /// the backend rejects the write. Nothing is applied in memory by the
    /// caller when this fails, so a record whose flush fails is cut off
    /// again before the error is returned.
    pub fn append(&self, record: &JournalRecord) -> CoreResult<u64> {
        let payload = record.encode_payload()?;
        let len = u32::try_from(payload.len())
            .map_err(|_| CodecError::encoding_failed("journal record payload exceeds 4 GiB"))?;

        let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        data.extend_from_slice(&JOURNAL_MAGIC);
        data.extend_from_slice(&JOURNAL_VERSION.to_le_bytes());
        data.push(record.record_type().as_byte());
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(&payload);
        let crc = crc32fast::hash(&data);
        data.extend_from_slice(&crc.to_le_bytes());

        let mut backend = self.backend.lock();
        let offset = backend.append(&data)?;
        if self.sync_on_write {
            if let Err(err) = backend.flush() {
                warn!(offset, error = %err, "journal flush failed, rolling back record");
                backend.truncate(offset)?;
                return Err(err.into());
            }
        }
        Ok(offset)
    }

    /// Reads every complete record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::JournalCorruption`] for a damaged record and a
    /// storage error if the backend cannot be read.
    pub fn read_all(&self) -> CoreResult<JournalScan> {
        let backend = self.backend.lock();
        let size = backend.size()?;
        let bytes = usize::try_from(size)
            .map_err(|_| CoreError::journal_corruption(0, "journal larger than address space"))?;
        let data = backend.read_at(0, bytes)?;
        drop(backend);

        let mut scan = JournalScan::default();
        let mut pos = 0usize;
        while pos < data.len() {
            let offset = pos as u64;
            let remaining = &data[pos..];
            if remaining.len() < HEADER_SIZE {
                scan.torn_tail = Some(offset);
                break;
            }

            if remaining[0..4] != JOURNAL_MAGIC {
                return Err(CoreError::journal_corruption(offset, "invalid magic"));
            }
            let version = u16::from_le_bytes([remaining[4], remaining[5]]);
            if version > JOURNAL_VERSION {
                return Err(CoreError::journal_corruption(
                    offset,
                    format!("unsupported version {version}"),
                ));
            }
            let type_byte = remaining[6];
            let record_type = JournalRecordType::from_byte(type_byte).ok_or_else(|| {
                CoreError::journal_corruption(offset, format!("unknown record type {type_byte}"))
            })?;
            let len = u32::from_le_bytes([remaining[7], remaining[8], remaining[9], remaining[10]])
                as usize;

            let total = HEADER_SIZE + len + CRC_SIZE;
            if remaining.len() < total {
                scan.torn_tail = Some(offset);
                break;
            }

            let body_end = HEADER_SIZE + len;
            let stored = u32::from_le_bytes([
                remaining[body_end],
                remaining[body_end + 1],
                remaining[body_end + 2],
                remaining[body_end + 3],
            ]);
            let computed = crc32fast::hash(&remaining[..body_end]);
            if stored != computed {
                return Err(CoreError::journal_corruption(
                    offset,
                    format!("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}"),
                ));
            }

            let record = JournalRecord::decode_payload(record_type, &remaining[HEADER_SIZE..body_end])
                .map_err(|e| CoreError::journal_corruption(offset, e.to_string()))?;
            scan.records.push((offset, record));
            pos += total;
        }
        Ok(scan)
    }

    /// Truncates the journal to `offset`.
    pub fn truncate(&self, offset: u64) -> CoreResult<()> {
        let mut backend = self.backend.lock();
        backend.truncate(offset)?;
        backend.sync()?;
        Ok(())
    }

    /// Returns the journal size in bytes.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.backend.lock().size()?)
    }

    /// Flushes pending writes to durable storage.
    pub fn flush(&self) -> CoreResult<()> {
        self.backend.lock().flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("sync_on_write", &self.sync_on_write)
            .finish_non_exhaustive()
    }
}
