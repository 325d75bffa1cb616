//! Append-only journal of metadata, revision and draft transitions.
//!
//! Every mutation is appended here before it is applied in memory, and the
//! journal is replayed on open to rebuild the catalog, live metadata,
//! revisions and drafts.
//!
//! ## Record Format
//!
//! ```text
//! | magic (4) | version (2) | type (1) | length (4) | payload (N) | crc32 (4) |
//! ```
//!
//! Integers are little-endian. The payload is a CBOR map with text keys and
//! the CRC covers everything before it.
//!
//! ## Recovery Policy
//!
//! A record cut short at the end of the journal (a crash mid-append) ends
//! the scan; the scan reports its offset so the caller can truncate it
//! away. A checksum mismatch, bad magic, unknown type or future version is
//! corruption and aborts the open.

mod record;
mod writer;

pub use record::{JournalRecord, JournalRecordType, JOURNAL_MAGIC, JOURNAL_VERSION};
pub use writer::{Journal, JournalScan};
