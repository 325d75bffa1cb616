//! # metarev storage
//!
//! Byte store backends for the metarev journal.
//!
//! The core engine keeps live metadata, revisions and drafts in memory and
//! appends every state change to a journal. The journal itself is written to
//! a [`StorageBackend`]: an opaque, append-only byte store that knows nothing
//! about record framing.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - tests and ephemeral engines
//! - [`FileBackend`] - a single journal file, optionally exclusively locked
//!
//! ## Example
//!
//! ```rust
//! use metarev_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"hello").unwrap();
//! assert_eq!(backend.read_at(offset, 5).unwrap(), b"hello");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
