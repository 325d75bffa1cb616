//! # metarev core
//!
//! Versioned key-value metadata for revisioned entities.
//!
//! Hosts attach multi-valued metadata to their documents. For each entity
//! type a [`MetadataKeySet`] names the keys that are versioned; those keys
//! are frozen into every [`Revision`], written back on restore, held in
//! autosave drafts, and handed to diff renderers. Other keys are left alone.
//!
//! This crate provides:
//! - [`MetadataStore`] for live multi-valued metadata
//! - [`RevisionEngine`] for immutable revisions
//! - [`ChangeDetector`] for save-time change checks
//! - [`RestoreCoordinator`] for rolling live metadata back
//! - [`DraftOverlay`] for autosave drafts and preview reads
//! - a journal that makes all of it durable, replayed on open
//!
//! ## Example
//!
//! ```rust
//! use metarev_core::{Config, EntityId, MetadataKeySet, Value, Versioning};
//!
//! let config = Config::new()
//!     .key_set(MetadataKeySet::new().version("post", ["tags"]))
//!     .default_entity_type("post");
//! let versioning = Versioning::open_in_memory(config).unwrap();
//!
//! let post = EntityId::new();
//! versioning.set_meta(post, "tags", vec![Value::text("a"), Value::text("b")]).unwrap();
//! let r1 = versioning.create_revision(post).unwrap();
//!
//! versioning.set_meta(post, "tags", vec![Value::text("b"), Value::text("a")]).unwrap();
//! assert!(versioning.has_changed(post, r1));
//!
//! versioning.restore(post, r1).unwrap();
//! assert_eq!(versioning.get_meta(post, "tags"), vec![Value::text("a"), Value::text("b")]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change;
mod config;
mod diff;
mod draft;
mod entity;
mod error;
mod events;
pub mod journal;
mod keys;
mod listener;
mod restore;
mod revision;
mod snapshot;
mod stats;
mod store;
mod types;
mod versioning;

pub use change::ChangeDetector;
pub use config::{ComparisonMode, Config};
pub use diff::{diff_snapshots, FieldDiff};
pub use draft::{Draft, DraftOverlay, SavedDraft};
pub use entity::{EntityCatalog, EntityId, EntityRecord};
pub use error::{CoreError, CoreResult};
pub use events::{EventFeed, EventKind, VersioningEvent};
pub use keys::{MetadataKeySet, VersionedKey};
pub use listener::VersioningListener;
pub use restore::{RestoreCoordinator, RestoreReport};
pub use revision::{Revision, RevisionEngine};
pub use snapshot::{hex_string, Snapshot};
pub use stats::{StatsSnapshot, VersioningStats};
pub use store::MetadataStore;
pub use types::{EntityKind, EntityType, RevisionId};
pub use versioning::{Versioning, VersioningBuilder};

pub use metarev_codec::Value;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
