//! Save-time change detection.

use crate::config::ComparisonMode;
use crate::entity::{EntityCatalog, EntityId};
use crate::revision::RevisionEngine;
use crate::snapshot::Snapshot;
use crate::store::MetadataStore;
use crate::types::RevisionId;
use std::sync::Arc;
use tracing::debug;

/// Decides whether live metadata has drifted from a revision.
pub struct ChangeDetector {
    catalog: Arc<EntityCatalog>,
    store: Arc<MetadataStore>,
    revisions: Arc<RevisionEngine>,
    comparison: ComparisonMode,
}

impl ChangeDetector {
    pub(crate) fn new(
        catalog: Arc<EntityCatalog>,
        store: Arc<MetadataStore>,
        revisions: Arc<RevisionEngine>,
        comparison: ComparisonMode,
    ) -> Self {
        Self {
            catalog,
            store,
            revisions,
            comparison,
        }
    }

    /// Returns true if any versioned key of `entity` differs from `last`.
    ///
    /// Sequences are compared in order and by length, so reordering values
    /// or changing how often a value repeats counts as a change. An unknown
    /// revision, or one taken from another entity, compares as empty.
    #[must_use]
    pub fn has_changed(&self, entity: EntityId, last: RevisionId) -> bool {
        let previous = match self.revisions.revision(last) {
            Some(rev) if rev.parent == entity => Some(rev),
            Some(rev) => {
                debug!(%entity, revision = %last, parent = %rev.parent, "revision belongs to another entity");
                None
            }
            None => {
                debug!(%entity, revision = %last, "unknown revision");
                None
            }
        };
        let empty = Snapshot::empty();
        let previous = previous.as_ref().map_or(&empty, |rev| rev.snapshot.as_ref());

        let keys = self.catalog.versioned_keys(entity);
        let current = self.store.snapshot(entity, keys);
        keys.iter().any(|key| {
            !self
                .comparison
                .sequences_equal(current.get(key.name()), previous.get(key.name()))
        })
    }

    /// Host-facing save check: `host_has_changed || has_changed(..)`.
    ///
    /// Metadata can only add a reason to save, never veto one the host
    /// already has.
    #[must_use]
    pub fn post_has_changed(&self, host_has_changed: bool, entity: EntityId, last: RevisionId) -> bool {
        host_has_changed || self.has_changed(entity, last)
    }
}

impl std::fmt::Debug for ChangeDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeDetector")
            .field("comparison", &self.comparison)
            .finish_non_exhaustive()
    }
}
