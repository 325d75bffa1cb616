//! Restoring live metadata from a revision.

use crate::entity::{EntityCatalog, EntityId};
use crate::error::{CoreError, CoreResult};
use crate::revision::RevisionEngine;
use crate::store::MetadataStore;
use crate::types::RevisionId;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    /// Revision that was requested.
    pub revision: RevisionId,
    /// False if the revision was unknown or belongs to another entity.
    pub found: bool,
    /// Keys written back from the revision.
    pub restored: Vec<String>,
    /// Keys left empty because the revision held nothing for them.
    pub cleared: Vec<String>,
    /// Keys whose write failed.
    pub failed: Vec<String>,
}

impl RestoreReport {
    /// Creates an empty report for `revision`.
    #[must_use]
    pub fn new(revision: RevisionId) -> Self {
        Self {
            revision,
            found: false,
            restored: Vec::new(),
            cleared: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Returns true if every key was processed without a failure.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.found && self.failed.is_empty()
    }
}

/// Makes a past revision's metadata live again.
pub struct RestoreCoordinator {
    catalog: Arc<EntityCatalog>,
    store: Arc<MetadataStore>,
    revisions: Arc<RevisionEngine>,
}

impl RestoreCoordinator {
    pub(crate) fn new(
        catalog: Arc<EntityCatalog>,
        store: Arc<MetadataStore>,
        revisions: Arc<RevisionEngine>,
    ) -> Self {
        Self {
            catalog,
            store,
            revisions,
        }
    }

    /// Replaces every versioned key of `entity` with the revision's values.
    ///
    /// Keys the revision holds nothing for are cleared. Keys are independent:
    /// a failed write is recorded and the remaining keys are still processed.
    /// Restoring the same revision twice leaves the same live state.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RestoreIncomplete`] if any key could not be
    /// written. An unknown revision is not an error; the report comes back
    /// with `found == false` and live metadata untouched.
    pub fn restore(&self, entity: EntityId, revision: RevisionId) -> CoreResult<RestoreReport> {
        let mut report = RestoreReport::new(revision);
        let Some(rev) = self.revisions.revision(revision) else {
            debug!(%entity, %revision, "restore of unknown revision ignored");
            return Ok(report);
        };
        if rev.parent != entity {
            debug!(%entity, %revision, parent = %rev.parent, "restore of foreign revision ignored");
            return Ok(report);
        }
        report.found = true;

        let mut first_error = None;
        for key in self.catalog.versioned_keys(entity) {
            let name = key.name();
            let values = rev.snapshot.get(name);
            let result = if values.is_empty() {
                self.store.delete(entity, name)
            } else {
                self.store.set(entity, name, values.to_vec())
            };
            match result {
                Ok(()) if values.is_empty() => report.cleared.push(name.to_string()),
                Ok(()) => report.restored.push(name.to_string()),
                Err(err) => {
                    warn!(%entity, %revision, key = name, error = %err, "restore of key failed");
                    report.failed.push(name.to_string());
                    first_error.get_or_insert(err);
                }
            }
        }

        if let Some(source) = first_error {
            return Err(CoreError::RestoreIncomplete {
                report,
                source: Box::new(source),
            });
        }
        info!(
            %entity,
            %revision,
            restored = report.restored.len(),
            cleared = report.cleared.len(),
            "revision restored"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for RestoreCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestoreCoordinator").finish_non_exhaustive()
    }
}
