//! Immutable revisions of versioned metadata.

use crate::entity::{EntityCatalog, EntityId};
use crate::error::CoreResult;
use crate::journal::{Journal, JournalRecord};
use crate::snapshot::{hex_string, Snapshot};
use crate::store::MetadataStore;
use crate::types::RevisionId;
use metarev_codec::Value;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::info;

/// A frozen copy of an entity's body and versioned metadata.
///
/// Revisions own their snapshot; nothing written to live metadata after
/// creation can change it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    /// Revision ID, unique across all entities.
    pub id: RevisionId,
    /// Entity this revision was taken from.
    pub parent: EntityId,
    /// Position in the parent's history, starting at 1.
    pub sequence: u64,
    /// Document body supplied by the host.
    pub body: Value,
    /// Versioned metadata at creation time.
    pub snapshot: Arc<Snapshot>,
    /// SHA-256 of the snapshot encoding.
    pub fingerprint: [u8; 32],
}

impl Revision {
    /// Returns the fingerprint as lowercase hex.
    #[must_use]
    pub fn fingerprint_hex(&self) -> String {
        hex_string(&self.fingerprint)
    }
}

struct RevisionIndex {
    by_id: BTreeMap<RevisionId, Arc<Revision>>,
    by_parent: HashMap<EntityId, Vec<RevisionId>>,
    next_id: RevisionId,
}

impl RevisionIndex {
    fn insert(&mut self, revision: Revision) -> Arc<Revision> {
        let revision = Arc::new(revision);
        if revision.id >= self.next_id {
            self.next_id = revision.id.next();
        }
        self.by_parent
            .entry(revision.parent)
            .or_default()
            .push(revision.id);
        self.by_id.insert(revision.id, Arc::clone(&revision));
        revision
    }

    fn sequence_for(&self, parent: EntityId) -> u64 {
        self.by_parent.get(&parent).map_or(0, Vec::len) as u64 + 1
    }
}

impl Default for RevisionIndex {
    fn default() -> Self {
        Self {
            by_id: BTreeMap::new(),
            by_parent: HashMap::new(),
            next_id: RevisionId::new(1),
        }
    }
}

/// Creates and indexes revisions.
pub struct RevisionEngine {
    catalog: Arc<EntityCatalog>,
    store: Arc<MetadataStore>,
    journal: Arc<Journal>,
    index: RwLock<RevisionIndex>,
}

impl RevisionEngine {
    pub(crate) fn new(catalog: Arc<EntityCatalog>, store: Arc<MetadataStore>, journal: Arc<Journal>) -> Self {
        Self {
            catalog,
            store,
            journal,
            index: RwLock::new(RevisionIndex::default()),
        }
    }

    /// Freezes the versioned metadata of `entity` into a new revision.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal append fails; no revision is
    /// recorded in that case.
    pub fn create_revision(&self, entity: EntityId) -> CoreResult<Arc<Revision>> {
        self.create_revision_with_body(entity, Value::Null)
    }

    /// Like [`RevisionEngine::create_revision`], storing `body` with it.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal append fails.
    pub fn create_revision_with_body(&self, entity: EntityId, body: Value) -> CoreResult<Arc<Revision>> {
        let mut index = self.index.write();
        let snapshot = self.store.snapshot(entity, self.catalog.versioned_keys(entity));
        let fingerprint = snapshot.fingerprint()?;
        let id = index.next_id;
        let sequence = index.sequence_for(entity);

        self.journal.append(&JournalRecord::RevisionCreated {
            revision: id,
            parent: entity,
            body: body.clone(),
            snapshot: snapshot.clone(),
            fingerprint,
        })?;

        let revision = index.insert(Revision {
            id,
            parent: entity,
            sequence,
            body,
            snapshot: Arc::new(snapshot),
            fingerprint,
        });
        info!(
            revision = %id,
            %entity,
            keys = revision.snapshot.len(),
            values = revision.snapshot.value_count(),
            "revision created"
        );
        Ok(revision)
    }

    /// Looks up a revision by ID.
    #[must_use]
    pub fn revision(&self, id: RevisionId) -> Option<Arc<Revision>> {
        self.index.read().by_id.get(&id).cloned()
    }

    /// Returns the revisions of `entity`, oldest first.
    #[must_use]
    pub fn revisions_for(&self, entity: EntityId) -> Vec<Arc<Revision>> {
        let index = self.index.read();
        index
            .by_parent
            .get(&entity)
            .map(|ids| ids.iter().filter_map(|id| index.by_id.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    /// Returns the newest revision of `entity`.
    #[must_use]
    pub fn latest_for(&self, entity: EntityId) -> Option<Arc<Revision>> {
        let index = self.index.read();
        index
            .by_parent
            .get(&entity)
            .and_then(|ids| ids.last())
            .and_then(|id| index.by_id.get(id).cloned())
    }

    /// Total number of revisions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.index.read().by_id.len()
    }

    pub(crate) fn replay(
        &self,
        id: RevisionId,
        parent: EntityId,
        body: Value,
        snapshot: Snapshot,
        fingerprint: [u8; 32],
    ) {
        let mut index = self.index.write();
        let sequence = index.sequence_for(parent);
        index.insert(Revision {
            id,
            parent,
            sequence,
            body,
            snapshot: Arc::new(snapshot),
            fingerprint,
        });
    }
}

impl std::fmt::Debug for RevisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisionEngine")
            .field("revisions", &self.count())
            .finish_non_exhaustive()
    }
}
