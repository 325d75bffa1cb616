//! Autosave drafts and preview reads.
//!
//! An entity has at most one draft. Each autosave replaces the draft with a
//! new snapshot built from the previous one plus the keys that changed;
//! live metadata is never touched. Preview reads substitute draft values
//! for live ones where the draft holds something.

use crate::config::ComparisonMode;
use crate::entity::{EntityCatalog, EntityId};
use crate::error::CoreResult;
use crate::journal::{Journal, JournalRecord};
use crate::snapshot::Snapshot;
use crate::store::MetadataStore;
use metarev_codec::Value;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// The in-progress edit of one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    /// Entity being edited.
    pub entity: EntityId,
    /// Draft values of the versioned keys touched so far.
    pub snapshot: Snapshot,
    /// Number of autosaves folded into this draft.
    pub saves: u64,
}

/// Result of an autosave that produced a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedDraft {
    /// The draft after the save.
    pub draft: Draft,
    /// Versioned keys whose draft content changed, in key order.
    pub changed: Vec<String>,
}

/// Holds the current draft of each entity.
pub struct DraftOverlay {
    catalog: Arc<EntityCatalog>,
    store: Arc<MetadataStore>,
    journal: Arc<Journal>,
    comparison: ComparisonMode,
    drafts: RwLock<HashMap<EntityId, Draft>>,
}

impl DraftOverlay {
    pub(crate) fn new(
        catalog: Arc<EntityCatalog>,
        store: Arc<MetadataStore>,
        journal: Arc<Journal>,
        comparison: ComparisonMode,
    ) -> Self {
        Self {
            catalog,
            store,
            journal,
            comparison,
            drafts: RwLock::new(HashMap::new()),
        }
    }

    /// Records an autosave of `candidates`.
    ///
    /// Each versioned key present in `candidates` is compared with its
    /// effective value: the draft's value if the draft holds one, otherwise
    /// the first live value. A changed key has its draft content cleared
    /// and, unless the candidate is blank, replaced by the candidate. Keys
    /// not in `candidates` keep their draft content. Unversioned candidates
    /// are ignored. Entities registered as revisions, and entities whose type
    /// versions no keys, get no draft and `None` is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal append fails; the previous draft is
    /// kept in that case.
    pub fn save_draft(&self, entity: EntityId, candidates: &BTreeMap<String, Value>) -> CoreResult<Option<SavedDraft>> {
        if self.catalog.is_revision(entity) {
            debug!(%entity, "draft save on revision entity ignored");
            return Ok(None);
        }
        let keys = self.catalog.versioned_keys(entity);
        if keys.is_empty() {
            debug!(%entity, "entity type has no versioned keys; draft not saved");
            return Ok(None);
        }
        for name in candidates.keys() {
            if !keys.iter().any(|k| k.name() == name) {
                debug!(%entity, key = %name, "unversioned draft key ignored");
            }
        }

        let mut drafts = self.drafts.write();
        let previous = drafts.get(&entity);
        let mut entries = previous.map(|d| d.snapshot.to_map()).unwrap_or_default();
        let saves = previous.map_or(0, |d| d.saves) + 1;

        let mut changed = Vec::new();
        for key in keys {
            let name = key.name();
            let Some(candidate) = candidates.get(name) else {
                continue;
            };
            let effective = match entries.get(name).and_then(|values| values.first()) {
                Some(value) => Some(value.clone()),
                None => self.store.get_first(entity, name),
            };
            let unchanged = match &effective {
                Some(value) => self.comparison.values_equal(value, candidate),
                None => candidate.is_blank(),
            };
            if unchanged {
                continue;
            }
            entries.remove(name);
            if !candidate.is_blank() {
                entries.insert(name.to_string(), vec![candidate.clone()]);
            }
            changed.push(name.to_string());
        }

        let snapshot = Snapshot::from_entries(entries);
        self.journal.append(&JournalRecord::DraftSaved {
            entity,
            snapshot: snapshot.clone(),
            saves,
        })?;
        debug!(%entity, saves, changed = changed.len(), "draft saved");
        let draft = Draft {
            entity,
            snapshot,
            saves,
        };
        drafts.insert(entity, draft.clone());
        Ok(Some(SavedDraft { draft, changed }))
    }

    /// Reads `key` with draft values substituted for live ones.
    ///
    /// Falls back to live metadata when the entity has no draft, the key is
    /// not versioned, the entity is a revision, or the draft holds nothing
    /// for the key.
    #[must_use]
    pub fn read_with_preview(&self, entity: EntityId, key: &str) -> Vec<Value> {
        if self.catalog.is_revision(entity) || !self.catalog.is_versioned(entity, key) {
            return self.store.get(entity, key);
        }
        let drafts = self.drafts.read();
        match drafts.get(&entity).map(|d| d.snapshot.get(key)) {
            Some(values) if !values.is_empty() => values.to_vec(),
            _ => self.store.get(entity, key),
        }
    }

    /// First value of [`DraftOverlay::read_with_preview`].
    #[must_use]
    pub fn read_single_with_preview(&self, entity: EntityId, key: &str) -> Option<Value> {
        self.read_with_preview(entity, key).into_iter().next()
    }

    /// Ends the edit session of `entity`. Returns false if it had no draft.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal append fails.
    pub fn discard(&self, entity: EntityId) -> CoreResult<bool> {
        let mut drafts = self.drafts.write();
        if !drafts.contains_key(&entity) {
            return Ok(false);
        }
        self.journal.append(&JournalRecord::DraftDiscarded { entity })?;
        drafts.remove(&entity);
        debug!(%entity, "draft discarded");
        Ok(true)
    }

    /// Returns a copy of the current draft of `entity`.
    #[must_use]
    pub fn draft(&self, entity: EntityId) -> Option<Draft> {
        self.drafts.read().get(&entity).cloned()
    }

    /// Number of entities with an active draft.
    #[must_use]
    pub fn count(&self) -> usize {
        self.drafts.read().len()
    }

    pub(crate) fn replay_saved(&self, entity: EntityId, snapshot: Snapshot, saves: u64) {
        self.drafts.write().insert(
            entity,
            Draft {
                entity,
                snapshot,
                saves,
            },
        );
    }

    pub(crate) fn replay_discarded(&self, entity: EntityId) {
        self.drafts.write().remove(&entity);
    }
}

impl std::fmt::Debug for DraftOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftOverlay")
            .field("drafts", &self.count())
            .finish_non_exhaustive()
    }
}
