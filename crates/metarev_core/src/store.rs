//! Live multi-valued metadata.

use crate::entity::EntityId;
use crate::error::CoreResult;
use crate::journal::{Journal, JournalRecord};
use crate::keys::VersionedKey;
use crate::snapshot::Snapshot;
use metarev_codec::Value;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

type EntityMeta = BTreeMap<String, Vec<Value>>;

/// Key-value store of live metadata, keyed by `(entity, key)`.
///
/// Every key holds an ordered sequence of values; duplicates are allowed.
/// Writes to one key are journaled and then applied under the store's
/// write lock, so readers observe either the old or the new sequence.
/// Unknown entities read as empty and are never an error.
pub struct MetadataStore {
    live: RwLock<HashMap<EntityId, EntityMeta>>,
    journal: Arc<Journal>,
}

impl MetadataStore {
    pub(crate) fn new(journal: Arc<Journal>) -> Self {
        Self {
            live: RwLock::new(HashMap::new()),
            journal,
        }
    }

    /// Returns the values of `key` (empty if absent).
    #[must_use]
    pub fn get(&self, entity: EntityId, key: &str) -> Vec<Value> {
        self.live
            .read()
            .get(&entity)
            .and_then(|meta| meta.get(key))
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the first value of `key`, if any.
    #[must_use]
    pub fn get_first(&self, entity: EntityId, key: &str) -> Option<Value> {
        self.live
            .read()
            .get(&entity)
            .and_then(|meta| meta.get(key))
            .and_then(|values| values.first())
            .cloned()
    }

    /// Returns every key of `entity` with its values.
    #[must_use]
    pub fn get_all(&self, entity: EntityId) -> BTreeMap<String, Vec<Value>> {
        self.live.read().get(&entity).cloned().unwrap_or_default()
    }

    /// Replaces all values of `key` with `values`.
    ///
    /// An empty `values` deletes the key.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal append fails. Live metadata is
    /// unchanged in that case.
    pub fn set(&self, entity: EntityId, key: &str, values: Vec<Value>) -> CoreResult<()> {
        if values.is_empty() {
            return self.delete(entity, key);
        }
        let mut live = self.live.write();
        self.journal.append(&JournalRecord::MetaReplaced {
            entity,
            key: key.to_string(),
            values: values.clone(),
        })?;
        live.entry(entity).or_default().insert(key.to_string(), values);
        Ok(())
    }

    /// Appends one value to `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal append fails.
    pub fn add(&self, entity: EntityId, key: &str, value: Value) -> CoreResult<()> {
        let mut live = self.live.write();
        let mut values = live
            .get(&entity)
            .and_then(|meta| meta.get(key))
            .cloned()
            .unwrap_or_default();
        values.push(value);
        self.journal.append(&JournalRecord::MetaReplaced {
            entity,
            key: key.to_string(),
            values: values.clone(),
        })?;
        live.entry(entity).or_default().insert(key.to_string(), values);
        Ok(())
    }

    /// Removes all values of `key`.
    ///
    /// Deleting an absent key writes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal append fails.
    pub fn delete(&self, entity: EntityId, key: &str) -> CoreResult<()> {
        let mut live = self.live.write();
        let present = live.get(&entity).is_some_and(|meta| meta.contains_key(key));
        if !present {
            debug!(%entity, key, "delete of absent key ignored");
            return Ok(());
        }
        self.journal.append(&JournalRecord::MetaDeleted {
            entity,
            key: key.to_string(),
        })?;
        remove_key(&mut live, entity, key);
        Ok(())
    }

    /// Copies the given keys of `entity` into a snapshot.
    ///
    /// All keys are read under one read guard, so the copy is consistent
    /// even while other threads write.
    #[must_use]
    pub fn snapshot(&self, entity: EntityId, keys: &[VersionedKey]) -> Snapshot {
        let live = self.live.read();
        let Some(meta) = live.get(&entity) else {
            return Snapshot::empty();
        };
        keys.iter()
            .filter_map(|k| {
                meta.get_key_value(k.name())
                    .map(|(name, values)| (name.clone(), values.clone()))
            })
            .collect()
    }

    /// Number of entities holding at least one key.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.live.read().len()
    }

    pub(crate) fn replay_set(&self, entity: EntityId, key: String, values: Vec<Value>) {
        let mut live = self.live.write();
        if values.is_empty() {
            remove_key(&mut live, entity, &key);
        } else {
            live.entry(entity).or_default().insert(key, values);
        }
    }

    pub(crate) fn replay_delete(&self, entity: EntityId, key: &str) {
        remove_key(&mut self.live.write(), entity, key);
    }
}

fn remove_key(live: &mut HashMap<EntityId, EntityMeta>, entity: EntityId, key: &str) {
    if let Some(meta) = live.get_mut(&entity) {
        meta.remove(key);
        if meta.is_empty() {
            live.remove(&entity);
        }
    }
}

impl std::fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataStore")
            .field("entities", &self.entity_count())
            .finish_non_exhaustive()
    }
}
