//! Registry of entity types and kinds.

use crate::entity::EntityId;
use crate::error::CoreResult;
use crate::journal::{Journal, JournalRecord};
use crate::keys::{MetadataKeySet, VersionedKey};
use crate::types::{EntityKind, EntityType};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// What the catalog knows about one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRecord {
    /// Type tag selecting the versioned keys.
    pub entity_type: EntityType,
    /// Live document or revision.
    pub kind: EntityKind,
}

/// Resolves entities to their type and versioned keys.
///
/// Entities the host never registered resolve to the default type and are
/// treated as live.
pub struct EntityCatalog {
    key_set: MetadataKeySet,
    default_type: EntityType,
    entities: RwLock<HashMap<EntityId, EntityRecord>>,
    journal: Arc<Journal>,
}

impl EntityCatalog {
    pub(crate) fn new(key_set: MetadataKeySet, default_type: EntityType, journal: Arc<Journal>) -> Self {
        Self {
            key_set,
            default_type,
            entities: RwLock::new(HashMap::new()),
            journal,
        }
    }

    /// Registers or re-registers an entity.
    ///
    /// Registering an entity again with the same type and kind writes
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal append fails; the catalog is left
    /// unchanged in that case.
    pub fn register(&self, entity: EntityId, entity_type: EntityType, kind: EntityKind) -> CoreResult<()> {
        let record = EntityRecord { entity_type, kind };
        let mut entities = self.entities.write();
        if entities.get(&entity) == Some(&record) {
            return Ok(());
        }
        self.journal.append(&JournalRecord::EntityRegistered {
            entity,
            entity_type: record.entity_type.clone(),
            kind,
        })?;
        debug!(%entity, entity_type = %record.entity_type, ?kind, "entity registered");
        entities.insert(entity, record);
        Ok(())
    }

    /// Returns the type of `entity`, falling back to the default type.
    #[must_use]
    pub fn entity_type(&self, entity: EntityId) -> EntityType {
        self.entities
            .read()
            .get(&entity)
            .map_or_else(|| self.default_type.clone(), |r| r.entity_type.clone())
    }

    /// Returns true if `entity` was registered as a revision.
    #[must_use]
    pub fn is_revision(&self, entity: EntityId) -> bool {
        self.entities
            .read()
            .get(&entity)
            .is_some_and(|r| r.kind == EntityKind::Revision)
    }

    /// Returns the versioned keys for `entity`, in configuration order.
    #[must_use]
    pub fn versioned_keys(&self, entity: EntityId) -> &[VersionedKey] {
        let entity_type = self.entity_type(entity);
        self.key_set.keys_for(entity_type.as_str())
    }

    /// Returns true if `key` is versioned for `entity`.
    #[must_use]
    pub fn is_versioned(&self, entity: EntityId, key: &str) -> bool {
        self.versioned_keys(entity).iter().any(|k| k.name() == key)
    }

    /// Returns the key set the catalog resolves against.
    #[must_use]
    pub fn key_set(&self) -> &MetadataKeySet {
        &self.key_set
    }

    /// Number of registered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }

    pub(crate) fn replay_register(&self, entity: EntityId, entity_type: EntityType, kind: EntityKind) {
        self.entities
            .write()
            .insert(entity, EntityRecord { entity_type, kind });
    }
}

impl std::fmt::Debug for EntityCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityCatalog")
            .field("default_type", &self.default_type)
            .field("entities", &self.len())
            .finish_non_exhaustive()
    }
}
