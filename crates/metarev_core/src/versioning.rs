//! Versioning facade and journal recovery.

use crate::change::ChangeDetector;
use crate::config::Config;
use crate::diff::{diff_snapshots, FieldDiff};
use crate::draft::{Draft, DraftOverlay};
use crate::entity::{EntityCatalog, EntityId};
use crate::error::{CoreError, CoreResult};
use crate::events::{EventFeed, EventKind, VersioningEvent};
use crate::journal::{Journal, JournalRecord};
use crate::listener::VersioningListener;
use crate::restore::{RestoreCoordinator, RestoreReport};
use crate::revision::{Revision, RevisionEngine};
use crate::snapshot::Snapshot;
use crate::stats::{StatsSnapshot, VersioningStats};
use crate::store::MetadataStore;
use crate::types::{EntityKind, EntityType, RevisionId};
use metarev_codec::Value;
use metarev_storage::{FileBackend, InMemoryBackend, StorageBackend, StorageError};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Builder for a [`Versioning`] engine.
///
/// Listeners are fixed at construction time.
///
/// ```rust
/// use metarev_core::{Config, MetadataKeySet, Versioning};
///
/// let config = Config::new().key_set(MetadataKeySet::new().version("post", ["caption"]));
/// let versioning = Versioning::builder(config).open_in_memory().unwrap();
/// assert_eq!(versioning.revision_count(), 0);
/// ```
pub struct VersioningBuilder {
    config: Config,
    listeners: Vec<Arc<dyn VersioningListener>>,
}

impl VersioningBuilder {
    /// Starts a builder with `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            listeners: Vec::new(),
        }
    }

    /// Registers a listener.
    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn VersioningListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Opens an engine whose journal lives in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn open_in_memory(self) -> CoreResult<Versioning> {
        self.open_with_backend(Box::new(InMemoryBackend::new()))
    }

    /// Opens an engine journaling to the file at `path`.
    ///
    /// The file is created if missing and locked for the lifetime of the
    /// engine.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::JournalLocked`] if another process holds the
    /// file, and any error [`VersioningBuilder::open_with_backend`] returns.
    pub fn open(self, path: &Path) -> CoreResult<Versioning> {
        let backend = FileBackend::open_exclusive(path).map_err(|e| match e {
            StorageError::Locked { path } => CoreError::JournalLocked { path },
            other => CoreError::Storage(other),
        })?;
        self.open_with_backend(Box::new(backend))
    }

    /// Opens an engine over `backend`, replaying whatever it holds.
    ///
    /// A torn final record is discarded with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the journal is
    /// corrupt, or the backend fails.
    pub fn open_with_backend(self, backend: Box<dyn StorageBackend>) -> CoreResult<Versioning> {
        let Self { config, listeners } = self;
        config.validate()?;

        let journal = Arc::new(Journal::new(backend, config.sync_on_write));
        let scan = journal.read_all()?;
        if let Some(offset) = scan.torn_tail {
            warn!(offset, "discarding torn journal tail");
            journal.truncate(offset)?;
        }

        let catalog = Arc::new(EntityCatalog::new(
            config.key_set.clone(),
            config.default_entity_type.clone(),
            Arc::clone(&journal),
        ));
        let store = Arc::new(MetadataStore::new(Arc::clone(&journal)));
        let revisions = Arc::new(RevisionEngine::new(
            Arc::clone(&catalog),
            Arc::clone(&store),
            Arc::clone(&journal),
        ));
        let detector = ChangeDetector::new(
            Arc::clone(&catalog),
            Arc::clone(&store),
            Arc::clone(&revisions),
            config.comparison,
        );
        let restorer = RestoreCoordinator::new(
            Arc::clone(&catalog),
            Arc::clone(&store),
            Arc::clone(&revisions),
        );
        let drafts = DraftOverlay::new(
            Arc::clone(&catalog),
            Arc::clone(&store),
            Arc::clone(&journal),
            config.comparison,
        );

        let versioning = Versioning {
            events: EventFeed::with_max_history(config.event_history),
            config,
            journal,
            catalog,
            store,
            revisions,
            detector,
            restorer,
            drafts,
            stats: VersioningStats::new(),
            listeners,
        };
        let replayed = scan.records.len();
        for (_, record) in scan.records {
            versioning.replay(record);
        }
        if replayed > 0 {
            info!(
                records = replayed,
                revisions = versioning.revision_count(),
                drafts = versioning.draft_count(),
                "journal replayed"
            );
        }
        Ok(versioning)
    }
}

/// The metadata versioning engine.
///
/// Ties the live store, revisions, change detection, restores and drafts
/// together over one journal, and notifies listeners and the event feed
/// after each durable change.
pub struct Versioning {
    config: Config,
    journal: Arc<Journal>,
    catalog: Arc<EntityCatalog>,
    store: Arc<MetadataStore>,
    revisions: Arc<RevisionEngine>,
    detector: ChangeDetector,
    restorer: RestoreCoordinator,
    drafts: DraftOverlay,
    events: EventFeed,
    stats: VersioningStats,
    listeners: Vec<Arc<dyn VersioningListener>>,
}

impl Versioning {
    /// Starts a builder.
    #[must_use]
    pub fn builder(config: Config) -> VersioningBuilder {
        VersioningBuilder::new(config)
    }

    /// Opens an in-memory engine without listeners.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn open_in_memory(config: Config) -> CoreResult<Self> {
        VersioningBuilder::new(config).open_in_memory()
    }

    /// Opens a file-backed engine without listeners.
    ///
    /// # Errors
    ///
    /// See [`VersioningBuilder::open`].
    pub fn open(path: &Path, config: Config) -> CoreResult<Self> {
        VersioningBuilder::new(config).open(path)
    }

    /// Opens an engine over `backend` without listeners.
    ///
    /// # Errors
    ///
    /// See [`VersioningBuilder::open_with_backend`].
    pub fn open_with_backend(config: Config, backend: Box<dyn StorageBackend>) -> CoreResult<Self> {
        VersioningBuilder::new(config).open_with_backend(backend)
    }

    fn replay(&self, record: JournalRecord) {
        match record {
            JournalRecord::EntityRegistered {
                entity,
                entity_type,
                kind,
            } => self.catalog.replay_register(entity, entity_type, kind),
            JournalRecord::MetaReplaced {
                entity,
                key,
                values,
            } => self.store.replay_set(entity, key, values),
            JournalRecord::MetaDeleted { entity, key } => self.store.replay_delete(entity, &key),
            JournalRecord::RevisionCreated {
                revision,
                parent,
                body,
                snapshot,
                fingerprint,
            } => self
                .revisions
                .replay(revision, parent, body, snapshot, fingerprint),
            JournalRecord::DraftSaved {
                entity,
                snapshot,
                saves,
            } => self.drafts.replay_saved(entity, snapshot, saves),
            JournalRecord::DraftDiscarded { entity } => self.drafts.replay_discarded(entity),
        }
    }

    fn track<T>(&self, result: CoreResult<T>) -> CoreResult<T> {
        if let Err(err) = &result {
            if err.is_store_failure() {
                self.stats.record_store_failure();
            }
        }
        result
    }

    // === Entities ===

    /// Registers the type and kind of an entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal append fails.
    pub fn register_entity(
        &self,
        entity: EntityId,
        entity_type: impl Into<EntityType>,
        kind: EntityKind,
    ) -> CoreResult<()> {
        self.track(self.catalog.register(entity, entity_type.into(), kind))
    }

    /// Returns the type of `entity` (the default type if unregistered).
    #[must_use]
    pub fn entity_type(&self, entity: EntityId) -> EntityType {
        self.catalog.entity_type(entity)
    }

    /// Returns the entity catalog.
    #[must_use]
    pub fn catalog(&self) -> &EntityCatalog {
        &self.catalog
    }

    // === Live metadata ===

    /// Returns the live values of `key`.
    #[must_use]
    pub fn get_meta(&self, entity: EntityId, key: &str) -> Vec<Value> {
        self.store.get(entity, key)
    }

    /// Returns the first live value of `key`.
    #[must_use]
    pub fn get_single_meta(&self, entity: EntityId, key: &str) -> Option<Value> {
        self.store.get_first(entity, key)
    }

    /// Returns all live metadata of `entity`.
    #[must_use]
    pub fn get_all_meta(&self, entity: EntityId) -> BTreeMap<String, Vec<Value>> {
        self.store.get_all(entity)
    }

    /// Replaces the live values of `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal append fails.
    pub fn set_meta(&self, entity: EntityId, key: &str, values: Vec<Value>) -> CoreResult<()> {
        self.track(self.store.set(entity, key, values))?;
        self.stats.record_metadata_write();
        Ok(())
    }

    /// Appends a live value to `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal append fails.
    pub fn add_meta(&self, entity: EntityId, key: &str, value: Value) -> CoreResult<()> {
        self.track(self.store.add(entity, key, value))?;
        self.stats.record_metadata_write();
        Ok(())
    }

    /// Deletes the live values of `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal append fails.
    pub fn delete_meta(&self, entity: EntityId, key: &str) -> CoreResult<()> {
        self.track(self.store.delete(entity, key))?;
        self.stats.record_metadata_write();
        Ok(())
    }

    /// Returns the live metadata store.
    #[must_use]
    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    // === Revisions ===

    /// Freezes the versioned metadata of `entity` into a new revision.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal append fails.
    pub fn create_revision(&self, entity: EntityId) -> CoreResult<RevisionId> {
        self.create_revision_with_body(entity, Value::Null)
    }

    /// Freezes versioned metadata together with a document body.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal append fails.
    pub fn create_revision_with_body(&self, entity: EntityId, body: Value) -> CoreResult<RevisionId> {
        let revision = self.track(self.revisions.create_revision_with_body(entity, body))?;
        self.revision_created(&revision, EventKind::RevisionCreated(revision.id));
        Ok(revision.id)
    }

    fn revision_created(&self, revision: &Revision, kind: EventKind) {
        self.stats.record_revision();
        self.events.emit(revision.parent, kind);
        for listener in &self.listeners {
            listener.revision_created(revision);
        }
    }

    /// Returns true if versioned metadata differs from `last`.
    #[must_use]
    pub fn has_changed(&self, entity: EntityId, last: RevisionId) -> bool {
        self.detector.has_changed(entity, last)
    }

    /// `host_has_changed || has_changed(entity, last)`.
    #[must_use]
    pub fn post_has_changed(&self, host_has_changed: bool, entity: EntityId, last: RevisionId) -> bool {
        self.detector.post_has_changed(host_has_changed, entity, last)
    }

    /// Creates a revision if the host or versioned metadata reports a change.
    ///
    /// Compares against the latest revision of `entity`; an entity without
    /// revisions always gets its first one. Returns the new revision, or
    /// `None` if nothing changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal append fails.
    pub fn save_if_changed(&self, entity: EntityId, host_has_changed: bool) -> CoreResult<Option<RevisionId>> {
        let changed = match self.revisions.latest_for(entity) {
            Some(last) => self.post_has_changed(host_has_changed, entity, last.id),
            None => true,
        };
        if !changed {
            debug!(%entity, "no change since latest revision");
            self.stats.record_skipped_revision();
            return Ok(None);
        }
        self.create_revision(entity).map(Some)
    }

    /// Looks up a revision.
    #[must_use]
    pub fn revision(&self, id: RevisionId) -> Option<Arc<Revision>> {
        self.revisions.revision(id)
    }

    /// Revisions of `entity`, oldest first.
    #[must_use]
    pub fn revisions_for(&self, entity: EntityId) -> Vec<Arc<Revision>> {
        self.revisions.revisions_for(entity)
    }

    /// Newest revision of `entity`.
    #[must_use]
    pub fn latest_revision(&self, entity: EntityId) -> Option<Arc<Revision>> {
        self.revisions.latest_for(entity)
    }

    /// Total number of revisions.
    #[must_use]
    pub fn revision_count(&self) -> usize {
        self.revisions.count()
    }

    // === Restore ===

    /// Makes the metadata of `revision` live again for `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RestoreIncomplete`] if some keys could not be
    /// written; the remaining keys are restored regardless.
    pub fn restore(&self, entity: EntityId, revision: RevisionId) -> CoreResult<RestoreReport> {
        match self.restorer.restore(entity, revision) {
            Ok(report) => {
                if report.found {
                    self.stats.record_restore(0);
                    self.events.emit(entity, EventKind::Restored(revision));
                    for listener in &self.listeners {
                        listener.restored(entity, &report);
                    }
                }
                Ok(report)
            }
            Err(err) => {
                if let CoreError::RestoreIncomplete { report, .. } = &err {
                    self.stats.record_restore(report.failed.len());
                }
                self.track(Err(err))
            }
        }
    }

    // === Drafts ===

    /// Records an autosave; returns the versioned keys whose draft changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal append fails.
    pub fn save_draft(&self, entity: EntityId, candidates: &BTreeMap<String, Value>) -> CoreResult<Vec<String>> {
        let Some(saved) = self.track(self.drafts.save_draft(entity, candidates))? else {
            return Ok(Vec::new());
        };
        self.stats.record_draft_save();
        self.events.emit(entity, EventKind::DraftSaved);
        for listener in &self.listeners {
            listener.draft_saved(&saved.draft, &saved.changed);
        }
        Ok(saved.changed)
    }

    /// Reads `key` with draft values substituted for live ones.
    #[must_use]
    pub fn read_with_preview(&self, entity: EntityId, key: &str) -> Vec<Value> {
        self.stats.record_preview_read();
        self.drafts.read_with_preview(entity, key)
    }

    /// First value of [`Versioning::read_with_preview`].
    #[must_use]
    pub fn read_single_with_preview(&self, entity: EntityId, key: &str) -> Option<Value> {
        self.stats.record_preview_read();
        self.drafts.read_single_with_preview(entity, key)
    }

    /// Discards the draft of `entity`. Returns false if there was none.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal append fails.
    pub fn discard_draft(&self, entity: EntityId) -> CoreResult<bool> {
        let discarded = self.track(self.drafts.discard(entity))?;
        if discarded {
            self.events.emit(entity, EventKind::DraftDiscarded);
            for listener in &self.listeners {
                listener.draft_discarded(entity);
            }
        }
        Ok(discarded)
    }

    /// Writes the draft into live metadata, ends it, and freezes a revision.
    ///
    /// Only keys the draft holds are written. Returns `None` if `entity` has
    /// no draft.
    ///
    /// # Errors
    ///
    /// Returns an error if any journal append fails. Keys written before the
    /// failure stay written and the draft is kept.
    pub fn promote_draft(&self, entity: EntityId) -> CoreResult<Option<RevisionId>> {
        let Some(draft) = self.drafts.draft(entity) else {
            debug!(%entity, "no draft to promote");
            return Ok(None);
        };
        for (key, values) in draft.snapshot.iter() {
            self.set_meta(entity, key, values.to_vec())?;
        }
        self.track(self.drafts.discard(entity))?;
        let revision = self.track(self.revisions.create_revision(entity))?;
        info!(%entity, revision = %revision.id, keys = draft.snapshot.len(), "draft promoted");
        self.revision_created(&revision, EventKind::DraftPromoted(revision.id));
        Ok(Some(revision.id))
    }

    /// Returns a copy of the draft of `entity`.
    #[must_use]
    pub fn draft(&self, entity: EntityId) -> Option<Draft> {
        self.drafts.draft(entity)
    }

    /// Number of entities with an active draft.
    #[must_use]
    pub fn draft_count(&self) -> usize {
        self.drafts.count()
    }

    // === Diff inputs ===

    /// Live versioned metadata of `entity`, for a diff renderer.
    #[must_use]
    pub fn snapshot_for_diff(&self, entity: EntityId) -> Snapshot {
        self.store
            .snapshot(entity, self.catalog.versioned_keys(entity))
    }

    /// Snapshot stored with `revision`.
    #[must_use]
    pub fn revision_snapshot(&self, revision: RevisionId) -> Option<Arc<Snapshot>> {
        self.revisions
            .revision(revision)
            .map(|rev| Arc::clone(&rev.snapshot))
    }

    /// Differences between two revisions of the same entity.
    ///
    /// With `from == None` the left side is empty. Returns nothing if `to`
    /// is unknown.
    #[must_use]
    pub fn diff_revisions(&self, from: Option<RevisionId>, to: RevisionId) -> Vec<FieldDiff> {
        let Some(to) = self.revisions.revision(to) else {
            return Vec::new();
        };
        let from = from
            .and_then(|id| self.revisions.revision(id))
            .map_or_else(Snapshot::empty, |rev| rev.snapshot.as_ref().clone());
        diff_snapshots(self.catalog.versioned_keys(to.parent), &from, &to.snapshot)
    }

    /// Differences between `revision` and the live metadata of its entity.
    #[must_use]
    pub fn diff_with_live(&self, revision: RevisionId) -> Vec<FieldDiff> {
        let Some(rev) = self.revisions.revision(revision) else {
            return Vec::new();
        };
        let live = self.snapshot_for_diff(rev.parent);
        diff_snapshots(self.catalog.versioned_keys(rev.parent), &rev.snapshot, &live)
    }

    // === Events, stats, maintenance ===

    /// Subscribes to future events.
    pub fn subscribe(&self) -> Receiver<VersioningEvent> {
        self.events.subscribe()
    }

    /// Returns up to `limit` events after `cursor`.
    #[must_use]
    pub fn poll_events(&self, cursor: u64, limit: usize) -> Vec<VersioningEvent> {
        self.events.poll(cursor, limit)
    }

    /// Returns a copy of the counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Flushes the journal.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend flush fails.
    pub fn flush(&self) -> CoreResult<()> {
        self.track(self.journal.flush())
    }

    /// Size of the journal in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot report its size.
    pub fn journal_size(&self) -> CoreResult<u64> {
        self.journal.size()
    }
}

impl std::fmt::Debug for Versioning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Versioning")
            .field("entities", &self.catalog.len())
            .field("revisions", &self.revision_count())
            .field("drafts", &self.draft_count())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Drop for Versioning {
    fn drop(&mut self) {
        let _ = self.journal.flush();
    }
}
