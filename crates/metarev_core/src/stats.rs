//! Versioning statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for versioning activity.
///
/// All counters are atomic and can be read while operations are in progress.
#[derive(Debug, Default)]
pub struct VersioningStats {
    revisions_created: AtomicU64,
    revisions_skipped: AtomicU64,
    restores: AtomicU64,
    restore_key_failures: AtomicU64,
    drafts_saved: AtomicU64,
    preview_reads: AtomicU64,
    metadata_writes: AtomicU64,
    store_failures: AtomicU64,
}

impl VersioningStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_revision(&self) {
        self.revisions_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped_revision(&self) {
        self.revisions_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_restore(&self, failed_keys: usize) {
        self.restores.fetch_add(1, Ordering::Relaxed);
        self.restore_key_failures
            .fetch_add(failed_keys as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_draft_save(&self) {
        self.drafts_saved.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_preview_read(&self) {
        self.preview_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_metadata_write(&self) {
        self.metadata_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a plain copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            revisions_created: self.revisions_created.load(Ordering::Relaxed),
            revisions_skipped: self.revisions_skipped.load(Ordering::Relaxed),
            restores: self.restores.load(Ordering::Relaxed),
            restore_key_failures: self.restore_key_failures.load(Ordering::Relaxed),
            drafts_saved: self.drafts_saved.load(Ordering::Relaxed),
            preview_reads: self.preview_reads.load(Ordering::Relaxed),
            metadata_writes: self.metadata_writes.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`VersioningStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Revisions created.
    pub revisions_created: u64,
    /// Saves that created no revision because nothing changed.
    pub revisions_skipped: u64,
    /// Restores of a known revision.
    pub restores: u64,
    /// Keys that failed to restore.
    pub restore_key_failures: u64,
    /// Draft saves.
    pub drafts_saved: u64,
    /// Preview reads.
    pub preview_reads: u64,
    /// Live metadata writes and deletes.
    pub metadata_writes: u64,
    /// Operations that failed on the backing store.
    pub store_failures: u64,
}
