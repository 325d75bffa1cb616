//! Typed callbacks for hosts that react to versioning.

use crate::draft::Draft;
use crate::entity::EntityId;
use crate::restore::RestoreReport;
use crate::revision::Revision;

/// Receives versioning callbacks.
///
/// Listeners are registered on the
/// [`VersioningBuilder`](crate::VersioningBuilder) and called synchronously
/// after the change is durable. Every method defaults to doing nothing.
pub trait VersioningListener: Send + Sync {
    /// A revision was created.
    fn revision_created(&self, _revision: &Revision) {}

    /// Live metadata of `entity` was restored.
    fn restored(&self, _entity: EntityId, _report: &RestoreReport) {}

    /// A draft was saved; `changed` lists the keys that differed.
    fn draft_saved(&self, _draft: &Draft, _changed: &[String]) {}

    /// The draft of `entity` was discarded.
    fn draft_discarded(&self, _entity: EntityId) {}
}
