//! Raw inputs for an external diff renderer.

use crate::keys::VersionedKey;
use crate::snapshot::Snapshot;
use metarev_codec::Value;

/// One versioned key whose value sequence differs between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDiff {
    /// Metadata key.
    pub key: String,
    /// Display label of the key.
    pub label: String,
    /// Values on the left side (empty if absent).
    pub from: Vec<Value>,
    /// Values on the right side (empty if absent).
    pub to: Vec<Value>,
}

/// Lists the keys of `keys` whose sequences differ, in key order.
///
/// Sequences are compared strictly. Values are passed through as-is; how
/// multi-valued keys are flattened for display is up to the renderer.
#[must_use]
pub fn diff_snapshots(keys: &[VersionedKey], from: &Snapshot, to: &Snapshot) -> Vec<FieldDiff> {
    keys.iter()
        .filter(|key| from.get(key.name()) != to.get(key.name()))
        .map(|key| FieldDiff {
            key: key.name().to_string(),
            label: key.label().to_string(),
            from: from.get(key.name()).to_vec(),
            to: to.get(key.name()).to_vec(),
        })
        .collect()
}
