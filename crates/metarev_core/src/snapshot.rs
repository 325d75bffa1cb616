//! Immutable point-in-time metadata snapshots.

use crate::error::CoreResult;
use metarev_codec::{encode_value, CodecError, CodecResult, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// An immutable mapping from metadata key to its ordered values.
///
/// Snapshots are built once and never mutated; revisions and drafts own
/// their snapshot outright, so later writes to live metadata cannot reach
/// into a stored snapshot. Keys whose sequence is empty are not stored:
/// an absent key and an empty key read the same.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: BTreeMap<String, Vec<Value>>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a snapshot, dropping keys with no values.
    #[must_use]
    pub fn from_entries(entries: BTreeMap<String, Vec<Value>>) -> Self {
        let entries = entries
            .into_iter()
            .filter(|(_, values)| !values.is_empty())
            .collect();
        Self { entries }
    }

    /// Returns the values stored under `key` (empty if absent).
    #[must_use]
    pub fn get(&self, key: &str) -> &[Value] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns true if `key` holds at least one value.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates `(key, values)` pairs in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of keys holding values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no key holds a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of values across all keys.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Returns a copy of the underlying map.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, Vec<Value>> {
        self.entries.clone()
    }

    /// Converts to a CBOR-shaped value: a map of key text to value array.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Map(
            self.entries
                .iter()
                .map(|(k, v)| (Value::text(k.as_str()), Value::Array(v.clone())))
                .collect(),
        )
    }

    /// Inverse of [`Snapshot::to_value`].
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is not a map of text keys to arrays.
    pub fn from_value(value: Value) -> CodecResult<Self> {
        let Value::Map(pairs) = value else {
            return Err(CodecError::unexpected_shape("snapshot map"));
        };
        let mut entries = BTreeMap::new();
        for (key, values) in pairs {
            match (key, values) {
                (Value::Text(key), Value::Array(values)) => {
                    entries.insert(key, values);
                }
                _ => return Err(CodecError::unexpected_shape("text key with value array")),
            }
        }
        Ok(Self::from_entries(entries))
    }

    /// SHA-256 over the CBOR encoding of this snapshot.
    ///
    /// Equal snapshots always have equal fingerprints.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn fingerprint(&self) -> CoreResult<[u8; 32]> {
        let bytes = encode_value(&self.to_value())?;
        let digest = Sha256::digest(&bytes);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Ok(out)
    }
}

impl FromIterator<(String, Vec<Value>)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, Vec<Value>)>>(iter: I) -> Self {
        Self::from_entries(iter.into_iter().collect())
    }
}

/// Renders bytes as lowercase hex. Used for fingerprints and byte values.
#[must_use]
pub fn hex_string(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        [
            ("caption".to_string(), vec![Value::text("harbour")]),
            (
                "gallery".to_string(),
                vec![Value::text("img1"), Value::text("img1"), Value::text("img2")],
            ),
            ("empty".to_string(), vec![]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn empty_sequences_are_dropped() {
        let snap = sample();
        assert_eq!(snap.len(), 2);
        assert!(!snap.contains_key("empty"));
        assert!(snap.get("empty").is_empty());
        assert!(snap.get("missing").is_empty());
    }

    #[test]
    fn duplicates_and_order_are_kept() {
        let snap = sample();
        assert_eq!(
            snap.get("gallery"),
            &[Value::text("img1"), Value::text("img1"), Value::text("img2")]
        );
        assert_eq!(snap.value_count(), 4);
    }

    #[test]
    fn value_form_roundtrip() {
        let snap = sample();
        assert_eq!(Snapshot::from_value(snap.to_value()).unwrap(), snap);
        assert!(Snapshot::from_value(Value::Integer(1)).is_err());
        assert!(Snapshot::from_value(Value::map(vec![(
            Value::Integer(1),
            Value::Array(vec![])
        )]))
        .is_err());
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = sample();
        let b = sample();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());

        let reordered: Snapshot = [(
            "gallery".to_string(),
            vec![Value::text("img2"), Value::text("img1"), Value::text("img1")],
        )]
        .into_iter()
        .collect();
        assert_ne!(a.fingerprint().unwrap(), reordered.fingerprint().unwrap());
        assert_eq!(hex_string(&a.fingerprint().unwrap()).len(), 64);
        assert_eq!(hex_string(&[0, 171]), "00ab");
    }
}
