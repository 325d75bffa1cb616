//! History command implementation.

use super::{scan_journal, value_to_json};
use metarev_core::journal::{JournalRecord, JournalScan};
use metarev_core::{hex_string, EntityId};
use serde::Serialize;
use std::path::Path;

/// One revision of the entity.
#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    /// Revision ID.
    pub revision: String,
    /// 1-based position in the entity's history.
    pub sequence: u64,
    /// Versioned keys frozen in the revision, with their value counts.
    pub keys: Vec<KeySummary>,
    /// SHA-256 of the snapshot, hex.
    pub fingerprint: String,
    /// Body captured with the revision.
    pub body: serde_json::Value,
}

/// Key stored in a revision.
#[derive(Debug, Serialize)]
pub struct KeySummary {
    /// Metadata key.
    pub key: String,
    /// Number of values held.
    pub values: usize,
}

/// Runs the history command.
pub fn run(path: &Path, entity: EntityId, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let scan = scan_journal(path)?;
    let entries = collect(&scan, entity);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        _ => {
            print_text_output(entity, &entries);
        }
    }

    Ok(())
}

fn collect(scan: &JournalScan, entity: EntityId) -> Vec<HistoryEntry> {
    let mut entries = Vec::new();
    for (_, record) in &scan.records {
        let JournalRecord::RevisionCreated {
            revision,
            parent,
            body,
            snapshot,
            fingerprint,
        } = record
        else {
            continue;
        };
        if *parent != entity {
            continue;
        }
        entries.push(HistoryEntry {
            revision: revision.to_string(),
            sequence: entries.len() as u64 + 1,
            keys: snapshot
                .iter()
                .map(|(key, values)| KeySummary {
                    key: key.to_string(),
                    values: values.len(),
                })
                .collect(),
            fingerprint: hex_string(fingerprint),
            body: value_to_json(body),
        });
    }
    entries
}

fn print_text_output(entity: EntityId, entries: &[HistoryEntry]) {
    println!("Revisions of {entity}: {}", entries.len());
    for entry in entries {
        println!();
        println!("#{} {}", entry.sequence, entry.revision);
        println!("  fingerprint: {}", entry.fingerprint);
        if entry.keys.is_empty() {
            println!("  (no versioned metadata)");
        }
        for key in &entry.keys {
            println!("  {:<16} {} value(s)", key.key, key.values);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::write_journal;
    use metarev_core::Value;

    #[test]
    fn lists_only_the_requested_entity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.journal");
        let post = EntityId::from_u128(1);
        let other = EntityId::from_u128(2);
        write_journal(&path, |v| {
            v.set_meta(post, "gallery", vec![Value::text("a"), Value::text("a")])
                .unwrap();
            v.create_revision(post).unwrap();
            v.create_revision(other).unwrap();
            v.create_revision_with_body(post, Value::text("body")).unwrap();
        });

        let entries = collect(&scan_journal(&path).unwrap(), post);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].revision, "rev:1");
        assert_eq!(entries[1].revision, "rev:3");
        assert_eq!(entries[1].sequence, 2);
        assert_eq!(entries[0].keys[0].values, 2);
        assert_eq!(entries[1].body, "body");
        assert_eq!(entries[0].fingerprint.len(), 64);
    }
}
