//! Dump journal command implementation.

use super::{scan_journal, value_to_json};
use metarev_core::hex_string;
use metarev_core::journal::{JournalRecord, JournalScan};
use serde::Serialize;
use serde_json::json;
use std::path::Path;

/// Journal record representation for output.
#[derive(Debug, Serialize)]
pub struct RecordInfo {
    /// Offset in the journal file.
    pub offset: u64,
    /// Record type name.
    pub record_type: &'static str,
    /// Entity the record is about.
    pub entity: String,
    /// Record-specific fields.
    pub detail: serde_json::Value,
}

/// Runs the dump-journal command.
pub fn run(path: &Path, limit: Option<usize>, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let scan = scan_journal(path)?;
    let records = describe(&scan, limit);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        _ => {
            print_text_output(&records, scan.torn_tail);
        }
    }

    Ok(())
}

fn describe(scan: &JournalScan, limit: Option<usize>) -> Vec<RecordInfo> {
    scan.records
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|(offset, record)| RecordInfo {
            offset: *offset,
            record_type: record.record_type().name(),
            entity: record.entity().to_string(),
            detail: detail(record),
        })
        .collect()
}

fn detail(record: &JournalRecord) -> serde_json::Value {
    match record {
        JournalRecord::EntityRegistered {
            entity_type, kind, ..
        } => json!({ "type": entity_type.as_str(), "kind": format!("{kind:?}") }),
        JournalRecord::MetaReplaced { key, values, .. } => json!({
            "key": key,
            "values": values.iter().map(value_to_json).collect::<Vec<_>>(),
        }),
        JournalRecord::MetaDeleted { key, .. } => json!({ "key": key }),
        JournalRecord::RevisionCreated {
            revision,
            snapshot,
            fingerprint,
            ..
        } => json!({
            "revision": revision.to_string(),
            "keys": snapshot.keys().collect::<Vec<_>>(),
            "fingerprint": hex_string(fingerprint),
        }),
        JournalRecord::DraftSaved { snapshot, saves, .. } => json!({
            "keys": snapshot.keys().collect::<Vec<_>>(),
            "saves": saves,
        }),
        JournalRecord::DraftDiscarded { .. } => json!({}),
    }
}

fn print_text_output(records: &[RecordInfo], torn_tail: Option<u64>) {
    println!("{:>10}  {:<18}  {:<36}  DETAIL", "OFFSET", "TYPE", "ENTITY");
    for record in records {
        println!(
            "{:>10}  {:<18}  {:<36}  {}",
            record.offset, record.record_type, record.entity, record.detail
        );
    }
    println!();
    println!("{} record(s)", records.len());
    if let Some(offset) = torn_tail {
        println!("Incomplete record at offset {offset}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::write_journal;
    use metarev_core::{EntityId, EntityKind, Value};

    #[test]
    fn describes_records_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.journal");
        let post = EntityId::from_u128(1);
        write_journal(&path, |v| {
            v.register_entity(post, "post", EntityKind::Live).unwrap();
            v.set_meta(post, "caption", vec![Value::Bytes(vec![1, 2])])
                .unwrap();
            v.delete_meta(post, "caption").unwrap();
        });

        let scan = scan_journal(&path).unwrap();
        let records = describe(&scan, None);
        let types: Vec<&str> = records.iter().map(|r| r.record_type).collect();
        assert_eq!(types, ["entity-registered", "meta-replaced", "meta-deleted"]);
        assert_eq!(records[0].offset, 0);
        assert_eq!(records[1].detail["values"][0], "0102");
        assert_eq!(records[2].entity, post.to_string());

        assert_eq!(describe(&scan, Some(1)).len(), 1);
    }
}
