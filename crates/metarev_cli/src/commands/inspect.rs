//! Inspect command implementation.

use super::{format_size, scan_journal};
use metarev_core::journal::{JournalRecord, JournalScan};
use metarev_core::EntityId;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Journal inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Journal path.
    pub path: String,
    /// Journal size in bytes.
    pub journal_size: u64,
    /// Number of intact records.
    pub record_count: usize,
    /// Record counts keyed by record type name.
    pub records_by_type: BTreeMap<&'static str, usize>,
    /// Entities mentioned by any record.
    pub entity_count: usize,
    /// Entities registered with a type.
    pub registered_entities: usize,
    /// Revisions created.
    pub revision_count: usize,
    /// `(entity, key)` pairs holding live values after replay.
    pub live_keys: usize,
    /// Entities with an open draft after replay.
    pub active_drafts: usize,
    /// Offset of an incomplete final record, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub torn_tail: Option<u64>,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let journal_size = std::fs::metadata(path)?.len();
    let scan = scan_journal(path)?;
    let result = analyze(path, journal_size, &scan);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn analyze(path: &Path, journal_size: u64, scan: &JournalScan) -> InspectResult {
    let mut records_by_type = BTreeMap::new();
    let mut entities = HashSet::new();
    let mut registered = HashSet::new();
    let mut live: HashSet<(EntityId, &str)> = HashSet::new();
    let mut drafts = HashSet::new();
    let mut revision_count = 0;

    for (_, record) in &scan.records {
        *records_by_type.entry(record.record_type().name()).or_insert(0) += 1;
        entities.insert(record.entity());
        match record {
            JournalRecord::EntityRegistered { entity, .. } => {
                registered.insert(*entity);
            }
            JournalRecord::MetaReplaced { entity, key, .. } => {
                live.insert((*entity, key.as_str()));
            }
            JournalRecord::MetaDeleted { entity, key } => {
                live.remove(&(*entity, key.as_str()));
            }
            JournalRecord::RevisionCreated { .. } => revision_count += 1,
            JournalRecord::DraftSaved { entity, .. } => {
                drafts.insert(*entity);
            }
            JournalRecord::DraftDiscarded { entity } => {
                drafts.remove(entity);
            }
        }
    }

    InspectResult {
        path: path.display().to_string(),
        journal_size,
        record_count: scan.records.len(),
        records_by_type,
        entity_count: entities.len(),
        registered_entities: registered.len(),
        revision_count,
        live_keys: live.len(),
        active_drafts: drafts.len(),
        torn_tail: scan.torn_tail,
    }
}

fn print_text_output(result: &InspectResult) {
    println!("metarev Journal Inspection");
    println!("==========================");
    println!();
    println!("Path: {}", result.path);
    println!("Size: {} bytes", format_size(result.journal_size));
    println!();
    println!("Records: {}", result.record_count);
    for (name, count) in &result.records_by_type {
        println!("  {name:<18} {count}");
    }
    println!();
    println!("State after replay:");
    println!("  Entities:       {}", result.entity_count);
    println!("  Registered:     {}", result.registered_entities);
    println!("  Revisions:      {}", result.revision_count);
    println!("  Live keys:      {}", result.live_keys);
    println!("  Active drafts:  {}", result.active_drafts);

    if let Some(offset) = result.torn_tail {
        println!();
        println!("Incomplete record at offset {offset} (discarded on next open)");
    }
}
