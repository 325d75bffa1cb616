//! CLI command implementations.

pub mod dump_journal;
pub mod history;
pub mod inspect;
pub mod verify;

use metarev_codec::Value;
use metarev_core::hex_string;
use metarev_core::journal::{Journal, JournalScan};
use metarev_storage::FileBackend;
use std::path::Path;
use tracing::debug;

/// Reads every record of the journal at `path` without modifying it.
pub(crate) fn scan_journal(path: &Path) -> Result<JournalScan, Box<dyn std::error::Error>> {
    if !path.is_file() {
        return Err(format!("No journal found at {}", path.display()).into());
    }
    let backend = FileBackend::open(path)?;
    let scan = Journal::new(Box::new(backend), false).read_all()?;
    debug!(
        path = %path.display(),
        records = scan.records.len(),
        torn_tail = ?scan.torn_tail,
        "journal scanned"
    );
    Ok(scan)
}

/// Converts a metadata value to JSON for display.
///
/// Bytes become lowercase hex strings. Map keys that are not text are
/// rendered as their compact JSON form.
pub(crate) fn value_to_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as Json;
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Integer(n) => Json::from(*n),
        Value::Bytes(b) => Json::String(hex_string(b)),
        Value::Text(s) => Json::String(s.clone()),
        Value::Array(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Map(pairs) => Json::Object(
            pairs
                .iter()
                .map(|(k, v)| {
                    let key = match k {
                        Value::Text(s) => s.clone(),
                        other => value_to_json(other).to_string(),
                    };
                    (key, value_to_json(v))
                })
                .collect(),
        ),
    }
}

pub(crate) fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes}")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use metarev_core::{Config, MetadataKeySet, Versioning};
    use std::path::Path;

    pub fn config() -> Config {
        Config::new()
            .key_set(MetadataKeySet::new().version("post", ["caption", "gallery"]))
            .default_entity_type("post")
    }

    /// Opens an engine on `path`, runs `f`, and closes it again.
    pub fn write_journal(path: &Path, f: impl FnOnce(&Versioning)) {
        let versioning = Versioning::open(path, config()).unwrap();
        f(&versioning);
    }
}
