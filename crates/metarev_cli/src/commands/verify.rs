//! Verify command implementation.

use super::scan_journal;
use metarev_core::journal::{JournalRecord, JournalScan};
use std::path::Path;
use tracing::warn;

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Number of intact records.
    pub records_checked: usize,
    /// Number of revision fingerprints recomputed.
    pub revisions_checked: usize,
    /// Offset of an incomplete final record, if any.
    pub torn_tail: Option<u64>,
    /// List of errors found.
    pub errors: Vec<String>,
}

impl VerifyResult {
    fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying journal at {}", path.display());
    println!();

    let result = match scan_journal(path) {
        Ok(scan) => check_revisions(&scan),
        Err(e) => VerifyResult {
            errors: vec![e.to_string()],
            ..VerifyResult::default()
        },
    };
    print_result(&result);

    println!();
    if result.is_ok() {
        println!("✓ Journal verification passed");
        Ok(())
    } else {
        println!("✗ Journal verification failed");
        Err("Verification failed".into())
    }
}

fn check_revisions(scan: &JournalScan) -> VerifyResult {
    let mut result = VerifyResult {
        records_checked: scan.records.len(),
        torn_tail: scan.torn_tail,
        ..VerifyResult::default()
    };

    for (offset, record) in &scan.records {
        let JournalRecord::RevisionCreated {
            revision,
            snapshot,
            fingerprint,
            ..
        } = record
        else {
            continue;
        };
        result.revisions_checked += 1;
        match snapshot.fingerprint() {
            Ok(computed) if computed == *fingerprint => {}
            Ok(_) => {
                warn!(%revision, offset, "fingerprint mismatch");
                result.errors.push(format!(
                    "Fingerprint mismatch for {revision} at offset {offset}"
                ));
            }
            Err(e) => result.errors.push(format!(
                "Cannot fingerprint {revision} at offset {offset}: {e}"
            )),
        }
    }
    result
}

fn print_result(result: &VerifyResult) {
    println!("  Records checked:   {}", result.records_checked);
    println!("  Revisions checked: {}", result.revisions_checked);
    if let Some(offset) = result.torn_tail {
        println!("  Incomplete record at offset {offset} (discarded on next open)");
    }
    for error in &result.errors {
        println!("  ERROR: {error}");
    }
}
