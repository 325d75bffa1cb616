//! Journal replay, torn tails, corruption and store failures.

use metarev_core::{CoreError, EntityId, EntityKind, Value, Versioning};
use metarev_storage::{InMemoryBackend, StorageBackend};
use metarev_testkit::prelude::*;
use std::collections::BTreeMap;

fn texts(items: &[&str]) -> Vec<Value> {
    items.iter().map(|s| Value::text(*s)).collect()
}

fn open(backend: &InMemoryBackend) -> Result<Versioning, CoreError> {
    Versioning::open_with_backend(sample_config(), Box::new(backend.clone()))
}

#[test]
fn reopen_restores_every_component() {
    let t = TestVersioning::memory(sample_config());
    let post = EntityId::from_u128(1);
    let rev_entity = EntityId::from_u128(2);
    t.register_entity(rev_entity, "post", EntityKind::Revision).unwrap();
    t.set_meta(post, "gallery", texts(&["img1", "img1", "img2"])).unwrap();
    t.set_meta(post, "_internal", texts(&["x"])).unwrap();
    let rev = t.create_revision_with_body(post, Value::text("<p>v1</p>")).unwrap();
    t.set_meta(post, "gallery", texts(&["img3"])).unwrap();
    t.delete_meta(post, "_internal").unwrap();

    let mut draft = BTreeMap::new();
    draft.insert("caption".to_string(), Value::text("wip"));
    t.save_draft(post, &draft).unwrap();

    let t = t.reopen();
    assert_eq!(t.get_meta(post, "gallery"), texts(&["img3"]));
    assert!(t.get_meta(post, "_internal").is_empty());
    assert!(t.catalog().is_revision(rev_entity));

    let revision = t.revision(rev).unwrap();
    assert_eq!(revision.body, Value::text("<p>v1</p>"));
    assert_eq!(revision.snapshot.get("gallery"), texts(&["img1", "img1", "img2"]));
    assert_eq!(
        revision.fingerprint,
        revision.snapshot.fingerprint().unwrap()
    );
    assert_eq!(
        t.read_single_with_preview(post, "caption"),
        Some(Value::text("wip"))
    );
    assert_eq!(t.draft(post).unwrap().saves, 1);

    // New revisions continue after the replayed ones.
    let next = t.create_revision(post).unwrap();
    assert!(next > rev);
    assert_eq!(t.latest_revision(post).unwrap().sequence, 2);
}

#[test]
fn discarded_draft_stays_discarded() {
    let t = TestVersioning::memory(sample_config());
    let post = EntityId::from_u128(1);
    let mut draft = BTreeMap::new();
    draft.insert("tags".to_string(), Value::text("t"));
    t.save_draft(post, &draft).unwrap();
    assert!(t.discard_draft(post).unwrap());
    assert!(!t.discard_draft(post).unwrap());

    let t = t.reopen();
    assert!(t.draft(post).is_none());
    assert_eq!(t.draft_count(), 0);
}

#[test]
fn file_journal_survives_reopen() {
    let t = TestVersioning::file(sample_config());
    let post = EntityId::from_u128(1);
    t.set_meta(post, "caption", texts(&["on disk"])).unwrap();
    let rev = t.create_revision(post).unwrap();
    t.set_meta(post, "caption", texts(&["changed"])).unwrap();

    let t = t.reopen();
    assert!(t.has_changed(post, rev));
    t.restore(post, rev).unwrap();
    assert_eq!(t.get_meta(post, "caption"), texts(&["on disk"]));
}

#[test]
fn second_open_of_file_journal_is_locked() {
    let t = TestVersioning::file(sample_config());
    let path = t.path().unwrap().to_path_buf();
    let err = Versioning::open(&path, sample_config()).unwrap_err();
    assert!(matches!(err, CoreError::JournalLocked { .. }));

    drop(t);
}

#[test]
fn torn_tail_is_discarded() {
    let backend = InMemoryBackend::new();
    let post = EntityId::from_u128(1);
    let clean_size = {
        let v = open(&backend).unwrap();
        v.set_meta(post, "caption", texts(&["kept"])).unwrap();
        v.journal_size().unwrap()
    };

    let mut writer = backend.clone();
    writer.append(b"MREV\x01\x00\x02").unwrap();

    let v = open(&backend).unwrap();
    assert_eq!(v.get_meta(post, "caption"), texts(&["kept"]));
    assert_eq!(v.journal_size().unwrap(), clean_size);

    v.set_meta(post, "caption", texts(&["after"])).unwrap();
    drop(v);
    let v = open(&backend).unwrap();
    assert_eq!(v.get_meta(post, "caption"), texts(&["after"]));
}

#[test]
fn corrupted_record_refuses_to_open() {
    let backend = InMemoryBackend::new();
    {
        let v = open(&backend).unwrap();
        v.set_meta(EntityId::from_u128(1), "caption", texts(&["c"])).unwrap();
    }
    let last = backend.data().len() - 1;
    let byte = backend.data()[last];
    assert!(backend.corrupt_byte(last, byte ^ 0xff));

    let err = open(&backend).unwrap_err();
    assert!(matches!(err, CoreError::JournalCorruption { offset: 0, .. }));
}

#[test]
fn foreign_bytes_refuse_to_open() {
    let backend = InMemoryBackend::with_data(b"not a journal at all".to_vec());
    let err = open(&backend).unwrap_err();
    assert!(matches!(err, CoreError::JournalCorruption { .. }));
}

#[test]
fn failed_write_leaves_state_unchanged() {
    let (t, switch) = TestVersioning::memory_with_faults(sample_config());
    let post = EntityId::from_u128(1);
    t.set_meta(post, "caption", texts(&["before"])).unwrap();

    switch.reject_appends();
    let err = t.set_meta(post, "caption", texts(&["after"])).unwrap_err();
    assert!(err.is_store_failure());
    assert!(t.create_revision(post).is_err());
    assert_eq!(t.get_meta(post, "caption"), texts(&["before"]));
    assert_eq!(t.revision_count(), 0);
    assert_eq!(t.stats().store_failures, 2);

    switch.heal();
    t.set_meta(post, "caption", texts(&["after"])).unwrap();
    assert_eq!(switch.rejected(), 2);
}

#[test]
fn partial_restore_reports_failed_keys() {
    let (t, switch) = TestVersioning::memory_with_faults(sample_config());
    let post = EntityId::from_u128(1);
    t.set_meta(post, "caption", texts(&["c1"])).unwrap();
    t.set_meta(post, "gallery", texts(&["g1"])).unwrap();
    t.set_meta(post, "tags", texts(&["t1"])).unwrap();
    let rev = t.create_revision(post).unwrap();
    t.set_meta(post, "caption", texts(&["c2"])).unwrap();
    t.set_meta(post, "gallery", texts(&["g2"])).unwrap();
    t.set_meta(post, "tags", texts(&["t2"])).unwrap();

    // caption goes through, gallery is rejected, tags goes through
    switch.fail_once_after(1);
    let err = t.restore(post, rev).unwrap_err();
    let CoreError::RestoreIncomplete { report, .. } = err else {
        panic!("expected an incomplete restore, got {err:?}");
    };
    assert_eq!(report.restored, vec!["caption".to_string(), "tags".to_string()]);
    assert_eq!(report.failed, vec!["gallery".to_string()]);
    assert_eq!(t.get_meta(post, "caption"), texts(&["c1"]));
    assert_eq!(t.get_meta(post, "gallery"), texts(&["g2"]));
    assert_eq!(t.get_meta(post, "tags"), texts(&["t1"]));
    assert_eq!(t.stats().restore_key_failures, 1);

    // a retry finishes the job
    let report = t.restore(post, rev).unwrap();
    assert!(report.is_complete());
    assert!(!t.has_changed(post, rev));
}

#[test]
fn failed_flush_is_not_replayed() {
    let (t, switch) = TestVersioning::memory_with_faults(sample_config());
    let post = EntityId::from_u128(1);
    t.set_meta(post, "caption", texts(&["before"])).unwrap();
    let size = t.journal_size().unwrap();

    switch.reject_flushes();
    let err = t.set_meta(post, "caption", texts(&["after"])).unwrap_err();
    assert!(err.is_store_failure());
    assert!(t.create_revision(post).is_err());
    assert_eq!(t.journal_size().unwrap(), size);
    assert_eq!(t.get_meta(post, "caption"), texts(&["before"]));
    assert_eq!(t.revision_count(), 0);

    switch.heal();
    let t = t.reopen();
    assert_eq!(t.get_meta(post, "caption"), texts(&["before"]));
    assert_eq!(t.revision_count(), 0);
}

#[test]
fn revision_ids_stay_unique_after_failed_flush() {
    let (t, switch) = TestVersioning::memory_with_faults(sample_config());
    let post = EntityId::from_u128(1);
    t.set_meta(post, "gallery", texts(&["a"])).unwrap();
    let first = t.create_revision(post).unwrap();

    switch.reject_flushes();
    assert!(t.create_revision(post).is_err());
    switch.heal();

    t.set_meta(post, "gallery", texts(&["b"])).unwrap();
    let second = t.create_revision(post).unwrap();
    assert_ne!(first, second);

    let t = t.reopen();
    assert_eq!(t.revision_count(), 2);
    let history = t.revisions_for(post);
    let ids: Vec<_> = history.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![first, second]);
    assert_eq!(history[0].snapshot.get("gallery"), texts(&["a"]).as_slice());
    assert_eq!(history[1].snapshot.get("gallery"), texts(&["b"]).as_slice());
    assert_eq!(history[1].sequence, 2);
}
