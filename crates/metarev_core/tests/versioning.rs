//! End-to-end behavior of the versioning engine.

use metarev_core::{
    ComparisonMode, Config, CoreError, EntityId, EntityKind, EventKind, Value, VersioningListener,
};
use metarev_testkit::prelude::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn texts(items: &[&str]) -> Vec<Value> {
    items.iter().map(|s| Value::text(*s)).collect()
}

fn candidates(pairs: &[(&str, &str)]) -> BTreeMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), Value::text(*v)))
        .collect()
}

#[test]
fn fresh_revision_reports_no_change() {
    with_versioning(|v| {
        let post = EntityId::from_u128(1);
        v.set_meta(post, "caption", texts(&["harbour"])).unwrap();
        v.set_meta(post, "gallery", texts(&["img1", "img2"])).unwrap();
        let rev = v.create_revision(post).unwrap();
        assert!(!v.has_changed(post, rev));
        assert!(v.post_has_changed(true, post, rev));
    });
}

#[test]
fn restore_round_trip() {
    with_versioning(|v| {
        let post = EntityId::from_u128(1);
        v.set_meta(post, "caption", texts(&["first"])).unwrap();
        v.set_meta(post, "gallery", texts(&["img1", "img1", "img2"])).unwrap();
        let rev = v.create_revision(post).unwrap();

        v.set_meta(post, "caption", texts(&["second"])).unwrap();
        v.delete_meta(post, "gallery").unwrap();
        v.set_meta(post, "tags", texts(&["new"])).unwrap();
        assert!(v.has_changed(post, rev));

        let report = v.restore(post, rev).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.cleared, vec!["tags".to_string()]);
        assert_eq!(v.get_meta(post, "caption"), texts(&["first"]));
        assert_eq!(v.get_meta(post, "gallery"), texts(&["img1", "img1", "img2"]));
        assert!(v.get_meta(post, "tags").is_empty());
        assert!(!v.has_changed(post, rev));
    });
}

#[test]
fn reordering_values_is_a_change() {
    with_versioning(|v| {
        let post = EntityId::from_u128(1);
        v.set_meta(post, "gallery", texts(&["img1", "img2"])).unwrap();
        let rev = v.create_revision(post).unwrap();
        v.set_meta(post, "gallery", texts(&["img2", "img1"])).unwrap();
        assert!(v.has_changed(post, rev));
    });
}

#[test]
fn unversioned_keys_are_ignored() {
    with_versioning(|v| {
        let post = EntityId::from_u128(1);
        v.set_meta(post, "caption", texts(&["c"])).unwrap();
        v.set_meta(post, "_edit_lock", texts(&["1"])).unwrap();
        let rev = v.create_revision(post).unwrap();

        v.set_meta(post, "_edit_lock", texts(&["2"])).unwrap();
        assert!(!v.has_changed(post, rev));

        v.restore(post, rev).unwrap();
        assert_eq!(v.get_meta(post, "_edit_lock"), texts(&["2"]));
        assert!(!v.revision_snapshot(rev).unwrap().contains_key("_edit_lock"));
    });
}

#[test]
fn revisions_are_isolated_from_later_writes() {
    with_versioning(|v| {
        let post = EntityId::from_u128(1);
        v.set_meta(post, "tags", texts(&["a"])).unwrap();
        let rev = v.create_revision(post).unwrap();
        v.add_meta(post, "tags", Value::text("b")).unwrap();
        assert_eq!(v.revision_snapshot(rev).unwrap().get("tags"), texts(&["a"]));
        assert_eq!(v.get_meta(post, "tags"), texts(&["a", "b"]));
    });
}

#[test]
fn restore_is_idempotent() {
    with_versioning(|v| {
        let post = EntityId::from_u128(1);
        v.set_meta(post, "gallery", texts(&["x", "x"])).unwrap();
        let rev = v.create_revision(post).unwrap();
        v.set_meta(post, "gallery", texts(&["y"])).unwrap();

        v.restore(post, rev).unwrap();
        let once = v.get_all_meta(post);
        v.restore(post, rev).unwrap();
        assert_eq!(v.get_all_meta(post), once);
    });
}

#[test]
fn foreign_revision_restore_is_a_noop() {
    with_versioning(|v| {
        let a = EntityId::from_u128(1);
        let b = EntityId::from_u128(2);
        v.set_meta(a, "caption", texts(&["a"])).unwrap();
        v.set_meta(b, "caption", texts(&["b"])).unwrap();
        let rev_a = v.create_revision(a).unwrap();

        let report = v.restore(b, rev_a).unwrap();
        assert!(!report.found);
        assert_eq!(v.get_meta(b, "caption"), texts(&["b"]));
        assert!(v.poll_events(0, 10).iter().all(|e| e.entity == a));
    });
}

#[test]
fn save_if_changed_skips_identical_saves() {
    with_versioning(|v| {
        let post = EntityId::from_u128(1);
        v.set_meta(post, "caption", texts(&["c"])).unwrap();

        let first = v.save_if_changed(post, false).unwrap();
        assert!(first.is_some());
        assert_eq!(v.save_if_changed(post, false).unwrap(), None);
        assert!(v.save_if_changed(post, true).unwrap().is_some());

        v.set_meta(post, "caption", texts(&["d"])).unwrap();
        assert!(v.save_if_changed(post, false).unwrap().is_some());

        let stats = v.stats();
        assert_eq!(stats.revisions_created, 3);
        assert_eq!(stats.revisions_skipped, 1);
    });
}

#[test]
fn revision_sequence_counts_per_parent() {
    with_versioning(|v| {
        let a = EntityId::from_u128(1);
        let b = EntityId::from_u128(2);
        v.create_revision(a).unwrap();
        v.create_revision(b).unwrap();
        v.create_revision(a).unwrap();

        let seqs: Vec<u64> = v.revisions_for(a).iter().map(|r| r.sequence).collect();
        assert_eq!(seqs, vec![1, 2]);
        assert_eq!(v.latest_revision(b).unwrap().sequence, 1);
        assert_eq!(v.revision_count(), 3);
    });
}

#[test]
fn draft_preview_leaves_live_untouched() {
    with_versioning(|v| {
        let post = EntityId::from_u128(1);
        v.set_meta(post, "caption", texts(&["live"])).unwrap();

        let changed = v
            .save_draft(post, &candidates(&[("caption", "draft"), ("summary", "ignored")]))
            .unwrap();
        assert_eq!(changed, vec!["caption".to_string()]);
        assert_eq!(v.get_meta(post, "caption"), texts(&["live"]));
        assert_eq!(
            v.read_single_with_preview(post, "caption"),
            Some(Value::text("draft"))
        );
        assert!(v.read_with_preview(post, "summary").is_empty());

        let other = EntityId::from_u128(2);
        v.set_meta(other, "caption", texts(&["other"])).unwrap();
        assert_eq!(v.read_with_preview(other, "caption"), texts(&["other"]));
    });
}

#[test]
fn draft_promotion_writes_live_and_revises() {
    with_versioning(|v| {
        let post = EntityId::from_u128(1);
        v.set_meta(post, "caption", texts(&["live"])).unwrap();
        v.set_meta(post, "tags", texts(&["keep"])).unwrap();
        v.save_draft(post, &candidates(&[("caption", "edited")])).unwrap();

        let rev = v.promote_draft(post).unwrap().unwrap();
        assert_eq!(v.get_meta(post, "caption"), texts(&["edited"]));
        assert_eq!(v.get_meta(post, "tags"), texts(&["keep"]));
        assert!(v.draft(post).is_none());
        assert!(!v.has_changed(post, rev));
        assert_eq!(v.promote_draft(post).unwrap(), None);

        let kinds: Vec<EventKind> = v.poll_events(0, 10).into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::DraftSaved, EventKind::DraftPromoted(rev)]);
    });
}

#[test]
fn revision_entities_never_draft() {
    with_versioning(|v| {
        let rev_entity = EntityId::from_u128(9);
        v.register_entity(rev_entity, "post", EntityKind::Revision).unwrap();
        v.set_meta(rev_entity, "caption", texts(&["live"])).unwrap();

        assert!(v.save_draft(rev_entity, &candidates(&[("caption", "x")])).unwrap().is_empty());
        assert_eq!(v.draft_count(), 0);
        assert_eq!(v.read_with_preview(rev_entity, "caption"), texts(&["live"]));
    });
}

#[test]
fn page_type_versions_its_own_keys() {
    with_versioning(|v| {
        let page = EntityId::from_u128(3);
        v.register_entity(page, "page", EntityKind::Live).unwrap();
        v.set_meta(page, "summary", texts(&["s"])).unwrap();
        v.set_meta(page, "caption", texts(&["not versioned here"])).unwrap();
        let rev = v.create_revision(page).unwrap();

        let snapshot = v.revision_snapshot(rev).unwrap();
        assert_eq!(snapshot.keys().collect::<Vec<_>>(), ["summary"]);
        v.set_meta(page, "caption", texts(&["changed"])).unwrap();
        assert!(!v.has_changed(page, rev));
    });
}

#[test]
fn diffs_follow_configured_key_order() {
    with_versioning(|v| {
        let post = EntityId::from_u128(1);
        v.set_meta(post, "tags", texts(&["a"])).unwrap();
        let first = v.create_revision(post).unwrap();
        v.set_meta(post, "caption", texts(&["c"])).unwrap();
        v.set_meta(post, "tags", texts(&["b"])).unwrap();
        let second = v.create_revision(post).unwrap();

        let diffs = v.diff_revisions(Some(first), second);
        let keys: Vec<&str> = diffs.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, ["caption", "tags"]);
        assert_eq!(diffs[0].label, "Caption");

        assert_eq!(v.diff_revisions(None, first).len(), 1);
        assert!(v.diff_with_live(second).is_empty());
    });
}

#[test]
fn loose_comparison_ignores_representation() {
    let config = sample_config().comparison(ComparisonMode::Loose);
    let t = TestVersioning::memory(config);
    let post = EntityId::from_u128(1);
    t.set_meta(post, "tags", vec![Value::Integer(5)]).unwrap();
    let rev = t.create_revision(post).unwrap();
    t.set_meta(post, "tags", texts(&["5"])).unwrap();
    assert!(!t.has_changed(post, rev));
}

#[derive(Default)]
struct Counter {
    revisions: AtomicUsize,
    restores: AtomicUsize,
}

impl VersioningListener for Counter {
    fn revision_created(&self, _revision: &metarev_core::Revision) {
        self.revisions.fetch_add(1, Ordering::SeqCst);
    }

    fn restored(&self, _entity: EntityId, _report: &metarev_core::RestoreReport) {
        self.restores.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn listeners_hear_durable_changes() {
    let counter = Arc::new(Counter::default());
    let v = metarev_core::Versioning::builder(sample_config())
        .listener(Arc::clone(&counter) as Arc<dyn VersioningListener>)
        .open_in_memory()
        .unwrap();
    let post = EntityId::from_u128(1);
    let rev = v.create_revision(post).unwrap();
    v.restore(post, rev).unwrap();
    v.restore(post, metarev_core::RevisionId::new(99)).unwrap();

    assert_eq!(counter.revisions.load(Ordering::SeqCst), 1);
    assert_eq!(counter.restores.load(Ordering::SeqCst), 1);
}

#[test]
fn invalid_config_is_rejected() {
    let config = Config::new().default_entity_type("");
    let err = metarev_core::Versioning::open_in_memory(config).unwrap_err();
    assert!(matches!(err, CoreError::InvalidConfig { .. }));
}
