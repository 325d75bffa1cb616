//! Property tests over generated metadata.

use metarev_core::{EntityId, Value};
use metarev_testkit::prelude::*;
use proptest::prelude::*;

const POST_KEYS: &[&str] = &["caption", "gallery", "tags"];

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn revision_matches_live_state(
        entity in entity_id_strategy(),
        meta in metadata_map_strategy(POST_KEYS),
    ) {
        let t = TestVersioning::memory(sample_config());
        for (key, values) in &meta {
            t.set_meta(entity, key, values.clone()).unwrap();
        }
        let rev = t.create_revision(entity).unwrap();
        prop_assert!(!t.has_changed(entity, rev));

        let snapshot = t.revision_snapshot(rev).unwrap();
        for key in POST_KEYS {
            prop_assert_eq!(snapshot.get(key), meta[*key].as_slice());
        }
        prop_assert!(!snapshot.contains_key("internal_flag"));
    }

    #[test]
    fn restore_undoes_any_edit(
        before in metadata_map_strategy(POST_KEYS),
        after in metadata_map_strategy(POST_KEYS),
    ) {
        let t = TestVersioning::memory(sample_config());
        let post = EntityId::from_u128(7);
        for (key, values) in &before {
            t.set_meta(post, key, values.clone()).unwrap();
        }
        let rev = t.create_revision(post).unwrap();
        for (key, values) in &after {
            t.set_meta(post, key, values.clone()).unwrap();
        }

        t.restore(post, rev).unwrap();
        for key in POST_KEYS {
            prop_assert_eq!(t.get_meta(post, key), before[*key].clone());
        }
        prop_assert_eq!(t.get_meta(post, "internal_flag"), after["internal_flag"].clone());
        prop_assert!(!t.has_changed(post, rev));
    }

    #[test]
    fn drafts_never_reach_live(
        meta in metadata_map_strategy(POST_KEYS),
        first in candidate_map_strategy(POST_KEYS),
        second in candidate_map_strategy(POST_KEYS),
    ) {
        let t = TestVersioning::memory(sample_config());
        let post = EntityId::from_u128(3);
        for (key, values) in &meta {
            t.set_meta(post, key, values.clone()).unwrap();
        }
        let live = t.get_all_meta(post);
        t.save_draft(post, &first).unwrap();
        t.save_draft(post, &second).unwrap();
        prop_assert_eq!(&t.get_all_meta(post), &live);

        let reopened = t.reopen();
        prop_assert_eq!(&reopened.get_all_meta(post), &live);
        for key in POST_KEYS {
            let preview = reopened.read_with_preview(post, key);
            match reopened.draft(post).map(|d| d.snapshot.get(key).to_vec()) {
                Some(values) if !values.is_empty() => prop_assert_eq!(preview, values),
                _ => prop_assert_eq!(preview, meta[*key].clone()),
            }
        }
    }

    #[test]
    fn any_permutation_change_is_detected(
        values in prop::collection::vec("[a-c]".prop_map(Value::Text), 2..5),
    ) {
        let t = TestVersioning::memory(sample_config());
        let post = EntityId::from_u128(1);
        t.set_meta(post, "gallery", values.clone()).unwrap();
        let rev = t.create_revision(post).unwrap();

        let mut reversed = values.clone();
        reversed.reverse();
        t.set_meta(post, "gallery", reversed.clone()).unwrap();
        prop_assert_eq!(t.has_changed(post, rev), reversed != values);
    }
}
