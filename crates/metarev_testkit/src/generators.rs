//! Property-based test generators using proptest.

use metarev_codec::Value;
use metarev_core::EntityId;
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Strategy for entity IDs.
pub fn entity_id_strategy() -> impl Strategy<Value = EntityId> {
    prop::array::uniform16(any::<u8>()).prop_map(EntityId::from_bytes)
}

/// Strategy for non-nested values.
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        prop::collection::vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
        "[a-z0-9 ]{0,12}".prop_map(Value::Text),
    ]
}

/// Strategy for values up to three levels deep.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_value_strategy().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{1,6}".prop_map(Value::Text), inner), 0..4)
                .prop_map(Value::Map),
        ]
    })
}

/// Strategy for a key's value sequence, duplicates included.
///
/// Values are drawn from a small pool so repeats are common.
pub fn value_sequence_strategy() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(
        prop_oneof![
            "img[1-3]".prop_map(Value::Text),
            (0i64..3).prop_map(Value::Integer),
            value_strategy(),
        ],
        0..5,
    )
}

/// Strategy for metadata over the given keys plus an unversioned key.
pub fn metadata_map_strategy(
    keys: &'static [&'static str],
) -> impl Strategy<Value = BTreeMap<String, Vec<Value>>> {
    let names: Vec<&'static str> = keys.iter().copied().chain(["internal_flag"]).collect();
    prop::collection::vec(value_sequence_strategy(), names.len()).prop_map(move |sequences| {
        names
            .iter()
            .map(|k| (*k).to_string())
            .zip(sequences)
            .collect()
    })
}

/// Strategy for autosave candidates over the given keys.
pub fn candidate_map_strategy(
    keys: &'static [&'static str],
) -> impl Strategy<Value = BTreeMap<String, Value>> {
    prop::collection::btree_map(
        prop::sample::select(keys.to_vec()).prop_map(str::to_string),
        prop_oneof![
            Just(Value::text("")),
            "[a-c]{1,2}".prop_map(Value::Text),
            scalar_value_strategy(),
        ],
        0..=keys.len(),
    )
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn metadata_map_covers_every_key(map in metadata_map_strategy(&["caption", "gallery"])) {
            prop_assert_eq!(map.len(), 3);
            prop_assert!(map.contains_key("internal_flag"));
        }

        #[test]
        fn candidates_use_given_keys(map in candidate_map_strategy(&["caption", "tags"])) {
            prop_assert!(map.keys().all(|k| k == "caption" || k == "tags"));
        }

        #[test]
        fn generated_values_encode(value in value_strategy()) {
            let bytes = metarev_codec::encode_value(&value).unwrap();
            prop_assert_eq!(metarev_codec::decode_value(&bytes).unwrap(), value);
        }
    }
}
