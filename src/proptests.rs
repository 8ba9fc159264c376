use crate::{BitKey, Config, Error, ExtendibleHashMap, HashIndex, LinearHashMap};

use proptest::{arbitrary::Arbitrary, prelude::*, test_runner::TestCaseError};
use std::{collections::HashMap, fmt::Debug};

#[derive(Clone, Debug)]
enum Op<K> {
    Insert(K, u32),
    Remove(K),
    Get(K),
}

fn ops_strategy<K>(max_len: usize) -> impl Strategy<Value = Vec<Op<K>>>
where
    K: Arbitrary + Clone + Debug + 'static,
{
    let op = prop_oneof![
        50 => (any::<K>(), any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        25 => any::<K>().prop_map(Op::Remove),
        25 => any::<K>().prop_map(Op::Get),
    ];
    prop::collection::vec(op, 0..=max_len)
}

/// Replays `ops` on `index` and on a `HashMap`, comparing every answer and
/// calling `after_step` once per operation.
fn check_against_model<K, I>(
    index: &mut I,
    ops: Vec<Op<K>>,
    mut after_step: impl FnMut(&I),
) -> Result<HashMap<K, u32>, TestCaseError>
where
    K: BitKey,
    I: HashIndex<K, u32>,
{
    let mut model = HashMap::new();
    for op in ops {
        match op {
            Op::Insert(key, value) => {
                let old = index.insert(key, value).map_err(fail)?;
                prop_assert_eq!(old, model.insert(key, value));
            }
            Op::Remove(key) => {
                prop_assert_eq!(index.remove(&key), model.remove(&key));
            }
            Op::Get(key) => {
                prop_assert_eq!(index.get(&key), model.get(&key));
            }
        }
        prop_assert_eq!(index.len(), model.len());
        after_step(index);
    }
    Ok(model)
}

fn fail(error: Error) -> TestCaseError {
    TestCaseError::fail(error.to_string())
}

fn snapshot<'a, K: BitKey + 'a>(pairs: impl Iterator<Item = (&'a K, &'a u32)>) -> HashMap<K, u32> {
    pairs.map(|(k, v)| (*k, *v)).collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_extendible_equivalence_u8(
        ops in ops_strategy::<u8>(400),
        capacity in 1usize..=4,
        depth in 0u32..=3
    ) {
        let config = Config::new().bucket_capacity(capacity).initial_depth(depth);
        let mut map = ExtendibleHashMap::with_config(config).map_err(fail)?;

        let mut last_depth = map.global_depth();
        let model = check_against_model(&mut map, ops, |m| {
            m.assert_invariants();
            assert!(m.global_depth() >= last_depth, "directory shrank");
            last_depth = m.global_depth();
        })?;
        prop_assert_eq!(snapshot(map.iter()), model);
    }

    #[test]
    fn prop_extendible_equivalence_u32(
        ops in ops_strategy::<u32>(400),
        capacity in 2usize..=4
    ) {
        let config = Config::new().bucket_capacity(capacity);
        let mut map = ExtendibleHashMap::with_config(config).map_err(fail)?;

        let model = check_against_model(&mut map, ops, |_| {})?;
        map.assert_invariants();
        prop_assert_eq!(snapshot(map.iter()), model);
    }

    #[test]
    fn prop_linear_equivalence_u8(
        ops in ops_strategy::<u8>(400),
        capacity in 1usize..=4,
        threshold in 0.5f64..=1.0
    ) {
        let config = Config::new().bucket_capacity(capacity).load_factor_threshold(threshold);
        let mut map = LinearHashMap::with_config(config).map_err(fail)?;

        let mut last_bits = map.global_bits();
        let model = check_against_model(&mut map, ops, |m| {
            m.assert_invariants();
            assert!(m.global_bits() >= last_bits, "address width shrank");
            last_bits = m.global_bits();
        })?;
        prop_assert_eq!(snapshot(map.iter()), model);
    }

    #[test]
    fn prop_linear_equivalence_u32(
        ops in ops_strategy::<u32>(400),
        capacity in 1usize..=8,
        threshold in 0.5f64..=1.0
    ) {
        let config = Config::new().bucket_capacity(capacity).load_factor_threshold(threshold);
        let mut map = LinearHashMap::with_config(config).map_err(fail)?;

        let model = check_against_model(&mut map, ops, LinearHashMap::assert_invariants)?;
        prop_assert_eq!(snapshot(map.iter()), model);
    }

    #[test]
    fn prop_remove_all_in_any_order(
        keys in prop::collection::hash_set(any::<u16>(), 0..300)
            .prop_map(|set| set.into_iter().collect::<Vec<_>>())
            .prop_shuffle()
    ) {
        let mut extendible = ExtendibleHashMap::with_depth(2).map_err(fail)?;
        let mut linear = LinearHashMap::new();
        for &key in &keys {
            prop_assert_eq!(extendible.insert(key, key).map_err(fail)?, None);
            prop_assert_eq!(linear.insert(key, key), None);
        }

        let (depth, bits) = (extendible.global_depth(), linear.global_bits());
        for key in keys.iter().rev() {
            prop_assert_eq!(extendible.remove(key), Some(*key));
            prop_assert_eq!(linear.remove(key), Some(*key));
            prop_assert_eq!(extendible.remove(key), None);
            prop_assert_eq!(linear.remove(key), None);
        }

        prop_assert!(extendible.is_empty());
        prop_assert!(linear.is_empty());
        prop_assert_eq!(extendible.global_depth(), depth);
        prop_assert_eq!(linear.global_bits(), bits);
        extendible.assert_invariants();
        linear.assert_invariants();
        for key in &keys {
            prop_assert!(!extendible.contains_key(key));
            prop_assert!(!linear.contains_key(key));
        }
    }
}
