use std::collections::BTreeMap;

use bytes::Bytes;
use proptest::prelude::*;
use proptest_derive::Arbitrary;

use crate::RadixTree;

/// Reference implementation: a plain sorted map.
#[derive(Default)]
struct Model {
    map: BTreeMap<Vec<u8>, Vec<u8>>,
}

/// Actions to test against both implementations
#[derive(Arbitrary, Debug, Clone)]
enum Action {
    Set(KeyValue),
    Get(Key),
    DeleteKey(Key),
    DeletePrefix(Key),
    Walk(Key),
}

/// Wrapper for key generation with custom strategy
#[derive(Debug, Clone)]
struct Key(Vec<u8>);

#[derive(Debug, Clone)]
struct KeyValue {
    key: Key,
    value: Vec<u8>,
}

impl Arbitrary for Key {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            // Empty key
            Just(Key(vec![])),
            // Tiny alphabet, short keys: lots of shared prefixes, splits
            // and merges
            prop::collection::vec(prop::sample::select(vec![0u8, b'a', b'b', b'c']), 1..6)
                .prop_map(Key),
            // Arbitrary bytes
            prop::collection::vec(any::<u8>(), 1..24).prop_map(Key),
            // Keys with natural delimiters
            "[a-c]{1,4}:[a-c]{1,4}".prop_map(|s| Key(s.into_bytes())),
        ]
        .boxed()
    }
}

impl Arbitrary for KeyValue {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (any::<Key>(), prop::collection::vec(any::<u8>(), 0..8))
            .prop_map(|(key, value)| KeyValue { key, value })
            .boxed()
    }
}

/// Checks the structural invariants the tree must restore after every
/// mutation: an empty root label, unique sibling first bytes, no valueless
/// non-root node with fewer than two children, and no unreachable arena
/// entries.
fn audit(tree: &RadixTree) {
    let inner = tree.inner.read();
    let root = inner.root;
    assert!(inner.node(root).label.is_empty(), "root label must stay empty");

    let mut stack = vec![root];
    let mut reachable = 0usize;
    while let Some(node_key) = stack.pop() {
        reachable += 1;
        let node = inner.node(node_key);

        let mut seen = [false; 256];
        for entry in node.childs.iter() {
            assert!(
                !seen[entry.radix as usize],
                "sibling edges share a first byte"
            );
            seen[entry.radix as usize] = true;
            stack.push(entry.node);
        }

        if node_key != root && node.value.is_none() {
            assert!(
                node.childs.len() >= 2,
                "valueless node with {} child(ren) survived a mutation",
                node.childs.len()
            );
        }
    }
    assert_eq!(reachable, inner.arena.len(), "arena holds unreachable nodes");
}

fn walk_collected(tree: &RadixTree, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut out: Vec<(Vec<u8>, Vec<u8>)> = tree
        .walk_prefix(prefix)
        .map(|(k, v)| (k.to_vec(), v.to_vec()))
        .collect();
    out.sort();
    out
}

/// Test harness that executes actions on both the tree and the model
#[derive(Default)]
struct Test {
    tree: RadixTree,
    model: Model,
}

impl Test {
    fn execute(&mut self, action: Action) {
        match action {
            Action::Set(kv) => {
                let key = kv.key.0;
                let replaced = self.tree.set(&key, Bytes::from(kv.value.clone()));
                let previous = self.model.map.insert(key.clone(), kv.value);
                assert_eq!(
                    replaced,
                    previous.is_some(),
                    "set mismatch: key={key:?}"
                );
            }
            Action::Get(key) => {
                let tree_result = self.tree.get(&key.0);
                let model_result = self.model.map.get(&key.0);
                assert_eq!(
                    tree_result.as_deref(),
                    model_result.map(|v| v.as_slice()),
                    "get mismatch: key={:?}",
                    key.0
                );
            }
            Action::DeleteKey(key) => {
                let tree_result = self.tree.delete_key(&key.0);
                let model_result = self.model.map.remove(&key.0).is_some();
                assert_eq!(
                    tree_result, model_result,
                    "delete_key mismatch: key={:?}",
                    key.0
                );
            }
            Action::DeletePrefix(prefix) => {
                let expected: Vec<Vec<u8>> = self
                    .model
                    .map
                    .keys()
                    .filter(|k| k.starts_with(&prefix.0))
                    .cloned()
                    .collect();
                let count = self.tree.delete_prefix(&prefix.0);
                assert_eq!(
                    count,
                    expected.len(),
                    "delete_prefix count mismatch: prefix={:?}",
                    prefix.0
                );
                for key in expected {
                    self.model.map.remove(&key);
                }
                assert!(
                    self.tree.walk_prefix(&prefix.0).next().is_none(),
                    "keys with prefix {:?} survived delete_prefix",
                    prefix.0
                );
            }
            Action::Walk(prefix) => {
                let walked = walk_collected(&self.tree, &prefix.0);
                let expected: Vec<(Vec<u8>, Vec<u8>)> = self
                    .model
                    .map
                    .iter()
                    .filter(|(k, _)| k.starts_with(&prefix.0))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                assert_eq!(walked, expected, "walk mismatch: prefix={:?}", prefix.0);
            }
        }

        audit(&self.tree);

        // The full walk and the model must agree after every action
        let expected: Vec<(Vec<u8>, Vec<u8>)> = self
            .model
            .map
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        assert_eq!(walk_collected(&self.tree, b""), expected);
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn proptest_vs_btreemap(actions in prop::collection::vec(any::<Action>(), 1..64)) {
        let mut test = Test::default();
        for action in actions {
            test.execute(action);
        }
    }

    #[test]
    fn round_trip_set_then_walk(entries in prop::collection::vec(any::<KeyValue>(), 1..40)) {
        let tree = RadixTree::new();
        let mut model: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        for kv in entries {
            tree.set(&kv.key.0, Bytes::from(kv.value.clone()));
            model.insert(kv.key.0, kv.value);
        }
        audit(&tree);

        let expected: Vec<(Vec<u8>, Vec<u8>)> =
            model.into_iter().collect();
        prop_assert_eq!(walk_collected(&tree, b""), expected);
    }

    #[test]
    fn delete_prefix_leaves_no_survivors(
        entries in prop::collection::vec(any::<KeyValue>(), 1..40),
        prefix in any::<Key>(),
    ) {
        let tree = RadixTree::new();
        for kv in &entries {
            tree.set(&kv.key.0, Bytes::from(kv.value.clone()));
        }
        tree.delete_prefix(&prefix.0);
        audit(&tree);

        prop_assert!(tree.walk_prefix(&prefix.0).next().is_none());
        for (key, _) in tree.walk_prefix(b"") {
            prop_assert!(!key.starts_with(&prefix.0));
        }
    }
}
