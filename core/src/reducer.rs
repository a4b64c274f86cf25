//! Per-plugin receiver that keeps the latest fact per token under the
//! `(block, txIndex)` total order (spec.md §4.5).

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

use indexer_types::domain::HasOrderKey;

/// A token-keyed map guarded by a single mutex (spec.md §5: "Reducer maps are
/// protected by a per-map mutex; the conditional write ... is the only
/// mutation point").
pub struct Reducer<K, V> {
    out: Mutex<HashMap<K, V>>,
}

impl<K, V> Default for Reducer<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self { out: Mutex::new(HashMap::new()) }
    }
}

impl<K, V> Reducer<K, V>
where
    K: Eq + Hash + Clone,
    V: HasOrderKey,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `record` iff no fact is stored for its key yet, or the stored
    /// fact's `OrderKey` is strictly smaller (spec.md invariant: a fact is
    /// never overwritten by one with a smaller or equal `OrderKey`).
    pub fn offer(&self, key: K, record: V) {
        let mut out = self.out.lock().expect("reducer mutex poisoned");
        match out.get(&key) {
            None => {
                out.insert(key, record);
            }
            Some(current) => {
                if current.order_key() < record.order_key() {
                    out.insert(key, record);
                }
            }
        }
    }

    /// Consume the reducer, returning everything it has accumulated.
    pub fn into_map(self) -> HashMap<K, V> {
        self.out.into_inner().expect("reducer mutex poisoned")
    }

    pub fn snapshot_len(&self) -> usize {
        self.out.lock().expect("reducer mutex poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexer_types::domain::OrderKey;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Fact {
        order_key: OrderKey,
        value: &'static str,
    }

    impl HasOrderKey for Fact {
        fn order_key(&self) -> OrderKey {
            self.order_key
        }
    }

    #[test]
    fn later_order_key_wins() {
        let reducer: Reducer<&str, Fact> = Reducer::new();
        reducer.offer("k", Fact { order_key: OrderKey::new(1, 0), value: "first" });
        reducer.offer("k", Fact { order_key: OrderKey::new(2, 0), value: "second" });
        let map = reducer.into_map();
        assert_eq!(map["k"].value, "second");
    }

    #[test]
    fn earlier_order_key_is_ignored_when_it_arrives_second() {
        let reducer: Reducer<&str, Fact> = Reducer::new();
        reducer.offer("k", Fact { order_key: OrderKey::new(5, 0), value: "later" });
        reducer.offer("k", Fact { order_key: OrderKey::new(1, 0), value: "earlier" });
        let map = reducer.into_map();
        assert_eq!(map["k"].value, "later");
    }

    #[test]
    fn duplicate_order_key_keeps_first_write() {
        let reducer: Reducer<&str, Fact> = Reducer::new();
        reducer.offer("k", Fact { order_key: OrderKey::new(10, 0), value: "first" });
        reducer.offer("k", Fact { order_key: OrderKey::new(10, 0), value: "duplicate" });
        let map = reducer.into_map();
        assert_eq!(map["k"].value, "first");
    }
}
