//! Small collection helpers used by the scheduler and repositories.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Convert a Vec into a HashMap keyed by the given extractor.
#[inline]
pub fn vec_to_map<T, K, F>(items: Vec<T>, key_fn: F) -> HashMap<K, T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    items.into_iter().map(|item| (key_fn(&item), item)).collect()
}

/// Group items by a key function, preserving each group's insertion order.
///
/// Used by the scheduler to group active cities by vendor before syncing,
/// so each vendor's rate limit is applied to its own sequential batch.
#[inline]
pub fn group_by<T, K, F>(items: Vec<T>, key_fn: F) -> HashMap<K, Vec<T>>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut map: HashMap<K, Vec<T>> = HashMap::new();
    for item in items {
        map.entry(key_fn(&item)).or_default().push(item);
    }
    map
}

/// Deduplicate while preserving first-seen order.
#[inline]
pub fn unique_ordered<T: Eq + Hash + Clone>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}
