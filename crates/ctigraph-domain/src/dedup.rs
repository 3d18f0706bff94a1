//! First-occurrence-wins deduplication and display-ID assignment

use crate::canonical::{KeyMode, TripleKey};
use crate::triple::{Triple, TripleId};
use std::collections::HashSet;
use std::hash::Hash;

/// Keep the first triple per canonical key, preserving input order
pub fn dedupe(triples: Vec<Triple>, mode: KeyMode) -> Vec<Triple> {
    dedupe_by_key(triples, |t| TripleKey::of(t, mode))
}

/// Order-preserving filter keeping the first item per key
pub fn dedupe_by_key<T, K, F>(items: Vec<T>, mut key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let mut seen = HashSet::with_capacity(items.len());
    items.into_iter().filter(|item| seen.insert(key(item))).collect()
}

/// Assign `t001`, `t002`, ... in slice order, replacing any previous ids
pub fn assign_ids(triples: &mut [Triple]) {
    for (i, triple) in triples.iter_mut().enumerate() {
        triple.id = Some(TripleId::sequential(i + 1));
    }
}
