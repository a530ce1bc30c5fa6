//! Id-keyed differences between two versions of a collection, so that views
//! only rebuild what changed.

use std::{hash::Hash, sync::Arc};

use derivative::Derivative;
use indexmap::{IndexMap, IndexSet};

use crate::graph::{EdgeKey, GraphSnapshot, VertexId};

#[derive(Derivative)]
#[derivative(
    Clone(bound = "K: Clone"),
    Debug(bound = "K: std::fmt::Debug"),
    Default(bound = ""),
    PartialEq(bound = "K: PartialEq")
)]
pub struct Diff<K> {
    pub added: Vec<K>,
    pub removed: Vec<K>,
    pub changed: Vec<K>,
}

impl<K> Diff<K> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Keys added to, removed from, or mapped to a different value in `next`.
pub fn diff_maps<K, V>(previous: &IndexMap<K, V>, next: &IndexMap<K, V>) -> Diff<K>
where
    K: Hash + Eq + Clone,
    V: PartialEq,
{
    let mut diff = Diff::default();
    for (key, value) in next {
        match previous.get(key) {
            None => diff.added.push(key.clone()),
            Some(old) if old != value => diff.changed.push(key.clone()),
            Some(_) => {}
        }
    }
    diff.removed = previous
        .keys()
        .filter(|key| !next.contains_key(*key))
        .cloned()
        .collect();
    diff
}

pub fn diff_sets<K>(previous: &IndexSet<K>, next: &IndexSet<K>) -> Diff<K>
where
    K: Hash + Eq + Clone,
{
    Diff {
        added: next.difference(previous).cloned().collect(),
        removed: previous.difference(next).cloned().collect(),
        changed: Vec::new(),
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphDiff {
    pub vertices: Diff<VertexId>,
    pub edges: Diff<EdgeKey>,
}

impl GraphDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.edges.is_empty()
    }
}

/// Compares two snapshots, skipping collections that are still shared.
#[must_use]
pub fn diff_graphs(previous: &GraphSnapshot, next: &GraphSnapshot) -> GraphDiff {
    GraphDiff {
        vertices: if Arc::ptr_eq(&previous.vertices, &next.vertices) {
            Diff::default()
        } else {
            diff_maps(&previous.vertices, &next.vertices)
        },
        edges: if Arc::ptr_eq(&previous.edges, &next.edges) {
            Diff::default()
        } else {
            diff_sets(&previous.edges, &next.edges)
        },
    }
}
