use std::{collections::BTreeSet, str::FromStr, sync::Arc};

use derive_more::{Display, From};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Identifier of a vertex in the source graph. Always positive.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, From, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct VertexId(pub u32);

/// A point in logical (world) units.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Canonical key of an undirected edge, rendered as `"min-max"`.
///
/// The constructor orders the endpoints, so two keys built from the same
/// unordered pair always compare equal.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
#[display("{u}-{v}")]
pub struct EdgeKey {
    u: VertexId,
    v: VertexId,
}

impl EdgeKey {
    /// Returns `None` for self loops.
    #[must_use]
    pub fn new(a: VertexId, b: VertexId) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { u: a, v: b }),
            std::cmp::Ordering::Greater => Some(Self { u: b, v: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// The smaller endpoint.
    #[must_use]
    pub const fn u(&self) -> VertexId {
        self.u
    }

    /// The larger endpoint.
    #[must_use]
    pub const fn v(&self) -> VertexId {
        self.v
    }

    #[must_use]
    pub fn touches(&self, id: VertexId) -> bool {
        self.u == id || self.v == id
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EdgeKeyError {
    #[error("edge key `{0}` is not of the form `u-v`")]
    Malformed(String),
    #[error("edge key `{0}` is a self loop")]
    SelfLoop(String),
}

impl FromStr for EdgeKey {
    type Err = EdgeKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || EdgeKeyError::Malformed(s.to_owned());
        let (a, b) = s.split_once('-').ok_or_else(malformed)?;
        let a = a.trim().parse::<u32>().map_err(|_| malformed())?;
        let b = b.trim().parse::<u32>().map_err(|_| malformed())?;
        Self::new(VertexId(a), VertexId(b)).ok_or_else(|| EdgeKeyError::SelfLoop(s.to_owned()))
    }
}

impl Serialize for EdgeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EdgeKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Vertex {
    pub id: VertexId,
    pub position: Position,
    pub neighbors: BTreeSet<VertexId>,
}

impl Vertex {
    #[must_use]
    pub fn new(id: VertexId, position: Position) -> Self {
        Self {
            id,
            position,
            neighbors: BTreeSet::new(),
        }
    }
}

/// Shared, immutable view of the store's collections.
///
/// Two snapshots taken without an intervening mutation point at the same
/// allocations, so [`Arc::ptr_eq`] is enough to detect change.
#[derive(Clone, Debug, Default)]
pub struct GraphSnapshot {
    pub vertices: Arc<IndexMap<VertexId, Vertex>>,
    pub edges: Arc<IndexSet<EdgeKey>>,
}

/// Owns the vertices and edges of an undirected graph.
///
/// Mutations are copy-on-write: a collection that is shared with a snapshot
/// is cloned before it is modified, and operations that change nothing leave
/// it untouched.
#[derive(Clone, Debug)]
pub struct GraphStore {
    vertices: Arc<IndexMap<VertexId, Vertex>>,
    edges: Arc<IndexSet<EdgeKey>>,
    next_id: u32,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self {
            vertices: Arc::default(),
            edges: Arc::default(),
            next_id: 1,
        }
    }
}

impl GraphStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from explicit vertices and edges.
    ///
    /// Edges whose endpoints are not among `vertices` are dropped.
    pub fn from_parts(
        vertices: impl IntoIterator<Item = (VertexId, Position)>,
        edges: impl IntoIterator<Item = EdgeKey>,
    ) -> Self {
        let mut store = Self::default();
        store.rewrite(vertices, edges);
        store
    }

    /// Replaces the whole contents of the store.
    ///
    /// The id counter never moves backwards: it becomes the larger of its
    /// current value and one past the largest id written.
    pub fn rewrite(
        &mut self,
        vertices: impl IntoIterator<Item = (VertexId, Position)>,
        edges: impl IntoIterator<Item = EdgeKey>,
    ) {
        let mut vertex_map: IndexMap<VertexId, Vertex> = vertices
            .into_iter()
            .map(|(id, position)| (id, Vertex::new(id, position)))
            .collect();
        let mut edge_set = IndexSet::new();
        for key in edges {
            if !(vertex_map.contains_key(&key.u()) && vertex_map.contains_key(&key.v())) {
                warn!("dropping edge {key} with a missing endpoint");
                continue;
            }
            if edge_set.insert(key) {
                vertex_map[&key.u()].neighbors.insert(key.v());
                vertex_map[&key.v()].neighbors.insert(key.u());
            }
        }
        let max_id = vertex_map.keys().map(|id| id.0).max().unwrap_or(0);
        self.next_id = self.next_id.max(max_id.saturating_add(1));
        self.vertices = Arc::new(vertex_map);
        self.edges = Arc::new(edge_set);
        debug!(
            vertices = self.vertices.len(),
            edges = self.edges.len(),
            next_id = self.next_id,
            "graph store rewritten"
        );
    }

    /// Removes every vertex and edge. The id counter is kept.
    pub fn clear(&mut self) {
        self.vertices = Arc::default();
        self.edges = Arc::default();
    }

    pub fn add_vertex(&mut self, position: Position) -> VertexId {
        let id = VertexId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        Arc::make_mut(&mut self.vertices).insert(id, Vertex::new(id, position));
        trace!("added vertex {id}");
        id
    }

    /// Removes a vertex. Incident edges must already be gone; see
    /// [`GraphStore::remove_connected_edges`].
    pub fn remove_vertex(&mut self, id: VertexId) {
        if !self.vertices.contains_key(&id) {
            return;
        }
        if self.edges.iter().any(|key| key.touches(id)) {
            warn!("removing vertex {id} while incident edges remain");
        }
        Arc::make_mut(&mut self.vertices).shift_remove(&id);
        trace!("removed vertex {id}");
    }

    /// Removes every edge incident to `id` and returns their keys.
    pub fn remove_connected_edges(&mut self, id: VertexId) -> Vec<EdgeKey> {
        let incident: Vec<EdgeKey> = self
            .edges
            .iter()
            .filter(|key| key.touches(id))
            .copied()
            .collect();
        for key in &incident {
            self.remove_edge(*key);
        }
        incident
    }

    /// Connects two vertices. Self loops, existing edges and missing
    /// endpoints are ignored.
    pub fn add_edge(&mut self, a: VertexId, b: VertexId) -> Option<EdgeKey> {
        let key = EdgeKey::new(a, b)?;
        if self.edges.contains(&key)
            || !self.vertices.contains_key(&a)
            || !self.vertices.contains_key(&b)
        {
            return None;
        }
        Arc::make_mut(&mut self.edges).insert(key);
        let vertices = Arc::make_mut(&mut self.vertices);
        vertices[&key.u()].neighbors.insert(key.v());
        vertices[&key.v()].neighbors.insert(key.u());
        trace!("added edge {key}");
        Some(key)
    }

    pub fn remove_edge(&mut self, key: EdgeKey) -> bool {
        if !self.edges.contains(&key) {
            return false;
        }
        Arc::make_mut(&mut self.edges).shift_remove(&key);
        let vertices = Arc::make_mut(&mut self.vertices);
        if let Some(vertex) = vertices.get_mut(&key.u()) {
            vertex.neighbors.remove(&key.v());
        }
        if let Some(vertex) = vertices.get_mut(&key.v()) {
            vertex.neighbors.remove(&key.u());
        }
        trace!("removed edge {key}");
        true
    }

    pub fn set_position(&mut self, id: VertexId, position: Position) {
        if self.vertices.get(&id).is_none_or(|v| v.position == position) {
            return;
        }
        Arc::make_mut(&mut self.vertices)[&id].position = position;
    }

    #[must_use]
    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(&id)
    }

    pub fn vertices(&self) -> impl ExactSizeIterator<Item = &Vertex> + '_ {
        self.vertices.values()
    }

    pub fn vertex_ids(&self) -> impl ExactSizeIterator<Item = VertexId> + '_ {
        self.vertices.keys().copied()
    }

    pub fn edges(&self) -> impl ExactSizeIterator<Item = EdgeKey> + '_ {
        self.edges.iter().copied()
    }

    #[must_use]
    pub fn contains_edge(&self, key: EdgeKey) -> bool {
        self.edges.contains(&key)
    }

    /// Vertices without any incident edge, in ascending order.
    pub fn isolated_vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        let mut isolated: Vec<VertexId> = self
            .vertices
            .values()
            .filter(|v| v.neighbors.is_empty())
            .map(|v| v.id)
            .collect();
        isolated.sort_unstable();
        isolated.into_iter()
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// The id the next [`GraphStore::add_vertex`] will hand out.
    #[must_use]
    pub const fn next_id(&self) -> VertexId {
        VertexId(self.next_id)
    }

    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            vertices: Arc::clone(&self.vertices),
            edges: Arc::clone(&self.edges),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rstest::{fixture, rstest};

    use super::{EdgeKey, GraphStore, Position, VertexId};

    #[fixture]
    fn triangle() -> GraphStore {
        let mut store = GraphStore::new();
        let a = store.add_vertex(Position::new(0.0, 0.0));
        let b = store.add_vertex(Position::new(10.0, 0.0));
        let c = store.add_vertex(Position::new(0.0, 10.0));
        store.add_edge(a, b);
        store.add_edge(b, c);
        store.add_edge(c, a);
        store
    }

    #[rstest]
    #[case(1, 2)]
    #[case(2, 1)]
    fn edge_keys_are_canonical(#[case] a: u32, #[case] b: u32) {
        let key = EdgeKey::new(VertexId(a), VertexId(b)).unwrap();
        assert_eq!(key.to_string(), "1-2");
        assert_eq!(key.u(), VertexId(1));
        assert_eq!(key.v(), VertexId(2));
    }

    #[rstest]
    #[case("1-2", Some("1-2"))]
    #[case("9-3", Some("3-9"))]
    #[case("4-4", None)]
    #[case("4", None)]
    #[case("a-b", None)]
    fn parse_edge_keys(#[case] input: &str, #[case] expected: Option<&str>) {
        let parsed = input.parse::<EdgeKey>().ok().map(|key| key.to_string());
        assert_eq!(parsed.as_deref(), expected);
    }

    #[test]
    fn ids_are_never_reused() {
        let mut store = GraphStore::new();
        let a = store.add_vertex(Position::default());
        let b = store.add_vertex(Position::default());
        store.remove_vertex(b);
        let c = store.add_vertex(Position::default());
        assert_eq!((a, b, c), (VertexId(1), VertexId(2), VertexId(3)));

        store.clear();
        assert_eq!(store.add_vertex(Position::default()), VertexId(4));
    }

    #[test]
    fn counter_saturates_at_the_largest_id() {
        let mut store = GraphStore::new();
        store.rewrite([(VertexId(u32::MAX), Position::default())], std::iter::empty());
        assert_eq!(store.next_id(), VertexId(u32::MAX));
        assert_eq!(store.add_vertex(Position::default()), VertexId(u32::MAX));
        assert_eq!(store.next_id(), VertexId(u32::MAX));
    }

    #[rstest]
    #[case(1, 2)]
    #[case(2, 1)]
    fn add_edge_is_idempotent(#[case] first: u32, #[case] second: u32) {
        let mut store = GraphStore::new();
        store.add_vertex(Position::default());
        store.add_vertex(Position::default());

        assert!(store.add_edge(VertexId(1), VertexId(2)).is_some());
        assert!(store.add_edge(VertexId(first), VertexId(second)).is_none());

        assert_eq!(
            store.edges().map(|key| key.to_string()).collect::<Vec<_>>(),
            vec!["1-2"]
        );
        assert!(store.vertex(VertexId(1)).unwrap().neighbors.contains(&VertexId(2)));
        assert!(store.vertex(VertexId(2)).unwrap().neighbors.contains(&VertexId(1)));
    }

    #[test]
    fn add_edge_ignores_self_loops_and_missing_vertices() {
        let mut store = GraphStore::new();
        let a = store.add_vertex(Position::default());
        assert_eq!(store.add_edge(a, a), None);
        assert_eq!(store.add_edge(a, VertexId(7)), None);
        assert_eq!(store.edge_count(), 0);
    }

    #[rstest]
    fn cascade_leaves_no_dangling_edges(mut triangle: GraphStore) {
        let removed = triangle.remove_connected_edges(VertexId(2));
        triangle.remove_vertex(VertexId(2));

        assert_eq!(removed.len(), 2);
        assert!(triangle.edges().all(|key| !key.touches(VertexId(2))));
        assert!(
            triangle
                .vertices()
                .all(|v| !v.neighbors.contains(&VertexId(2)))
        );
        assert_eq!(triangle.vertex_count(), 2);
    }

    #[rstest]
    fn remove_missing_vertex_is_silent(mut triangle: GraphStore) {
        let before = triangle.snapshot();
        triangle.remove_vertex(VertexId(42));
        assert!(Arc::ptr_eq(&before.vertices, &triangle.snapshot().vertices));
    }

    #[rstest]
    fn mutations_replace_shared_collections(mut triangle: GraphStore) {
        let before = triangle.snapshot();

        triangle.add_edge(VertexId(1), VertexId(2));
        let unchanged = triangle.snapshot();
        assert!(Arc::ptr_eq(&before.edges, &unchanged.edges));

        triangle.set_position(VertexId(1), Position::new(5.0, 5.0));
        let moved = triangle.snapshot();
        assert!(!Arc::ptr_eq(&before.vertices, &moved.vertices));
        assert!(Arc::ptr_eq(&before.edges, &moved.edges));
        assert_eq!(before.vertices[&VertexId(1)].position, Position::new(0.0, 0.0));
    }

    #[test]
    fn rewrite_keeps_counter_monotonic() {
        let mut store = GraphStore::new();
        for _ in 0..10 {
            store.add_vertex(Position::default());
        }
        store.rewrite(
            [(VertexId(1), Position::default()), (VertexId(3), Position::default())],
            EdgeKey::new(VertexId(1), VertexId(3)),
        );
        assert_eq!(store.next_id(), VertexId(11));

        let store = GraphStore::from_parts(
            [(VertexId(5), Position::default())],
            EdgeKey::new(VertexId(5), VertexId(6)),
        );
        assert_eq!(store.next_id(), VertexId(6));
        assert_eq!(store.edge_count(), 0);
    }

    #[rstest]
    fn isolated_vertices_are_sorted(mut triangle: GraphStore) {
        triangle.add_vertex(Position::default());
        let lonely = triangle.add_vertex(Position::default());
        triangle.remove_connected_edges(VertexId(1));
        assert_eq!(
            triangle.isolated_vertices().collect::<Vec<_>>(),
            vec![VertexId(1), VertexId(4), lonely]
        );
    }
}
