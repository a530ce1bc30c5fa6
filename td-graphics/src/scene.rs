//! Cached per-element geometry, kept in step with a [`GraphStore`] through
//! reconciliation so that only changed glyphs are rebuilt.

use indexmap::IndexMap;
use td_core::{
    decomposition::{BagId, Decomposition},
    graph::{EdgeKey, GraphSnapshot, GraphStore, Position, VertexId},
    reconcile::{GraphDiff, diff_graphs},
};
use tracing::trace;

use crate::{
    common::{BAG_RADII, EDGE_TOLERANCE, VERTEX_RADIUS},
    hit::{LogicalRect, distance_to_segment, point_in_circle, point_in_ellipse},
};

#[derive(Clone, PartialEq, Debug)]
pub struct NodeGlyph {
    pub center: Position,
    pub label: String,
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub struct EdgeGlyph {
    pub from: Position,
    pub to: Position,
}

#[derive(Clone, Debug, Default)]
pub struct SceneCache {
    snapshot: GraphSnapshot,
    nodes: IndexMap<VertexId, NodeGlyph>,
    edges: IndexMap<EdgeKey, EdgeGlyph>,
}

impl SceneCache {
    /// Brings the cache up to date with `store`, labelling new or changed
    /// nodes with `label`.
    pub fn sync(&mut self, store: &GraphStore, label: impl Fn(VertexId) -> String) -> GraphDiff {
        let snapshot = store.snapshot();
        let diff = diff_graphs(&self.snapshot, &snapshot);
        if diff.is_empty() {
            return diff;
        }

        for id in &diff.vertices.removed {
            self.nodes.shift_remove(id);
        }
        for id in diff.vertices.added.iter().chain(&diff.vertices.changed) {
            if let Some(vertex) = store.vertex(*id) {
                let glyph = NodeGlyph {
                    center: vertex.position,
                    label: label(*id),
                };
                self.nodes.insert(*id, glyph);
            }
        }

        for key in &diff.edges.removed {
            self.edges.shift_remove(key);
        }
        let moved = |key: &EdgeKey| {
            diff.vertices.changed.contains(&key.u()) || diff.vertices.changed.contains(&key.v())
        };
        let stale: Vec<EdgeKey> = diff
            .edges
            .added
            .iter()
            .copied()
            .chain(self.edges.keys().copied().filter(moved))
            .collect();
        for key in stale {
            if let (Some(a), Some(b)) = (self.nodes.get(&key.u()), self.nodes.get(&key.v())) {
                let glyph = EdgeGlyph {
                    from: a.center,
                    to: b.center,
                };
                self.edges.insert(key, glyph);
            }
        }

        trace!(
            added = diff.vertices.added.len(),
            changed = diff.vertices.changed.len(),
            removed = diff.vertices.removed.len(),
            "scene synced"
        );
        self.snapshot = snapshot;
        diff
    }

    /// Drops every glyph; the next sync rebuilds from scratch.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn nodes(&self) -> impl Iterator<Item = (VertexId, &NodeGlyph)> + '_ {
        self.nodes.iter().map(|(id, glyph)| (*id, glyph))
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeKey, &EdgeGlyph)> + '_ {
        self.edges.iter().map(|(key, glyph)| (*key, glyph))
    }

    #[must_use]
    pub fn node(&self, id: VertexId) -> Option<&NodeGlyph> {
        self.nodes.get(&id)
    }

    /// Topmost vertex whose body contains `point`.
    #[must_use]
    pub fn vertex_at(&self, point: Position) -> Option<VertexId> {
        self.nodes
            .iter()
            .rev()
            .find(|(_, glyph)| point_in_circle(point, glyph.center, VERTEX_RADIUS))
            .map(|(id, _)| *id)
    }

    /// Closest edge within the click tolerance of `point`.
    #[must_use]
    pub fn edge_at(&self, point: Position) -> Option<EdgeKey> {
        self.edges
            .iter()
            .map(|(key, glyph)| (*key, distance_to_segment(point, glyph.from, glyph.to)))
            .filter(|(_, distance)| *distance <= EDGE_TOLERANCE)
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(key, _)| key)
    }

    /// Topmost bag whose ellipse contains `point`, for a cache synced from a
    /// bag tree.
    #[must_use]
    pub fn bag_at(&self, point: Position) -> Option<BagId> {
        self.nodes
            .iter()
            .rev()
            .find(|(_, glyph)| point_in_ellipse(point, glyph.center, BAG_RADII))
            .map(|(id, _)| BagId(id.0))
    }

    /// Bags whose centers lie inside the rectangle spanned by `a` and `b`.
    #[must_use]
    pub fn bags_in_rect(&self, a: Position, b: Position) -> Vec<BagId> {
        let rect = LogicalRect::from_corners(a, b);
        self.nodes
            .iter()
            .filter(|(_, glyph)| rect.contains(glyph.center))
            .map(|(id, _)| BagId(id.0))
            .collect()
    }
}

/// Text shown inside a bag: its contents in engine order.
#[must_use]
pub fn bag_label(decomposition: &Decomposition, id: VertexId) -> String {
    decomposition
        .bag(BagId(id.0))
        .map(|bag| {
            bag.contents
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use td_core::{
        decomposition::{BagId, Decomposition},
        graph::{EdgeKey, GraphStore, Position, VertexId},
    };

    use super::{SceneCache, bag_label};

    #[fixture]
    fn store() -> GraphStore {
        let mut store = GraphStore::new();
        let a = store.add_vertex(Position::new(0.0, 0.0));
        let b = store.add_vertex(Position::new(100.0, 0.0));
        store.add_vertex(Position::new(200.0, 200.0));
        store.add_edge(a, b);
        store
    }

    #[rstest]
    fn hits_follow_moves(mut store: GraphStore) {
        let mut scene = SceneCache::default();
        let diff = scene.sync(&store, |id| id.to_string());
        assert_eq!(diff.vertices.added.len(), 3);
        assert_eq!(scene.vertex_at(Position::new(3.0, 3.0)), Some(VertexId(1)));
        let key = EdgeKey::new(VertexId(1), VertexId(2)).unwrap();
        assert_eq!(scene.edge_at(Position::new(50.0, 4.0)), Some(key));
        assert_eq!(scene.edge_at(Position::new(50.0, 20.0)), None);

        store.set_position(VertexId(2), Position::new(100.0, 100.0));
        let diff = scene.sync(&store, |id| id.to_string());
        assert_eq!(diff.vertices.changed, vec![VertexId(2)]);
        assert_eq!(scene.edge_at(Position::new(50.0, 4.0)), None);
        assert_eq!(scene.edge_at(Position::new(50.0, 50.0)), Some(key));
    }

    #[rstest]
    fn unchanged_store_is_a_noop(store: GraphStore) {
        let mut scene = SceneCache::default();
        scene.sync(&store, |id| id.to_string());
        assert!(scene.sync(&store, |_| unreachable!()).is_empty());
    }

    #[rstest]
    fn removals_drop_glyphs(mut store: GraphStore) {
        let mut scene = SceneCache::default();
        scene.sync(&store, |id| id.to_string());
        store.remove_connected_edges(VertexId(1));
        store.remove_vertex(VertexId(1));
        scene.sync(&store, |id| id.to_string());
        assert!(scene.node(VertexId(1)).is_none());
        assert_eq!(scene.edges().count(), 0);
    }

    #[test]
    fn bag_hits() {
        let decomposition = Decomposition::from_indexed(
            [vec![VertexId(1), VertexId(2)], vec![VertexId(2), VertexId(3)]],
            [(0, 1)],
        );
        let mut tree = decomposition.tree_store();
        tree.set_position(VertexId(1), Position::new(100.0, 100.0));
        tree.set_position(VertexId(2), Position::new(100.0, 300.0));

        let mut scene = SceneCache::default();
        scene.sync(&tree, |id| bag_label(&decomposition, id));
        assert_eq!(scene.node(VertexId(2)).unwrap().label, "2, 3");
        assert_eq!(scene.bag_at(Position::new(140.0, 100.0)), Some(BagId(1)));
        assert_eq!(scene.bag_at(Position::new(100.0, 120.0)), None);
        assert_eq!(
            scene.bags_in_rect(Position::new(0.0, 0.0), Position::new(200.0, 400.0)),
            vec![BagId(1), BagId(2)]
        );
        assert_eq!(
            scene.bags_in_rect(Position::new(200.0, 200.0), Position::new(0.0, 0.0)),
            vec![BagId(1)]
        );
    }
}
