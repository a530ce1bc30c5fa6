use derive_more::{Display, From};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::graph::{EdgeKey, GraphStore, Position, VertexId};

/// 1-based identifier of a bag, assigned when a result is ingested.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, From, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BagId(pub u32);

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Bag {
    pub id: BagId,
    /// Vertices in the order the engine reported them.
    pub contents: Vec<VertexId>,
}

impl Bag {
    #[must_use]
    pub fn contains(&self, vertex: VertexId) -> bool {
        self.contents.contains(&vertex)
    }

    #[must_use]
    pub fn contains_edge(&self, key: EdgeKey) -> bool {
        self.contains(key.u()) && self.contains(key.v())
    }
}

/// A tree of bags.
///
/// The tree shape is trusted: an edge count other than `bags - 1` is logged
/// but not rejected.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Decomposition {
    bags: IndexMap<BagId, Bag>,
    tree_edges: Vec<(BagId, BagId)>,
}

impl Decomposition {
    /// Builds a decomposition from bags with explicit ids. Bags are kept in
    /// ascending id order; tree edges naming unknown bags are dropped.
    pub fn new(
        bags: impl IntoIterator<Item = Bag>,
        tree_edges: impl IntoIterator<Item = (BagId, BagId)>,
    ) -> Self {
        let mut bags: IndexMap<BagId, Bag> = bags.into_iter().map(|bag| (bag.id, bag)).collect();
        bags.sort_unstable_keys();
        let tree_edges = tree_edges
            .into_iter()
            .filter(|(a, b)| {
                let known = bags.contains_key(a) && bags.contains_key(b);
                if !known {
                    warn!("dropping tree edge {a}-{b} with an unknown bag");
                }
                known
            })
            .collect();
        let decomposition = Self { bags, tree_edges };
        decomposition.check_tree_shape();
        decomposition
    }

    /// Builds a decomposition from engine output: bag `i` of the list gets id
    /// `i + 1` and tree edges are given as 0-based indices into the list.
    pub fn from_indexed(
        bags: impl IntoIterator<Item = Vec<VertexId>>,
        tree_edges: impl IntoIterator<Item = (usize, usize)>,
    ) -> Self {
        let bags = bags.into_iter().zip(1..).map(|(contents, id)| Bag {
            id: BagId(id),
            contents,
        });
        let tree_edges = tree_edges.into_iter().filter_map(|(a, b)| {
            let a = u32::try_from(a.checked_add(1)?).ok()?;
            let b = u32::try_from(b.checked_add(1)?).ok()?;
            Some((BagId(a), BagId(b)))
        });
        Self::new(bags, tree_edges)
    }

    fn check_tree_shape(&self) {
        let expected = self.bags.len().saturating_sub(1);
        if self.tree_edges.len() != expected {
            warn!(
                expected,
                found = self.tree_edges.len(),
                "decomposition tree edge count does not match bag count"
            );
        }
        debug!(
            bags = self.bags.len(),
            width = self.width(),
            "decomposition ready"
        );
    }

    #[must_use]
    pub fn bag(&self, id: BagId) -> Option<&Bag> {
        self.bags.get(&id)
    }

    /// Bags in ascending id order.
    pub fn bags(&self) -> impl ExactSizeIterator<Item = &Bag> + '_ {
        self.bags.values()
    }

    #[must_use]
    pub fn tree_edges(&self) -> &[(BagId, BagId)] {
        &self.tree_edges
    }

    #[must_use]
    pub fn bag_count(&self) -> usize {
        self.bags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bags.is_empty()
    }

    #[must_use]
    pub fn max_bag_size(&self) -> usize {
        self.bags
            .values()
            .map(|bag| bag.contents.len())
            .max()
            .unwrap_or(0)
    }

    /// Largest bag size minus one; zero for an empty decomposition.
    #[must_use]
    pub fn width(&self) -> usize {
        self.max_bag_size().saturating_sub(1)
    }

    /// Number of distinct vertices over all bags.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.bags
            .values()
            .flat_map(|bag| &bag.contents)
            .unique()
            .count()
    }

    /// The lowest-id bag holding both endpoints of `key`.
    #[must_use]
    pub fn bag_containing_edge(&self, key: EdgeKey) -> Option<BagId> {
        self.bags
            .values()
            .find(|bag| bag.contains_edge(key))
            .map(|bag| bag.id)
    }

    /// Sorted, deduplicated union of the contents of `ids`. Unknown ids are
    /// skipped.
    #[must_use]
    pub fn union_of(&self, ids: &[BagId]) -> Vec<VertexId> {
        ids.iter()
            .filter_map(|id| self.bags.get(id))
            .flat_map(|bag| bag.contents.iter().copied())
            .sorted_unstable()
            .dedup()
            .collect()
    }

    /// The bag tree as a graph whose vertex ids are bag ids.
    #[must_use]
    pub fn tree_store(&self) -> GraphStore {
        GraphStore::from_parts(
            self.bags
                .keys()
                .map(|id| (VertexId(id.0), Position::default())),
            self.tree_edges
                .iter()
                .filter_map(|(a, b)| EdgeKey::new(VertexId(a.0), VertexId(b.0))),
        )
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::{BagId, Decomposition};
    use crate::graph::{EdgeKey, VertexId};

    fn ids(raw: &[u32]) -> Vec<VertexId> {
        raw.iter().copied().map(VertexId).collect()
    }

    #[fixture]
    fn chain() -> Decomposition {
        Decomposition::from_indexed(
            [ids(&[1, 2, 3]), ids(&[2, 3]), ids(&[3, 4])],
            [(0, 1), (1, 2)],
        )
    }

    #[rstest]
    fn width_is_largest_bag_minus_one(chain: Decomposition) {
        assert_eq!(chain.width(), 2);
        assert_eq!(chain.max_bag_size(), 3);
        assert_eq!(chain.vertex_count(), 4);
        assert_eq!(Decomposition::default().width(), 0);
    }

    #[rstest]
    fn engine_indices_become_one_based(chain: Decomposition) {
        assert_eq!(
            chain.bags().map(|bag| bag.id).collect::<Vec<_>>(),
            vec![BagId(1), BagId(2), BagId(3)]
        );
        assert_eq!(
            chain.tree_edges(),
            &[(BagId(1), BagId(2)), (BagId(2), BagId(3))]
        );
    }

    #[rstest]
    #[case(2, 3, Some(BagId(1)))]
    #[case(3, 4, Some(BagId(3)))]
    #[case(1, 4, None)]
    fn first_bag_covering_edge(
        chain: Decomposition,
        #[case] a: u32,
        #[case] b: u32,
        #[case] expected: Option<BagId>,
    ) {
        let key = EdgeKey::new(VertexId(a), VertexId(b)).unwrap();
        assert_eq!(chain.bag_containing_edge(key), expected);
    }

    #[rstest]
    fn union_is_sorted_and_deduplicated(chain: Decomposition) {
        assert_eq!(chain.union_of(&[BagId(3), BagId(2)]), ids(&[2, 3, 4]));
        assert_eq!(chain.union_of(&[BagId(9)]), ids(&[]));
    }

    #[rstest]
    fn tree_store_mirrors_bags(chain: Decomposition) {
        let tree = chain.tree_store();
        assert_eq!(tree.vertex_count(), 3);
        assert_eq!(
            tree.edges().map(|key| key.to_string()).collect::<Vec<_>>(),
            vec!["1-2", "2-3"]
        );
    }

    #[rstest]
    #[case(0, 5)]
    #[case(usize::MAX, 0)]
    #[case(0, usize::MAX)]
    #[case(0, u32::MAX as usize)]
    fn unknown_tree_edges_are_dropped(#[case] a: usize, #[case] b: usize) {
        let decomposition = Decomposition::from_indexed([ids(&[1]), ids(&[2])], [(a, b)]);
        assert_eq!(decomposition.bag_count(), 2);
        assert!(decomposition.tree_edges().is_empty());
    }
}
