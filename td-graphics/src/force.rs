//! Force-directed placement backed by `force_graph`.

use std::{collections::HashMap, f32::consts::TAU};

use force_graph::{EdgeData, ForceGraph, NodeData, SimulationParameters};
use indexmap::IndexMap;
use td_core::{
    graph::{Position, VertexId},
    layout::{CircleSolver, LayoutInput, PositionSolver},
};
use tracing::debug;

/// Time step of one simulation step, in seconds.
const STEP: f32 = 0.016;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ForceSolver {
    pub charge: f32,
    pub spring: f32,
    pub max_force: f32,
    pub node_speed: f32,
    pub damping: f32,
    pub node_mass: f32,
}

impl Default for ForceSolver {
    fn default() -> Self {
        Self {
            charge: 150.0,
            spring: 0.05,
            max_force: 100.0,
            node_speed: 3000.0,
            damping: 0.9,
            node_mass: 10.0,
        }
    }
}

impl ForceSolver {
    fn parameters(&self) -> SimulationParameters {
        SimulationParameters {
            force_charge: self.charge,
            force_spring: self.spring,
            force_max: self.max_force,
            node_speed: self.node_speed,
            damping_factor: self.damping,
        }
    }
}

impl PositionSolver for ForceSolver {
    fn solve(&self, input: &LayoutInput, steps: usize) -> IndexMap<VertexId, Position> {
        let mut graph: ForceGraph<VertexId, ()> = ForceGraph::new(self.parameters());
        let center = input.center();
        let radius = CircleSolver::radius(input.extent);
        #[allow(clippy::cast_precision_loss)]
        let count = input.nodes.len().max(1) as f32;

        let mut indices = HashMap::new();
        for (i, id) in input.nodes.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let angle = TAU * i as f32 / count;
            let index = graph.add_node(NodeData {
                x: center.x + radius * angle.cos(),
                y: center.y + radius * angle.sin(),
                mass: self.node_mass,
                is_anchor: false,
                user_data: *id,
            });
            indices.insert(*id, index);
        }
        for key in &input.edges {
            if let (Some(&a), Some(&b)) = (indices.get(&key.u()), indices.get(&key.v())) {
                graph.add_edge(a, b, EdgeData::default());
            }
        }

        for _ in 0..steps {
            graph.update(STEP);
        }

        let mut positions = IndexMap::with_capacity(input.nodes.len());
        graph.visit_nodes(|node| {
            positions.insert(node.data.user_data, Position::new(node.x(), node.y()));
        });
        recentre(&mut positions, center);
        debug!(nodes = positions.len(), steps, "force layout solved");
        positions
    }
}

/// Moves the bounding box center of `positions` onto `center`.
fn recentre(positions: &mut IndexMap<VertexId, Position>, center: Position) {
    let Some(first) = positions.values().next().copied() else {
        return;
    };
    let (min, max) = positions.values().fold((first, first), |(min, max), p| {
        (
            Position::new(min.x.min(p.x), min.y.min(p.y)),
            Position::new(max.x.max(p.x), max.y.max(p.y)),
        )
    });
    let dx = center.x - (min.x + max.x) / 2.0;
    let dy = center.y - (min.y + max.y) / 2.0;
    for p in positions.values_mut() {
        p.x += dx;
        p.y += dy;
    }
}

#[cfg(test)]
mod tests {
    use td_core::{
        graph::{EdgeKey, Position, VertexId},
        layout::{LayoutInput, PositionSolver},
    };

    use super::ForceSolver;

    #[test]
    fn every_node_is_placed_around_the_center() {
        let nodes: Vec<VertexId> = (1..=6).map(VertexId).collect();
        let edges = nodes
            .windows(2)
            .filter_map(|pair| EdgeKey::new(pair[0], pair[1]))
            .collect();
        let input = LayoutInput {
            nodes: nodes.clone(),
            edges,
            extent: (800.0, 600.0),
        };
        let positions = ForceSolver::default().solve(&input, 50);

        assert_eq!(positions.len(), nodes.len());
        assert!(positions.values().all(|p| p.x.is_finite() && p.y.is_finite()));
        let (min_x, max_x) = positions
            .values()
            .fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p.x), hi.max(p.x)));
        assert!(((min_x + max_x) / 2.0 - 400.0).abs() < 1e-2);
    }

    #[test]
    fn single_node_sits_at_center() {
        let input = LayoutInput {
            nodes: vec![VertexId(3)],
            edges: vec![],
            extent: (100.0, 100.0),
        };
        let positions = ForceSolver::default().solve(&input, 10);
        let Position { x, y } = positions[&VertexId(3)];
        assert!((x - 50.0).abs() < 1e-3 && (y - 50.0).abs() < 1e-3);
    }
}
