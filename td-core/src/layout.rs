use std::f32::consts::TAU;

use indexmap::IndexMap;
use tracing::debug;

use crate::graph::{EdgeKey, GraphStore, Position, VertexId};

/// Cooling schedule of an iterative solver.
///
/// The temperature starts at 1 and is multiplied by `1 - alpha_decay` every
/// step; the run stops once it drops below `alpha_min`.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct SimulationSchedule {
    pub alpha_min: f64,
    pub alpha_decay: f64,
}

impl Default for SimulationSchedule {
    fn default() -> Self {
        let alpha_min = 0.001;
        Self {
            alpha_min,
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
        }
    }
}

impl SimulationSchedule {
    /// Number of steps until the temperature drops below `alpha_min`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn steps(&self) -> usize {
        if !(0.0..1.0).contains(&self.alpha_decay) || self.alpha_decay == 0.0 {
            return 0;
        }
        // tolerate rounding in schedules derived from a step count
        let steps = (self.alpha_min.ln() / (1.0 - self.alpha_decay).ln() - 1e-9).ceil();
        if !steps.is_finite() || steps <= 0.0 {
            return 0;
        }
        steps as usize
    }
}

/// What a solver is asked to place.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct LayoutInput {
    pub nodes: Vec<VertexId>,
    pub edges: Vec<EdgeKey>,
    /// Width and height of the logical canvas.
    pub extent: (f32, f32),
}

impl LayoutInput {
    #[must_use]
    pub fn from_store(store: &GraphStore, extent: (f32, f32)) -> Self {
        Self {
            nodes: store.vertex_ids().collect(),
            edges: store.edges().collect(),
            extent,
        }
    }

    #[must_use]
    pub fn center(&self) -> Position {
        Position::new(self.extent.0 / 2.0, self.extent.1 / 2.0)
    }
}

/// A pure positioning function.
pub trait PositionSolver {
    /// Places every node of `input` after `steps` iterations.
    fn solve(&self, input: &LayoutInput, steps: usize) -> IndexMap<VertexId, Position>;
}

/// Evenly spaced points on a circle around the extent center.
#[derive(Copy, Clone, Debug, Default)]
pub struct CircleSolver;

impl CircleSolver {
    #[must_use]
    pub fn radius(extent: (f32, f32)) -> f32 {
        extent.0.min(extent.1) * 0.35
    }
}

impl PositionSolver for CircleSolver {
    fn solve(&self, input: &LayoutInput, _steps: usize) -> IndexMap<VertexId, Position> {
        let center = input.center();
        let radius = Self::radius(input.extent);
        #[allow(clippy::cast_precision_loss)]
        let count = input.nodes.len().max(1) as f32;
        input
            .nodes
            .iter()
            .enumerate()
            .map(|(i, id)| {
                #[allow(clippy::cast_precision_loss)]
                let angle = TAU * i as f32 / count;
                (
                    *id,
                    Position::new(
                        center.x + radius * angle.cos(),
                        center.y + radius * angle.sin(),
                    ),
                )
            })
            .collect()
    }
}

/// Runs a solver once over a graph and writes the positions back.
pub struct LayoutAdapter {
    solver: Box<dyn PositionSolver>,
    schedule: SimulationSchedule,
}

impl Default for LayoutAdapter {
    fn default() -> Self {
        Self::new(Box::new(CircleSolver))
    }
}

impl LayoutAdapter {
    #[must_use]
    pub fn new(solver: Box<dyn PositionSolver>) -> Self {
        Self {
            solver,
            schedule: SimulationSchedule::default(),
        }
    }

    #[must_use]
    pub fn with_schedule(mut self, schedule: SimulationSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Rewrites `store` with solved positions. Nodes the solver leaves out
    /// are put at the extent center.
    pub fn apply(&self, store: &mut GraphStore, extent: (f32, f32)) {
        let input = LayoutInput::from_store(store, extent);
        let steps = self.schedule.steps();
        let positions = self.solver.solve(&input, steps);
        let center = input.center();
        store.rewrite(
            input
                .nodes
                .iter()
                .map(|id| (*id, positions.get(id).copied().unwrap_or(center))),
            input.edges.iter().copied(),
        );
        debug!(nodes = input.nodes.len(), steps, "layout applied");
    }
}
