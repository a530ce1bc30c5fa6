use egui::{Pos2, Vec2, pos2, vec2};
use td_core::graph::Position;

pub const VERTEX_RADIUS: f32 = 12.0;
/// Horizontal and vertical radii of a bag body.
pub const BAG_RADII: Vec2 = vec2(50.0, 15.0);
/// How far from an edge a click still selects it.
pub const EDGE_TOLERANCE: f32 = 5.0;
pub const EDGE_WIDTH: f32 = 2.0;
pub const HIGHLIGHT_WIDTH: f32 = 3.0;
pub const TEXT_SIZE: f32 = 12.0;
/// Width of the ring drawn per group around a vertex.
pub const GROUP_RING: f32 = 3.0;

pub trait ToPos2 {
    fn to_pos2(self) -> Pos2;
}

impl ToPos2 for Position {
    fn to_pos2(self) -> Pos2 {
        pos2(self.x, self.y)
    }
}

pub trait ToPosition {
    fn to_position(self) -> Position;
}

impl ToPosition for Pos2 {
    fn to_position(self) -> Position {
        Position::new(self.x, self.y)
    }
}
