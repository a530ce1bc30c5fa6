//! Hit tests in logical coordinates.

use egui::Vec2;
use td_core::graph::Position;

#[must_use]
pub fn point_in_circle(point: Position, center: Position, radius: f32) -> bool {
    let (dx, dy) = (point.x - center.x, point.y - center.y);
    dx * dx + dy * dy <= radius * radius
}

/// Axis-aligned ellipse with horizontal and vertical radii `radii`.
#[must_use]
pub fn point_in_ellipse(point: Position, center: Position, radii: Vec2) -> bool {
    if radii.x <= 0.0 || radii.y <= 0.0 {
        return false;
    }
    let (dx, dy) = ((point.x - center.x) / radii.x, (point.y - center.y) / radii.y);
    dx * dx + dy * dy <= 1.0
}

#[must_use]
pub fn distance_to_segment(point: Position, a: Position, b: Position) -> f32 {
    let (abx, aby) = (b.x - a.x, b.y - a.y);
    let (apx, apy) = (point.x - a.x, point.y - a.y);
    let length_sq = abx * abx + aby * aby;
    let t = if length_sq == 0.0 {
        0.0
    } else {
        ((apx * abx + apy * aby) / length_sq).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a.x + t * abx - point.x, a.y + t * aby - point.y);
    (cx * cx + cy * cy).sqrt()
}

/// Rectangle spanned by two corners given in any order.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct LogicalRect {
    pub min: Position,
    pub max: Position,
}

impl LogicalRect {
    #[must_use]
    pub fn from_corners(a: Position, b: Position) -> Self {
        Self {
            min: Position::new(a.x.min(b.x), a.y.min(b.y)),
            max: Position::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    #[must_use]
    pub fn contains(&self, point: Position) -> bool {
        (self.min.x..=self.max.x).contains(&point.x) && (self.min.y..=self.max.y).contains(&point.y)
    }
}
