use egui::{Pos2, Vec2};
use td_core::graph::Position;

use crate::common::{ToPos2, ToPosition};

pub const ZOOM_FACTOR: f32 = 1.2;

/// Zoom transform between canvas-local screen points and logical points.
///
/// `screen = logical * zoom + translation`. Every zoom keeps the logical point
/// under the canvas center fixed.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    pub translation: Vec2,
    pub zoom: f32,
    center: Pos2,
    min_zoom: f32,
    max_zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0.1, 10.0)
    }
}

impl Viewport {
    #[must_use]
    pub fn new(min_zoom: f32, max_zoom: f32) -> Self {
        let (min_zoom, max_zoom) = if min_zoom <= max_zoom {
            (min_zoom, max_zoom)
        } else {
            (max_zoom, min_zoom)
        };
        Self {
            translation: Vec2::ZERO,
            zoom: 1.0_f32.clamp(min_zoom, max_zoom),
            center: Pos2::ZERO,
            min_zoom,
            max_zoom,
        }
    }

    /// Records the canvas size; zooming is anchored at its center.
    pub fn set_canvas_size(&mut self, size: Vec2) {
        self.center = (size / 2.0).to_pos2();
    }

    #[must_use]
    pub const fn center(&self) -> Pos2 {
        self.center
    }

    #[must_use]
    pub fn screen_to_logical(&self, screen: Pos2) -> Position {
        ((screen - self.translation).to_vec2() / self.zoom)
            .to_pos2()
            .to_position()
    }

    #[must_use]
    pub fn logical_to_screen(&self, logical: Position) -> Pos2 {
        (logical.to_pos2().to_vec2() * self.zoom + self.translation).to_pos2()
    }

    /// Scales by `factor`, clamped to the zoom range, around the canvas
    /// center.
    pub fn zoom_by(&mut self, factor: f32) {
        let zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        let effective = zoom / self.zoom;
        let center = self.center.to_vec2();
        self.translation = center + (self.translation - center) * effective;
        self.zoom = zoom;
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(ZOOM_FACTOR);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(ZOOM_FACTOR.recip());
    }

    pub fn reset(&mut self) {
        self.translation = Vec2::ZERO;
        self.zoom = 1.0_f32.clamp(self.min_zoom, self.max_zoom);
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn zoom_percent(&self) -> u32 {
        (self.zoom * 100.0).round() as u32
    }

    /// Scales a logical length to screen pixels.
    #[must_use]
    pub fn scale(&self, length: f32) -> f32 {
        length * self.zoom
    }
}

#[cfg(test)]
mod tests {
    use egui::{pos2, vec2};
    use proptest::prelude::*;
    use rstest::rstest;
    use td_core::graph::Position;

    use super::Viewport;

    #[test]
    fn three_in_one_out() {
        let mut viewport = Viewport::new(0.1, 10.0);
        viewport.set_canvas_size(vec2(800.0, 600.0));
        viewport.zoom_in();
        viewport.zoom_in();
        viewport.zoom_in();
        viewport.zoom_out();
        assert!((viewport.zoom - 1.44).abs() < 1e-4);
        assert_eq!(viewport.zoom_percent(), 144);
    }

    #[rstest]
    #[case(1.5, 3, 1.5)]
    #[case(10.0, 0, 1.0)]
    fn zoom_is_clamped(#[case] max: f32, #[case] steps: usize, #[case] expected: f32) {
        let mut viewport = Viewport::new(0.5, max);
        for _ in 0..steps {
            viewport.zoom_in();
        }
        assert!((viewport.zoom - expected).abs() < 1e-4);
        viewport.zoom_out();
        assert!((viewport.zoom - expected / 1.2).abs() < 1e-4);
    }

    #[test]
    fn clamped_zoom_keeps_center_fixed() {
        let mut viewport = Viewport::new(1.0, 1.1);
        viewport.set_canvas_size(vec2(400.0, 400.0));
        let before = viewport.screen_to_logical(pos2(200.0, 200.0));
        viewport.zoom_in();
        let after = viewport.screen_to_logical(pos2(200.0, 200.0));
        assert!((before.x - after.x).abs() < 1e-3);
        assert!((before.y - after.y).abs() < 1e-3);
        assert!((viewport.zoom - 1.1).abs() < 1e-6);
    }

    #[test]
    fn reset_restores_identity() {
        let mut viewport = Viewport::default();
        viewport.set_canvas_size(vec2(300.0, 200.0));
        viewport.zoom_in();
        viewport.reset();
        assert_eq!(
            viewport.logical_to_screen(Position::new(7.0, 9.0)),
            pos2(7.0, 9.0)
        );
    }

    proptest! {
        #[test]
        fn conversions_are_inverse(
            factors in prop::collection::vec(0.5_f32..2.0, 0..6),
            x in -500.0_f32..500.0,
            y in -500.0_f32..500.0,
        ) {
            let mut viewport = Viewport::new(0.05, 20.0);
            viewport.set_canvas_size(vec2(640.0, 480.0));
            let anchor = viewport.screen_to_logical(viewport.center());
            for factor in factors {
                viewport.zoom_by(factor);
            }
            let back = viewport.logical_to_screen(viewport.screen_to_logical(pos2(x, y)));
            prop_assert!((back.x - x).abs() < 1e-2 && (back.y - y).abs() < 1e-2);

            let still = viewport.screen_to_logical(viewport.center());
            prop_assert!((still.x - anchor.x).abs() < 1e-2 && (still.y - anchor.y).abs() < 1e-2);
        }
    }
}
