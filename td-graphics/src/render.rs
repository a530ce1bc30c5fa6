use egui::{Align2, Color32, FontId, Shape, Stroke, Vec2, epaint::text::Fonts, pos2};
use td_core::{
    decomposition::BagId,
    graph::{Position, VertexId},
    selection::{Highlight, SelectionState},
};

use crate::{
    common::{BAG_RADII, EDGE_WIDTH, GROUP_RING, HIGHLIGHT_WIDTH, TEXT_SIZE, VERTEX_RADIUS},
    palette::{self, group_color},
    scene::SceneCache,
    viewport::Viewport,
};

/// Transient state of the source view that changes how it is drawn.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct GraphMarks {
    /// First endpoint of an edge being added.
    pub edge_source: Option<VertexId>,
    /// Vertex under the pointer while it is dragged.
    pub dragging: Option<VertexId>,
}

/// Ring colors of a vertex, innermost first: one per displayed group that
/// holds it.
#[must_use]
pub fn vertex_rings(selection: &SelectionState, id: VertexId) -> Vec<Color32> {
    selection.groups_containing(id).map(group_color).collect()
}

#[must_use]
pub fn bag_fill(selection: &SelectionState, id: BagId) -> Color32 {
    selection
        .bag_group_index(id)
        .map_or(palette::BAG_FILL, group_color)
}

fn is_marked_vertex(selection: &SelectionState, marks: GraphMarks, id: VertexId) -> bool {
    selection.highlight() == Highlight::Node(id) || marks.edge_source == Some(id)
}

#[allow(clippy::cast_precision_loss)]
pub fn graph_shapes(
    fonts: &Fonts,
    scene: &SceneCache,
    viewport: &Viewport,
    origin: Vec2,
    selection: &SelectionState,
    marks: GraphMarks,
) -> Vec<Shape> {
    let transform = |p: Position| viewport.logical_to_screen(p) + origin;
    let radius = viewport.scale(VERTEX_RADIUS);
    let mut shapes = Vec::new();

    for (key, glyph) in scene.edges() {
        let highlighted = match selection.highlight() {
            Highlight::Edge(edge) => edge == key,
            Highlight::Node(id) => key.touches(id),
            Highlight::None => false,
        };
        let stroke = if highlighted {
            Stroke::new(viewport.scale(HIGHLIGHT_WIDTH), palette::HIGHLIGHT)
        } else {
            Stroke::new(viewport.scale(EDGE_WIDTH), palette::EDGE)
        };
        shapes.push(Shape::line_segment(
            [transform(glyph.from), transform(glyph.to)],
            stroke,
        ));
    }

    for (id, glyph) in scene.nodes() {
        let center = transform(glyph.center);
        for (i, color) in vertex_rings(selection, id).into_iter().enumerate().rev() {
            let ring = radius + viewport.scale(GROUP_RING) * (i + 1) as f32;
            shapes.push(Shape::circle_filled(center, ring, color));
        }
        let fill = if marks.dragging == Some(id) {
            palette::VERTEX_DRAG
        } else {
            palette::VERTEX_FILL
        };
        let border = if is_marked_vertex(selection, marks, id) {
            Stroke::new(viewport.scale(HIGHLIGHT_WIDTH), palette::HIGHLIGHT)
        } else {
            Stroke::new(viewport.scale(1.0), palette::VERTEX_BORDER)
        };
        shapes.push(Shape::circle_filled(center, radius, fill));
        shapes.push(Shape::circle_stroke(center, radius, border));
        let text = if marks.dragging == Some(id) {
            palette::VERTEX_FILL
        } else {
            palette::TEXT
        };
        shapes.push(Shape::text(
            fonts,
            center,
            Align2::CENTER_CENTER,
            &glyph.label,
            FontId::proportional(viewport.scale(TEXT_SIZE)),
            text,
        ));
    }

    shapes
}

pub fn bag_shapes(
    fonts: &Fonts,
    scene: &SceneCache,
    viewport: &Viewport,
    origin: Vec2,
    selection: &SelectionState,
) -> Vec<Shape> {
    let transform = |p: Position| viewport.logical_to_screen(p) + origin;
    let radii = BAG_RADII * viewport.zoom;
    let mut shapes = Vec::new();

    for (_, glyph) in scene.edges() {
        shapes.push(Shape::line_segment(
            [transform(glyph.from), transform(glyph.to)],
            Stroke::new(viewport.scale(EDGE_WIDTH), palette::EDGE),
        ));
    }

    for (id, glyph) in scene.nodes() {
        let bag = BagId(id.0);
        let center = transform(glyph.center);
        let border = if selection.edge_indicator() == Some(bag) {
            Stroke::new(viewport.scale(HIGHLIGHT_WIDTH), palette::HIGHLIGHT)
        } else {
            Stroke::new(viewport.scale(1.0), palette::BAG_BORDER)
        };
        shapes.push(Shape::ellipse_filled(center, radii, bag_fill(selection, bag)));
        shapes.push(Shape::ellipse_stroke(center, radii, border));
        shapes.push(Shape::text(
            fonts,
            center,
            Align2::CENTER_CENTER,
            &glyph.label,
            FontId::proportional(viewport.scale(TEXT_SIZE)),
            palette::TEXT,
        ));
    }

    if let Some((a, b)) = selection.selection_rect() {
        let (a, b) = (transform(a), transform(b));
        let outline = [a, pos2(b.x, a.y), b, pos2(a.x, b.y), a];
        shapes.extend(Shape::dashed_line(
            &outline,
            Stroke::new(1.0, palette::VERTEX_DRAG),
            6.0,
            4.0,
        ));
    }

    shapes
}
