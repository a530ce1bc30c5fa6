use eframe::egui;
use egui::{Align2, CornerRadius, CursorIcon, FontId, Pos2, Sense};
use td_core::{
    graph::{Position, VertexId},
    session::{Action, EditMode, Session},
};
use td_graphics::{
    render::{self, GraphMarks},
    scene::SceneCache,
    viewport::Viewport,
};

/// The editable source graph canvas.
pub(crate) struct GraphUi {
    viewport: Viewport,
    scene: SceneCache,
    dragging: Option<VertexId>,
}

impl GraphUi {
    pub(crate) fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            scene: SceneCache::default(),
            dragging: None,
        }
    }

    /// Draws the graph and returns the actions the pointer produced.
    pub(crate) fn ui(&mut self, ui: &mut egui::Ui, session: &Session) -> Vec<Action> {
        self.scene.sync(session.graph(), |id| id.to_string());

        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let rect = response.rect;
        self.viewport.set_canvas_size(rect.size());
        let origin = rect.min.to_vec2();
        let to_logical = |pos: Pos2| self.viewport.screen_to_logical(pos - origin);

        let mut actions = Vec::new();

        if response.drag_started() {
            let press = ui.input(|i| i.pointer.press_origin());
            self.dragging = press.and_then(|pos| self.scene.vertex_at(to_logical(pos)));
        }
        if response.dragged() {
            if let (Some(id), Some(pos)) = (self.dragging, response.interact_pointer_pos()) {
                let to = to_logical(pos.clamp(rect.min, rect.max));
                actions.push(Action::DragVertex { id, to });
            }
        }
        if response.drag_stopped() {
            self.dragging = None;
        }

        if let Some(pos) = response.interact_pointer_pos() {
            let at = to_logical(pos);
            if response.double_clicked() {
                if self.scene.vertex_at(at).is_none() {
                    actions.push(Action::AddVertex(at));
                }
            } else if response.clicked() {
                actions.push(self.click_action(at));
            }
        }

        if let Some(pos) = response.hover_pos() {
            if self.dragging.is_some() {
                ui.ctx().set_cursor_icon(CursorIcon::Grabbing);
            } else if self.scene.vertex_at(to_logical(pos)).is_some() {
                ui.ctx().set_cursor_icon(CursorIcon::Grab);
            }
        }

        painter.add(egui::Shape::rect_filled(
            rect,
            CornerRadius::ZERO,
            ui.visuals().faint_bg_color,
        ));

        if session.graph().is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "Double-click to add a vertex, or open a .gr file",
                FontId::proportional(14.0),
                ui.visuals().weak_text_color(),
            );
        }

        let marks = GraphMarks {
            edge_source: match session.mode() {
                EditMode::AddEdge { source } => source,
                EditMode::Select => None,
            },
            dragging: self.dragging,
        };
        let shapes = ui.fonts(|fonts| {
            render::graph_shapes(
                fonts,
                &self.scene,
                &self.viewport,
                origin,
                session.selection(),
                marks,
            )
        });
        painter.extend(shapes);

        actions
    }

    fn click_action(&self, at: Position) -> Action {
        if let Some(id) = self.scene.vertex_at(at) {
            Action::ClickVertex(id)
        } else if let Some(key) = self.scene.edge_at(at) {
            Action::ClickEdge(key)
        } else {
            Action::BackgroundClick
        }
    }

    pub(crate) fn reset(&mut self) {
        self.viewport.reset();
    }

    pub(crate) fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub(crate) fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    pub(crate) fn zoom_percent(&self) -> u32 {
        self.viewport.zoom_percent()
    }
}
