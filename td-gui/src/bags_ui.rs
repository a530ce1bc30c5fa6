use eframe::egui;
use egui::{Align2, CornerRadius, FontId, Pos2, Sense};
use td_core::{
    graph::Position,
    session::{Action, Session},
};
use td_graphics::{
    render,
    scene::{SceneCache, bag_label},
    viewport::Viewport,
};

/// The bag tree canvas with rectangle selection.
pub(crate) struct BagsUi {
    viewport: Viewport,
    scene: SceneCache,
    /// `.td` text of the decomposition the scene was built from.
    shown: Option<String>,
    /// Logical press point of the rectangle being drawn.
    origin: Option<Position>,
}

impl BagsUi {
    pub(crate) fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            scene: SceneCache::default(),
            shown: None,
            origin: None,
        }
    }

    pub(crate) fn ui(&mut self, ui: &mut egui::Ui, session: &Session) -> Vec<Action> {
        let Some(view) = session.view() else {
            if self.shown.take().is_some() {
                self.scene.clear();
            }
            if session.is_pending() {
                ui.centered_and_justified(egui::Ui::spinner);
            } else {
                ui.centered_and_justified(|ui| {
                    ui.weak("Decompose the graph to see its bags");
                });
            }
            return Vec::new();
        };

        if self.shown.as_deref() != Some(view.raw.as_str()) {
            self.scene.clear();
            self.shown = Some(view.raw.clone());
        }
        self.scene
            .sync(&view.tree, |id| bag_label(&view.decomposition, id));

        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let rect = response.rect;
        self.viewport.set_canvas_size(rect.size());
        let origin = rect.min.to_vec2();
        let to_logical = |pos: Pos2| self.viewport.screen_to_logical(pos - origin);

        let mut actions = Vec::new();

        if response.drag_started() {
            if let Some(press) = ui.input(|i| i.pointer.press_origin()) {
                let at = to_logical(press);
                self.origin = Some(at);
                actions.push(Action::BagPointerDown(at));
            }
        }
        if response.dragged() {
            if let (Some(_), Some(pos)) = (self.origin, response.interact_pointer_pos()) {
                if rect.contains(pos) {
                    actions.push(Action::BagPointerMove(to_logical(pos)));
                } else {
                    self.origin = None;
                    actions.push(Action::BagPointerLeave);
                }
            }
        }
        if response.drag_stopped() {
            if let (Some(start), Some(pos)) = (self.origin.take(), response.interact_pointer_pos())
            {
                let end = to_logical(pos);
                actions.push(Action::BagPointerUp(self.scene.bags_in_rect(start, end)));
                // the click that ends a drag is swallowed by the selection
                actions.push(Action::BagClick(self.scene.bag_at(end)));
            }
        }
        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let at = to_logical(pos);
                actions.push(Action::BagPointerDown(at));
                actions.push(Action::BagPointerUp(Vec::new()));
                actions.push(Action::BagClick(self.scene.bag_at(at)));
            }
        }

        painter.add(egui::Shape::rect_filled(
            rect,
            CornerRadius::ZERO,
            ui.visuals().faint_bg_color,
        ));
        if view.decomposition.is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "The decomposition has no bags",
                FontId::proportional(14.0),
                ui.visuals().weak_text_color(),
            );
        }

        let shapes = ui.fonts(|fonts| {
            render::bag_shapes(
                fonts,
                &self.scene,
                &self.viewport,
                origin,
                session.selection(),
            )
        });
        painter.extend(shapes);

        actions
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
}
