use std::{path::Path, time::Duration};

use anyhow::Context;
use eframe::egui::{self, RichText};
use egui_notify::Toasts;
use td_core::{
    engine::{RunOutcome, Runner},
    layout::LayoutAdapter,
    samples::SAMPLES,
    session::{Action, EditMode, Notice, NoticeLevel, Session},
};
use td_graphics::{force::ForceSolver, palette::group_color};
use tracing::debug;

use crate::{bags_ui::BagsUi, graph_ui::GraphUi, settings::Settings};

/// Logical size both canvases are laid out in.
const EXTENT: (f32, f32) = (800.0, 600.0);

pub struct App {
    session: Session,
    runner: Option<Runner>,
    graph_ui: GraphUi,
    bags_ui: BagsUi,
    show_raw: bool,
    toasts: Toasts,
}

impl App {
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        let layout = LayoutAdapter::new(Box::new(ForceSolver::default()));
        Self {
            session: Session::new(layout, EXTENT),
            runner: settings.runner(),
            graph_ui: GraphUi::new(settings.viewport()),
            bags_ui: BagsUi::new(settings.viewport()),
            show_raw: false,
            toasts: Toasts::default(),
        }
    }

    /// Loads the graph or sample named on the command line.
    ///
    /// # Errors
    /// Returns an error if the graph file cannot be read.
    pub fn load_initial(&mut self, settings: &Settings) -> anyhow::Result<()> {
        if let Some(action) = settings.initial_action()? {
            self.dispatch(action);
        }
        Ok(())
    }

    fn dispatch(&mut self, action: Action) {
        let update = self.session.apply(action);
        if update.cancel_run {
            if let Some(runner) = &mut self.runner {
                runner.cancel();
            }
        }
        for notice in update.notices {
            self.notify(notice);
        }
    }

    fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => self.toasts.info(notice.text),
            NoticeLevel::Success => self.toasts.success(notice.text),
            NoticeLevel::Warning => self.toasts.warning(notice.text),
            NoticeLevel::Error => self.toasts.error(notice.text),
        };
    }

    fn decompose(&mut self) {
        let Some(request) = self.session.decomposition_request() else {
            self.toasts.info("Add some vertices first.");
            return;
        };
        let Some(runner) = &mut self.runner else {
            self.toasts
                .warning("No decomposition engine configured, start with --engine.");
            return;
        };
        match runner.start(request) {
            Ok(run) => {
                debug!(run, "decomposition requested");
                self.dispatch(Action::DecompositionStarted);
            }
            Err(err) => {
                self.toasts.error(err.to_string());
                debug!("{:?}", err);
            }
        }
    }

    fn cancel(&mut self) {
        if let Some(runner) = &mut self.runner {
            runner.cancel();
        }
        if self.session.is_pending() {
            self.dispatch(Action::DecompositionCancelled);
        }
    }

    fn poll_engine(&mut self, ctx: &egui::Context) {
        let Some(runner) = &mut self.runner else {
            return;
        };
        match runner.poll() {
            Some(RunOutcome::Completed { run, response }) => {
                debug!(run, "decomposition received");
                self.dispatch(Action::DecompositionReady(response));
            }
            Some(RunOutcome::Failed { run, error }) => {
                debug!(run, "{:?}", error);
                self.dispatch(Action::DecompositionFailed(error.to_string()));
            }
            None => {
                if runner.is_running() {
                    ctx.request_repaint_after(Duration::from_millis(50));
                }
            }
        }
    }

    fn open(&mut self) -> anyhow::Result<()> {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Graph", &["gr"])
            .pick_file()
        else {
            return Ok(());
        };
        let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        self.dispatch(Action::Upload {
            file_name: file_name(&path),
            bytes,
        });
        Ok(())
    }

    fn save(file_name: &str, extension: &str, contents: &str) -> anyhow::Result<()> {
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(file_name)
            .add_filter(extension, &[extension])
            .save_file()
        else {
            return Ok(());
        };
        std::fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
        debug!(path = %path.display(), "saved");
        Ok(())
    }

    fn report(&mut self, result: anyhow::Result<()>) {
        if let Err(err) = result {
            self.toasts.error(err.to_string());
            debug!("{:?}", err);
        }
    }

    fn dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        for file in dropped {
            let bytes = match (file.bytes, &file.path) {
                (Some(bytes), _) => Ok(bytes.to_vec()),
                (None, Some(path)) => {
                    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
                }
                (None, None) => continue,
            };
            let file_name = if file.name.is_empty() {
                file.path.as_deref().map(file_name).unwrap_or_default()
            } else {
                file.name
            };
            match bytes {
                Ok(bytes) => self.dispatch(Action::Upload { file_name, bytes }),
                Err(err) => self.report(Err(err)),
            }
        }
    }

    fn shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let (delete, escape) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace),
                i.key_pressed(egui::Key::Escape),
            )
        });
        if delete {
            self.dispatch(Action::DeleteHighlighted);
        }
        if escape {
            if matches!(self.session.mode(), EditMode::AddEdge { .. }) {
                self.dispatch(Action::CancelAddEdge);
            } else {
                self.dispatch(Action::ClearHighlight);
            }
        }
    }

    fn file_menu(&mut self, ui: &mut egui::Ui) {
        if ui.button("Open .gr…").clicked() {
            ui.close_menu();
            let result = self.open();
            self.report(result);
        }
        if ui.button("Save source.gr…").clicked() {
            ui.close_menu();
            let result = Self::save("source.gr", "gr", &self.session.export_source());
            self.report(result);
        }
        let raw = self.session.raw_decomposition().map(str::to_owned);
        if ui
            .add_enabled(raw.is_some(), egui::Button::new("Save decomposed.td…"))
            .clicked()
        {
            ui.close_menu();
            if let Some(raw) = &raw {
                let result = Self::save("decomposed.td", "td", raw);
                self.report(result);
            }
        }
        if ui
            .add_enabled(raw.is_some(), egui::Button::new("Copy .td"))
            .clicked()
        {
            ui.close_menu();
            if let Some(raw) = raw {
                ui.ctx().copy_text(raw);
                self.toasts.success("Copied to clipboard");
            }
        }
        ui.separator();
        ui.menu_button("Samples", |ui| {
            for sample in SAMPLES {
                if ui.button(sample.name).clicked() {
                    ui.close_menu();
                    self.dispatch(Action::LoadSample(sample.name.to_owned()));
                }
            }
        });
    }

    fn details_ui(&mut self, ui: &mut egui::Ui) {
        let graph = self.session.graph();
        ui.heading("Graph");
        ui.label(format!(
            "{} vertices, {} edges",
            graph.vertex_count(),
            graph.edge_count()
        ));
        for mismatch in self.session.mismatches() {
            ui.colored_label(ui.visuals().warn_fg_color, mismatch.to_string());
        }

        ui.separator();
        ui.heading("Decomposition");
        match self.session.decomposition() {
            Some(decomposition) => {
                ui.label(format!(
                    "{} bags, width {}",
                    decomposition.bag_count(),
                    decomposition.width()
                ));
            }
            None if self.session.is_pending() => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Running…");
                });
            }
            None => {
                ui.weak("None yet");
            }
        }

        let selection = self.session.selection();
        if !selection.selected_bags().is_empty() {
            let bags: Vec<String> = selection
                .selected_bags()
                .iter()
                .map(ToString::to_string)
                .collect();
            ui.label(format!("Selected bags: {}", bags.join(", ")));
        }

        ui.separator();
        ui.heading("Groups");
        let groups = selection.displayed_groups();
        if groups.is_empty() {
            ui.weak("Drag over bags to group their vertices");
        }
        for (i, group) in groups.iter().enumerate() {
            let vertices: Vec<String> = group.iter().map(ToString::to_string).collect();
            ui.label(
                RichText::new(format!("Group {}: {}", i + 1, vertices.join(", ")))
                    .color(group_color(i)),
            );
        }

        let mut actions = Vec::new();
        ui.horizontal_wrapped(|ui| {
            if ui
                .add_enabled(
                    !selection.selected_bags().is_empty(),
                    egui::Button::new("Commit"),
                )
                .clicked()
            {
                actions.push(Action::CommitGroup);
            }
            if ui
                .add_enabled(selection.has_pending_preview(), egui::Button::new("Undo"))
                .clicked()
            {
                actions.push(Action::UndoPreview);
            }
            if ui.button("Clear groups").clicked() {
                actions.push(Action::ClearGroups);
            }
            if ui.button("Clear highlight").clicked() {
                actions.push(Action::ClearHighlight);
            }
        });

        ui.separator();
        ui.checkbox(&mut self.show_raw, "Show .td");
        if self.show_raw {
            if let Some(raw) = self.session.raw_decomposition() {
                let mut raw = raw;
                egui::ScrollArea::vertical()
                    .id_salt("raw")
                    .show(ui, |ui| {
                        ui.add(
                            egui::TextEdit::multiline(&mut raw)
                                .code_editor()
                                .desired_width(f32::INFINITY),
                        );
                    });
            }
        }

        for action in actions {
            self.dispatch(action);
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_engine(ctx);
        self.dropped_files(ctx);
        self.shortcuts(ctx);

        egui::TopBottomPanel::top("menu").show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                ui.visuals_mut().button_frame = false;
                egui::widgets::global_theme_preference_buttons(ui);

                ui.separator();

                ui.menu_button("File", |ui| self.file_menu(ui));

                ui.separator();

                if ui.button("Reset").clicked() {
                    self.graph_ui.reset();
                    self.bags_ui.reset();
                }
                if ui.button("Zoom In").clicked() {
                    self.graph_ui.zoom_in();
                    self.bags_ui.zoom_in();
                }
                if ui.button("Zoom Out").clicked() {
                    self.graph_ui.zoom_out();
                    self.bags_ui.zoom_out();
                }
                ui.label(format!("{}%", self.graph_ui.zoom_percent()));

                ui.separator();

                let adding = matches!(self.session.mode(), EditMode::AddEdge { .. });
                if ui.selectable_label(adding, "Add edge").clicked() {
                    self.dispatch(if adding {
                        Action::CancelAddEdge
                    } else {
                        Action::BeginAddEdge
                    });
                }
                if ui.button("Delete").clicked() {
                    self.dispatch(Action::DeleteHighlighted);
                }
                if ui.button("Reset graph").clicked() {
                    self.dispatch(Action::ResetGraph);
                }

                ui.separator();

                let running = self.runner.as_ref().is_some_and(Runner::is_running);
                if running {
                    ui.spinner();
                    if ui.button("Cancel").clicked() {
                        self.cancel();
                    }
                } else if ui.button(RichText::new("Decompose").strong()).clicked() {
                    self.decompose();
                }
            });
        });

        egui::SidePanel::right("details_panel").show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .id_salt("details")
                .show(ui, |ui| self.details_ui(ui));
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let mut actions = Vec::new();
            ui.columns(2, |columns| {
                actions.extend(self.graph_ui.ui(&mut columns[0], &self.session));
                actions.extend(self.bags_ui.ui(&mut columns[1], &self.session));
            });
            for action in actions {
                self.dispatch(action);
            }
        });

        self.toasts.show(ctx);
    }
}
