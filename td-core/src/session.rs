//! Application state and the reducer that is its only writer.

use derive_more::Display;
use tracing::{debug, info, warn};

use crate::{
    decomposition::{BagId, Decomposition},
    engine::{DecompositionRequest, DecompositionResponse},
    format::{StructuralMismatch, parse_source_graph, write_decomposition, write_source_graph},
    graph::{EdgeKey, GraphStore, Position, VertexId},
    layout::LayoutAdapter,
    samples,
    selection::{Highlight, SelectionState},
    upload::validate_upload,
};

#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A message for the user.
#[derive(Clone, PartialEq, Eq, Debug, Display)]
#[display("{level}: {text}")]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

/// What the caller has to act on after an [`Action`].
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Update {
    pub notices: Vec<Notice>,
    /// The graph was replaced; any engine run for the old one must stop.
    pub cancel_run: bool,
}

impl Update {
    fn notice(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self {
            notices: vec![Notice::new(level, text)],
            cancel_run: false,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum EditMode {
    #[default]
    Select,
    /// Waiting for the endpoints of a new edge.
    AddEdge { source: Option<VertexId> },
}

#[derive(Clone, PartialEq, Debug)]
pub enum Action {
    AddVertex(Position),
    ClickVertex(VertexId),
    ClickEdge(EdgeKey),
    DragVertex { id: VertexId, to: Position },
    /// Click on the empty source canvas.
    BackgroundClick,
    BeginAddEdge,
    CancelAddEdge,
    DeleteHighlighted,
    ResetGraph,
    Upload { file_name: String, bytes: Vec<u8> },
    ImportSource(String),
    LoadSample(String),
    BagPointerDown(Position),
    BagPointerMove(Position),
    BagPointerLeave,
    /// Bags whose centers lie in the finished rectangle.
    BagPointerUp(Vec<BagId>),
    BagClick(Option<BagId>),
    CommitGroup,
    ClearHighlight,
    ClearGroups,
    UndoPreview,
    DecompositionStarted,
    DecompositionReady(DecompositionResponse),
    DecompositionFailed(String),
    /// The user stopped the running decomposition.
    DecompositionCancelled,
}

/// A decomposition together with what the bag view shows of it.
#[derive(Clone, Debug)]
pub struct DecompositionView {
    pub decomposition: Decomposition,
    /// Bag tree with laid out positions, vertex ids are bag ids.
    pub tree: GraphStore,
    /// `.td` text of the decomposition.
    pub raw: String,
}

pub struct Session {
    graph: GraphStore,
    view: Option<DecompositionView>,
    selection: SelectionState,
    mode: EditMode,
    pending: bool,
    mismatches: Vec<StructuralMismatch>,
    layout: LayoutAdapter,
    extent: (f32, f32),
}

impl Session {
    #[must_use]
    pub fn new(layout: LayoutAdapter, extent: (f32, f32)) -> Self {
        Self {
            graph: GraphStore::new(),
            view: None,
            selection: SelectionState::new(),
            mode: EditMode::Select,
            pending: false,
            mismatches: Vec::new(),
            layout,
            extent,
        }
    }

    #[must_use]
    pub const fn graph(&self) -> &GraphStore {
        &self.graph
    }

    #[must_use]
    pub const fn view(&self) -> Option<&DecompositionView> {
        self.view.as_ref()
    }

    #[must_use]
    pub fn decomposition(&self) -> Option<&Decomposition> {
        self.view.as_ref().map(|view| &view.decomposition)
    }

    #[must_use]
    pub fn raw_decomposition(&self) -> Option<&str> {
        self.view.as_ref().map(|view| view.raw.as_str())
    }

    #[must_use]
    pub const fn selection(&self) -> &SelectionState {
        &self.selection
    }

    #[must_use]
    pub const fn mode(&self) -> EditMode {
        self.mode
    }

    /// Whether a decomposition has been requested and not yet answered.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending
    }

    /// Header disagreements found by the last import.
    #[must_use]
    pub fn mismatches(&self) -> &[StructuralMismatch] {
        &self.mismatches
    }

    #[must_use]
    pub fn export_source(&self) -> String {
        write_source_graph(&self.graph)
    }

    /// The engine request for the current graph, if there is anything to
    /// decompose.
    #[must_use]
    pub fn decomposition_request(&self) -> Option<DecompositionRequest> {
        (!self.graph.is_empty()).then(|| DecompositionRequest::from_store(&self.graph))
    }

    pub fn apply(&mut self, action: Action) -> Update {
        debug!(?action, "apply");
        match action {
            Action::AddVertex(position) => {
                self.graph.add_vertex(position);
                Update::notice(NoticeLevel::Success, "Vertex added!")
            }
            Action::ClickVertex(id) => self.click_vertex(id),
            Action::ClickEdge(key) => {
                self.mode = EditMode::Select;
                let decomposition = self.view.as_ref().map(|view| &view.decomposition);
                self.selection.click_edge(key, decomposition);
                Update::default()
            }
            Action::DragVertex { id, to } => {
                self.graph.set_position(id, to);
                Update::default()
            }
            Action::BackgroundClick => {
                self.mode = EditMode::Select;
                self.selection.clear_highlight();
                Update::default()
            }
            Action::BeginAddEdge => {
                let source = match self.selection.highlight() {
                    Highlight::Node(id) => Some(id),
                    _ => None,
                };
                self.mode = EditMode::AddEdge { source };
                Update::notice(
                    NoticeLevel::Info,
                    if source.is_some() {
                        "Click the vertex to connect to."
                    } else {
                        "Click the first vertex of the new edge."
                    },
                )
            }
            Action::CancelAddEdge => {
                self.mode = EditMode::Select;
                Update::default()
            }
            Action::DeleteHighlighted => self.delete_highlighted(),
            Action::ResetGraph => {
                self.replace_graph(GraphStore::new(), Vec::new());
                Update {
                    notices: vec![Notice::new(NoticeLevel::Success, "Graph editor reset!")],
                    cancel_run: true,
                }
            }
            Action::Upload { file_name, bytes } => match validate_upload(&file_name, &bytes) {
                Ok(text) => {
                    let mut update = self.import(text);
                    if update.cancel_run {
                        update.notices.insert(
                            0,
                            Notice::new(NoticeLevel::Success, "File uploaded successfully"),
                        );
                    }
                    update
                }
                Err(err) => {
                    warn!(file_name, "rejected upload: {err}");
                    Update::notice(NoticeLevel::Error, format!("{}: {err}", err.title()))
                }
            },
            Action::ImportSource(text) => self.import(&text),
            Action::LoadSample(name) => match samples::sample(&name) {
                Some(sample) => self.import(sample.text),
                None => Update::notice(NoticeLevel::Error, format!("Unknown sample `{name}`")),
            },
            Action::BagPointerDown(at) => {
                if self.view.is_some() {
                    self.selection.pointer_down(at);
                }
                Update::default()
            }
            Action::BagPointerMove(at) => {
                self.selection.pointer_move(at);
                Update::default()
            }
            Action::BagPointerLeave => {
                self.selection.pointer_leave();
                Update::default()
            }
            Action::BagPointerUp(hits) => {
                if let Some(view) = &self.view {
                    self.selection.pointer_up(&hits, &view.decomposition);
                }
                Update::default()
            }
            Action::BagClick(hit) => {
                if let Some(view) = &self.view {
                    self.selection.click_bag(hit, &view.decomposition);
                }
                Update::default()
            }
            Action::CommitGroup => {
                if let Some(view) = &self.view {
                    self.selection.commit(&view.decomposition);
                }
                Update::default()
            }
            Action::ClearHighlight => {
                self.selection.clear_highlight();
                Update::default()
            }
            Action::ClearGroups => {
                self.selection.clear_groups();
                Update::default()
            }
            Action::UndoPreview => {
                self.selection.undo_preview();
                Update::default()
            }
            Action::DecompositionStarted => {
                self.pending = true;
                Update::default()
            }
            Action::DecompositionReady(response) => self.ingest(response),
            Action::DecompositionFailed(reason) => {
                self.pending = false;
                Update::notice(
                    NoticeLevel::Error,
                    format!("Decomposition failed: {reason}"),
                )
            }
            Action::DecompositionCancelled => {
                if !std::mem::take(&mut self.pending) {
                    return Update::default();
                }
                Update::notice(NoticeLevel::Info, "Decomposition cancelled")
            }
        }
    }

    fn click_vertex(&mut self, id: VertexId) -> Update {
        match self.mode {
            EditMode::Select => {
                self.selection.click_node(id);
                Update::default()
            }
            EditMode::AddEdge { source: None } => {
                self.mode = EditMode::AddEdge { source: Some(id) };
                Update::default()
            }
            EditMode::AddEdge {
                source: Some(source),
            } => {
                if source == id {
                    return Update::default();
                }
                self.mode = EditMode::Select;
                match self.graph.add_edge(source, id) {
                    Some(_) => Update::notice(NoticeLevel::Success, "Edge added!"),
                    None => {
                        Update::notice(NoticeLevel::Warning, "Those vertices are already connected.")
                    }
                }
            }
        }
    }

    fn delete_highlighted(&mut self) -> Update {
        let update = match self.selection.highlight() {
            Highlight::Node(id) => {
                self.graph.remove_connected_edges(id);
                self.graph.remove_vertex(id);
                Update::notice(NoticeLevel::Success, "Vertex deleted!")
            }
            Highlight::Edge(key) => {
                self.graph.remove_edge(key);
                Update::notice(NoticeLevel::Success, "Edge deleted!")
            }
            Highlight::None => {
                return Update::notice(NoticeLevel::Info, "Select a vertex or an edge first.");
            }
        };
        self.selection.clear_highlight();
        update
    }

    fn import(&mut self, text: &str) -> Update {
        let parsed = match parse_source_graph(text) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("import failed: {err}");
                return Update::notice(NoticeLevel::Error, format!("Could not read graph: {err}"));
            }
        };
        let mut graph = GraphStore::from_parts(
            parsed
                .value
                .vertices
                .iter()
                .map(|id| (*id, Position::default())),
            parsed.value.edges.iter().copied(),
        );
        self.layout.apply(&mut graph, self.extent);
        info!(
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            "graph imported"
        );

        let mut update = Update {
            notices: Vec::new(),
            cancel_run: true,
        };
        if !parsed.mismatches.is_empty() {
            update.notices.push(Notice::new(
                NoticeLevel::Warning,
                format!("Header does not match contents: {}", parsed.mismatches[0]),
            ));
        }
        self.replace_graph(graph, parsed.mismatches);
        update
    }

    fn replace_graph(&mut self, graph: GraphStore, mismatches: Vec<StructuralMismatch>) {
        // keep ids handed out so far unused
        let mut next = std::mem::take(&mut self.graph);
        next.rewrite(
            graph.vertices().map(|v| (v.id, v.position)),
            graph.edges(),
        );
        self.graph = next;
        self.view = None;
        self.selection.reset();
        self.mode = EditMode::Select;
        self.pending = false;
        self.mismatches = mismatches;
    }

    fn ingest(&mut self, response: DecompositionResponse) -> Update {
        self.pending = false;
        let decomposition = response.into_decomposition();
        let mut tree = decomposition.tree_store();
        self.layout.apply(&mut tree, self.extent);
        let raw = write_decomposition(&decomposition);
        let width = decomposition.width();
        info!(bags = decomposition.bag_count(), width, "decomposition ingested");
        self.selection.reset();
        self.view = Some(DecompositionView {
            decomposition,
            tree,
            raw,
        });
        Update::notice(
            NoticeLevel::Success,
            format!("Decomposition ready, width {width}"),
        )
    }
}
