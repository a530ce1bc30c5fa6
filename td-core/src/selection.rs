use tracing::{error, trace};

use crate::{
    decomposition::{BagId, Decomposition},
    graph::{EdgeKey, Position, VertexId},
};

/// The source-graph element under the user's focus.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum Highlight {
    #[default]
    None,
    Node(VertexId),
    Edge(EdgeKey),
}

/// Pointer state on the bag canvas, in logical coordinates.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct Gesture {
    pub active: bool,
    pub dragged: bool,
    pub origin: Position,
    pub current: Position,
}

/// Highlight, bag selection and group stacks.
///
/// `preview_groups` is always `committed_groups` plus at most one pending
/// entry, and `committed_bag_groups` runs parallel to `committed_groups`.
/// Every transition is total; combinations that make no sense are no-ops.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct SelectionState {
    highlight: Highlight,
    edge_indicator: Option<BagId>,
    selected_bags: Vec<BagId>,
    preview_groups: Vec<Vec<VertexId>>,
    committed_groups: Vec<Vec<VertexId>>,
    committed_bag_groups: Vec<Vec<BagId>>,
    color_index: usize,
    gesture: Gesture,
}

impl SelectionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn highlight(&self) -> Highlight {
        self.highlight
    }

    /// Bag shown as covering the highlighted edge.
    #[must_use]
    pub const fn edge_indicator(&self) -> Option<BagId> {
        self.edge_indicator
    }

    #[must_use]
    pub fn selected_bags(&self) -> &[BagId] {
        &self.selected_bags
    }

    #[must_use]
    pub fn preview_groups(&self) -> &[Vec<VertexId>] {
        &self.preview_groups
    }

    #[must_use]
    pub fn committed_groups(&self) -> &[Vec<VertexId>] {
        &self.committed_groups
    }

    #[must_use]
    pub fn committed_bag_groups(&self) -> &[Vec<BagId>] {
        &self.committed_bag_groups
    }

    /// Palette index the next committed group will take.
    #[must_use]
    pub const fn color_index(&self) -> usize {
        self.color_index
    }

    #[must_use]
    pub const fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    #[must_use]
    pub fn has_pending_preview(&self) -> bool {
        self.preview_groups.len() > self.committed_groups.len()
    }

    fn has_groups(&self) -> bool {
        !self.preview_groups.is_empty() || !self.committed_groups.is_empty()
    }

    /// Groups to draw on the source graph; group `i` takes palette entry `i`.
    #[must_use]
    pub fn displayed_groups(&self) -> &[Vec<VertexId>] {
        if self.has_pending_preview() {
            &self.preview_groups
        } else {
            &self.committed_groups
        }
    }

    /// Indices into [`SelectionState::displayed_groups`] of the groups holding
    /// `vertex`.
    pub fn groups_containing(&self, vertex: VertexId) -> impl Iterator<Item = usize> + '_ {
        self.displayed_groups()
            .iter()
            .enumerate()
            .filter(move |(_, group)| group.binary_search(&vertex).is_ok())
            .map(|(i, _)| i)
    }

    /// Group index a bag is colored with: the pending group while it is
    /// selected, otherwise the latest committed group that includes it.
    #[must_use]
    pub fn bag_group_index(&self, bag: BagId) -> Option<usize> {
        if self.selected_bags.contains(&bag) {
            return Some(self.committed_bag_groups.len());
        }
        self.committed_bag_groups
            .iter()
            .rposition(|group| group.contains(&bag))
    }

    /// Corners of the rubber band while a drag is in progress.
    #[must_use]
    pub fn selection_rect(&self) -> Option<(Position, Position)> {
        (self.gesture.active && self.gesture.dragged)
            .then_some((self.gesture.origin, self.gesture.current))
    }

    /// Toggles the highlight of a source vertex.
    pub fn click_node(&mut self, id: VertexId) {
        self.leave_group_view();
        self.highlight = if self.highlight == Highlight::Node(id) {
            Highlight::None
        } else {
            Highlight::Node(id)
        };
        self.selected_bags.clear();
        self.edge_indicator = None;
        trace!(highlight = ?self.highlight, "node clicked");
        self.repair();
    }

    /// Toggles the highlight of a source edge and points at the first bag
    /// covering it.
    pub fn click_edge(&mut self, key: EdgeKey, decomposition: Option<&Decomposition>) {
        self.leave_group_view();
        self.selected_bags.clear();
        if self.highlight == Highlight::Edge(key) {
            self.highlight = Highlight::None;
            self.edge_indicator = None;
        } else {
            self.highlight = Highlight::Edge(key);
            self.edge_indicator = decomposition.and_then(|d| d.bag_containing_edge(key));
        }
        trace!(highlight = ?self.highlight, indicator = ?self.edge_indicator, "edge clicked");
        self.repair();
    }

    fn leave_group_view(&mut self) {
        if self.has_groups() {
            trace!("source interaction resets groups");
            self.clear_groups();
            self.clear_highlight();
        }
    }

    pub fn pointer_down(&mut self, at: Position) {
        self.clear_highlight();
        self.undo_preview();
        self.gesture = Gesture {
            active: true,
            dragged: false,
            origin: at,
            current: at,
        };
        trace!(?at, "rectangle selection started");
    }

    pub fn pointer_move(&mut self, at: Position) {
        if self.gesture.active {
            self.gesture.current = at;
            self.gesture.dragged = true;
        }
    }

    /// Abandons a rectangle without selecting anything.
    pub fn pointer_leave(&mut self) {
        self.gesture.active = false;
    }

    /// Ends a rectangle; `hits` are the bags whose centers lie inside it.
    pub fn pointer_up(&mut self, hits: &[BagId], decomposition: &Decomposition) {
        if !self.gesture.active {
            return;
        }
        self.gesture.active = false;
        self.select_bags(hits, decomposition);
    }

    /// A click on the bag canvas. A click that ends a drag is swallowed.
    pub fn click_bag(&mut self, hit: Option<BagId>, decomposition: &Decomposition) {
        if self.gesture.dragged {
            self.gesture.dragged = false;
            return;
        }
        self.clear_highlight();
        self.undo_preview();
        if let Some(bag) = hit {
            self.select_bags(&[bag], decomposition);
        }
    }

    /// Makes `bags` the selection and previews their vertex union. An empty
    /// set changes nothing.
    pub fn select_bags(&mut self, bags: &[BagId], decomposition: &Decomposition) {
        if bags.is_empty() {
            return;
        }
        self.highlight = Highlight::None;
        self.edge_indicator = None;
        self.selected_bags = bags.to_vec();
        let union = decomposition.union_of(bags);
        if self.has_pending_preview() {
            self.preview_groups.pop();
        }
        self.preview_groups.push(union);
        trace!(selected = ?self.selected_bags, "bags selected");
        self.repair();
    }

    /// Turns the current selection into a committed group with the next
    /// color.
    pub fn commit(&mut self, decomposition: &Decomposition) {
        if self.selected_bags.is_empty() {
            return;
        }
        let union = decomposition.union_of(&self.selected_bags);
        self.committed_groups.push(union);
        self.committed_bag_groups
            .push(std::mem::take(&mut self.selected_bags));
        self.preview_groups.clone_from(&self.committed_groups);
        self.color_index += 1;
        trace!(groups = self.committed_groups.len(), "group committed");
        self.repair();
    }

    pub fn clear_highlight(&mut self) {
        self.highlight = Highlight::None;
        self.selected_bags.clear();
        self.edge_indicator = None;
    }

    pub fn clear_groups(&mut self) {
        self.preview_groups.clear();
        self.committed_groups.clear();
        self.committed_bag_groups.clear();
        self.color_index = 0;
    }

    /// Drops the pending preview entry, if there is one.
    pub fn undo_preview(&mut self) {
        if self.has_pending_preview() {
            self.preview_groups.truncate(self.committed_groups.len());
        }
    }

    /// Forgets everything tied to a particular decomposition.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn repair(&mut self) {
        let committed = self.committed_groups.len();
        if self.preview_groups.len() < committed
            || self.preview_groups.len() > committed + 1
            || self.preview_groups[..committed] != self.committed_groups[..]
        {
            error!(
                preview = self.preview_groups.len(),
                committed, "preview groups out of step with committed groups"
            );
            self.preview_groups.clone_from(&self.committed_groups);
        }
        if self.committed_bag_groups.len() != committed {
            error!(
                bag_groups = self.committed_bag_groups.len(),
                committed, "bag groups out of step with committed groups"
            );
            self.committed_bag_groups.truncate(committed);
            self.committed_groups.truncate(self.committed_bag_groups.len());
            self.preview_groups.truncate(self.committed_groups.len());
        }
        if self.highlight != Highlight::None && !self.selected_bags.is_empty() {
            error!("highlight and bag selection both set");
            self.selected_bags.clear();
        }
    }
}
