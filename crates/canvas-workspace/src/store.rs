//! Workspace store
//!
//! Owns the canonical node/edge/section collections of both views, the two
//! [`ViewState`]s and the live viewport of the active view. A spatial index
//! over the active view's nodes is built lazily on first query and dropped
//! whenever the node collection or the active view changes.

use crate::error::WorkspaceError;
use crate::highlight::Highlighter;
use canvas_model::{
    Edge, EdgeId, NewNode, Node, NodeId, NodePatch, Point, Rect, Section, SectionId, Size,
    ViewState, ViewStates, ViewType, Viewport, WorkspaceSnapshot,
};
use canvas_spatial::SpatialIndex;
use chrono::Utc;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;

/// Layout defaults for the store
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Width assumed for nodes without an explicit size
    pub default_node_width: f64,
    /// Height assumed for nodes without an explicit size
    pub default_node_height: f64,
    /// Offset applied to a promoted copy relative to its original
    pub promote_offset: Point,
    /// How long a navigation highlight stays visible
    pub highlight_hold_ms: u64,
}

impl LayoutConfig {
    #[inline]
    #[must_use]
    pub fn default_node_size(&self) -> Size {
        Size::new(self.default_node_width, self.default_node_height)
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            default_node_width: 280.0,
            default_node_height: 160.0,
            promote_offset: Point::new(40.0, 40.0),
            highlight_hold_ms: 3_000,
        }
    }
}

/// What a clear removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearStats {
    pub nodes: usize,
    pub edges: usize,
    pub sections: usize,
}

/// Canonical in-memory workspace state
#[derive(Debug)]
pub struct WorkspaceStore {
    config: LayoutConfig,
    nodes: IndexMap<NodeId, Node>,
    edges: IndexMap<EdgeId, Edge>,
    sections: IndexMap<SectionId, Section>,
    view_states: ViewStates,
    active_view: ViewType,
    /// Live viewport of the active view
    viewport: Viewport,
    index: OnceLock<SpatialIndex>,
    highlighter: Highlighter,
}

impl WorkspaceStore {
    /// Create an empty store
    #[must_use]
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
            sections: IndexMap::new(),
            view_states: ViewStates::default(),
            active_view: ViewType::Free,
            viewport: Viewport::default(),
            index: OnceLock::new(),
            highlighter: Highlighter::new(Duration::from_millis(config.highlight_hold_ms)),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    // ---------------------------------------------------------------------
    // Nodes
    // ---------------------------------------------------------------------

    /// Add a node to the active view
    pub fn add_node(&mut self, node: NewNode) -> NodeId {
        self.add_node_to_view(node, self.active_view)
    }

    /// Add a node to a specific view
    pub fn add_node_to_view(&mut self, node: NewNode, view: ViewType) -> NodeId {
        let node = Node::create(node, view, Utc::now());
        let id = node.id();
        self.nodes.insert(id, node);
        self.invalidate_index();
        id
    }

    #[inline]
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Mutable access for non-geometric edits
    ///
    /// Callers must not change position or size through this handle; use
    /// [`move_node`](Self::move_node) or [`update_node`](Self::update_node)
    /// so the spatial index is refreshed.
    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Nodes belonging to one view
    pub fn nodes_in_view(&self, view: ViewType) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(move |n| n.view() == view)
    }

    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Edit title, content, tags or size
    pub fn update_node(&mut self, id: NodeId, patch: NodePatch) -> Result<(), WorkspaceError> {
        let resized = patch.size.is_some();
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(WorkspaceError::NodeNotFound(id))?;
        node.apply(patch, Utc::now());
        if resized {
            self.invalidate_index();
        }
        Ok(())
    }

    /// Move one node
    pub fn move_node(&mut self, id: NodeId, position: Point) -> Result<(), WorkspaceError> {
        self.move_nodes(&[(id, position)])
    }

    /// Move several nodes at once (e.g. drag release)
    ///
    /// Either every node moves or none does.
    pub fn move_nodes(&mut self, moves: &[(NodeId, Point)]) -> Result<(), WorkspaceError> {
        if let Some((missing, _)) = moves.iter().find(|(id, _)| !self.nodes.contains_key(id)) {
            return Err(WorkspaceError::NodeNotFound(*missing));
        }
        let now = Utc::now();
        for (id, position) in moves {
            if let Some(node) = self.nodes.get_mut(id) {
                node.position = *position;
                node.updated_at = now;
            }
        }
        self.invalidate_index();
        Ok(())
    }

    /// Delete a node together with its incident edges and selection entries
    pub fn delete_node(&mut self, id: NodeId) -> Result<Node, WorkspaceError> {
        let node = self
            .nodes
            .shift_remove(&id)
            .ok_or(WorkspaceError::NodeNotFound(id))?;
        self.edges.retain(|_, edge| !edge.touches(id));
        for state in self.view_states.iter_mut() {
            state.selected_node_ids.retain(|selected| *selected != id);
        }
        if self.highlighter.current() == Some(id) {
            self.highlighter.clear();
        }
        self.invalidate_index();
        tracing::debug!("Deleted node {}", id);
        Ok(node)
    }

    /// Copy a thinking-view node into the free view
    ///
    /// The original is left untouched; the copy is offset on the canvas,
    /// detached from any section and records `promoted_from`.
    pub fn promote_node(&mut self, id: NodeId) -> Result<NodeId, WorkspaceError> {
        let original = self.nodes.get(&id).ok_or(WorkspaceError::NodeNotFound(id))?;
        if original.view() != ViewType::Thinking {
            return Err(WorkspaceError::NotPromotable {
                node: id,
                view: original.view(),
            });
        }
        let copy = original.promoted_copy(self.config.promote_offset, Utc::now());
        let copy_id = copy.id();
        self.nodes.insert(copy_id, copy);
        self.invalidate_index();
        tracing::info!("Promoted thinking node {} to free node {}", id, copy_id);
        Ok(copy_id)
    }

    // ---------------------------------------------------------------------
    // Edges
    // ---------------------------------------------------------------------

    /// Connect two existing nodes
    pub fn add_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        label: Option<String>,
    ) -> Result<EdgeId, WorkspaceError> {
        if source == target {
            return Err(WorkspaceError::SelfLoop(source));
        }
        for id in [source, target] {
            if !self.nodes.contains_key(&id) {
                return Err(WorkspaceError::NodeNotFound(id));
            }
        }
        Ok(self.insert_edge(Edge::new(source, target, label)))
    }

    /// Insert an edge whose endpoints the caller has just established
    pub(crate) fn insert_edge(&mut self, edge: Edge) -> EdgeId {
        let id = edge.id;
        self.edges.insert(id, edge);
        id
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Result<Edge, WorkspaceError> {
        self.edges
            .shift_remove(&id)
            .ok_or(WorkspaceError::EdgeNotFound(id))
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    #[inline]
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    // ---------------------------------------------------------------------
    // Sections
    // ---------------------------------------------------------------------

    /// Create a section in the active view
    pub fn add_section(&mut self, title: impl Into<String>) -> SectionId {
        let section = Section {
            id: SectionId::new(),
            title: title.into(),
            view: self.active_view,
            created_at: Utc::now(),
        };
        let id = section.id;
        self.sections.insert(id, section);
        id
    }

    /// Put a node into a section, or take it out with `None`
    pub fn assign_to_section(
        &mut self,
        node: NodeId,
        section: Option<SectionId>,
    ) -> Result<(), WorkspaceError> {
        if let Some(section) = section {
            if !self.sections.contains_key(&section) {
                return Err(WorkspaceError::SectionNotFound(section));
            }
        }
        let node = self
            .nodes
            .get_mut(&node)
            .ok_or(WorkspaceError::NodeNotFound(node))?;
        node.section_id = section;
        node.updated_at = Utc::now();
        Ok(())
    }

    /// Remove a section without touching its members
    ///
    /// Member nodes keep their (now dangling) `section_id`.
    pub fn delete_section(&mut self, id: SectionId) -> Result<Section, WorkspaceError> {
        let section = self
            .sections
            .shift_remove(&id)
            .ok_or(WorkspaceError::SectionNotFound(id))?;
        for state in self.view_states.iter_mut() {
            state.collapsed_section_ids.retain(|collapsed| *collapsed != id);
        }
        Ok(section)
    }

    /// Flip a section's collapsed flag; returns the new state
    pub fn toggle_section_collapsed(&mut self, id: SectionId) -> Result<bool, WorkspaceError> {
        let view = self
            .sections
            .get(&id)
            .map(|s| s.view)
            .ok_or(WorkspaceError::SectionNotFound(id))?;
        let collapsed = &mut self.view_states.get_mut(view).collapsed_section_ids;
        if let Some(pos) = collapsed.iter().position(|c| *c == id) {
            collapsed.remove(pos);
            Ok(false)
        } else {
            collapsed.push(id);
            Ok(true)
        }
    }

    #[inline]
    #[must_use]
    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.get(&id)
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.values()
    }

    // ---------------------------------------------------------------------
    // Clearing
    // ---------------------------------------------------------------------

    /// Remove local state for one view, or everything with `None`
    ///
    /// Edges touching a removed node are removed as well, even when they
    /// belong to the other view's side of the graph. This is the local half
    /// of a canvas clear; the persistence round-trip happens first in the
    /// engine.
    pub fn clear_local(&mut self, view: Option<ViewType>) -> ClearStats {
        let before = (self.nodes.len(), self.edges.len(), self.sections.len());

        match view {
            None => {
                self.nodes.clear();
                self.edges.clear();
                self.sections.clear();
                for state in self.view_states.iter_mut() {
                    state.selected_node_ids.clear();
                    state.collapsed_section_ids.clear();
                }
                self.highlighter.clear();
            }
            Some(view) => {
                let removed: HashSet<NodeId> = self
                    .nodes_in_view(view)
                    .map(Node::id)
                    .collect();
                self.nodes.retain(|id, _| !removed.contains(id));
                self.edges
                    .retain(|_, e| !removed.contains(&e.source) && !removed.contains(&e.target));
                self.sections.retain(|_, s| s.view != view);
                let state = self.view_states.get_mut(view);
                state.selected_node_ids.clear();
                state.collapsed_section_ids.clear();
                if self.highlighter.current().is_some_and(|h| removed.contains(&h)) {
                    self.highlighter.clear();
                }
            }
        }
        self.invalidate_index();

        ClearStats {
            nodes: before.0 - self.nodes.len(),
            edges: before.1 - self.edges.len(),
            sections: before.2 - self.sections.len(),
        }
    }

    // ---------------------------------------------------------------------
    // Views
    // ---------------------------------------------------------------------

    #[inline]
    #[must_use]
    pub fn active_view(&self) -> ViewType {
        self.active_view
    }

    /// Live viewport of the active view
    #[inline]
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Pan/zoom the active view
    #[inline]
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Stored state of a view
    ///
    /// For the active view the stored viewport may lag the live one until
    /// the next switch; use [`viewport`](Self::viewport) for rendering.
    #[inline]
    #[must_use]
    pub fn view_state(&self, view: ViewType) -> &ViewState {
        self.view_states.get(view)
    }

    /// Switch the active view
    ///
    /// Writes the live viewport back into the outgoing view's state, then
    /// restores the incoming view's stored viewport. Both happen within this
    /// single call, so back-to-back switches cannot lose a viewport.
    pub fn switch_view(&mut self, target: ViewType) {
        let outgoing = self.active_view;
        self.view_states.get_mut(outgoing).viewport = self.viewport;
        self.active_view = target;
        self.viewport = self.view_states.get(target).viewport;
        if outgoing != target {
            self.invalidate_index();
            tracing::debug!("Switched view {} -> {}", outgoing, target);
        }
    }

    // ---------------------------------------------------------------------
    // Selection and hit-testing
    // ---------------------------------------------------------------------

    /// Spatial index over the active view, rebuilt if stale
    pub fn spatial_index(&self) -> &SpatialIndex {
        self.index.get_or_init(|| {
            SpatialIndex::build(
                self.nodes_in_view(self.active_view),
                self.config.default_node_width,
                self.config.default_node_height,
            )
        })
    }

    /// Box-select nodes of the active view
    ///
    /// With `additive` the hits are added to the current selection;
    /// otherwise they replace it. Returns the resulting selection.
    pub fn select_in_rect(&mut self, rect: Rect, additive: bool) -> Vec<NodeId> {
        let hits = self.spatial_index().query_ids(rect);
        let ordered: Vec<NodeId> = self
            .nodes_in_view(self.active_view)
            .map(Node::id)
            .filter(|id| hits.contains(id))
            .collect();

        let selected = &mut self.view_states.get_mut(self.active_view).selected_node_ids;
        if !additive {
            selected.clear();
        }
        for id in ordered {
            if !selected.contains(&id) {
                selected.push(id);
            }
        }
        selected.clone()
    }

    /// Replace the active view's selection, ignoring ids not in that view
    pub fn select_nodes(&mut self, ids: &[NodeId]) {
        let view = self.active_view;
        let valid: IndexSet<NodeId> = ids
            .iter()
            .copied()
            .filter(|id| self.nodes.get(id).is_some_and(|n| n.view() == view))
            .collect();
        self.view_states.get_mut(view).selected_node_ids = valid.into_iter().collect();
    }

    pub fn clear_selection(&mut self) {
        self.view_states
            .get_mut(self.active_view)
            .selected_node_ids
            .clear();
    }

    /// Selection of the active view
    #[must_use]
    pub fn selected(&self) -> &[NodeId] {
        &self.view_states.get(self.active_view).selected_node_ids
    }

    /// Active-view nodes under a canvas point
    #[must_use]
    pub fn nodes_at(&self, point: Point) -> Vec<NodeId> {
        self.spatial_index().hit_test(point)
    }

    // ---------------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------------

    /// Highlight a node, switching to its view first if necessary
    ///
    /// The highlight clears itself after the configured hold; a later call
    /// supersedes an earlier one.
    pub fn navigate_to_node(&mut self, id: NodeId) -> Result<(), WorkspaceError> {
        let view = self
            .nodes
            .get(&id)
            .map(Node::view)
            .ok_or(WorkspaceError::NodeNotFound(id))?;
        if view != self.active_view {
            self.switch_view(view);
        }
        self.highlighter.highlight(id);
        Ok(())
    }

    /// Node currently highlighted by navigation
    #[inline]
    #[must_use]
    pub fn highlighted(&self) -> Option<NodeId> {
        self.highlighter.current()
    }

    // ---------------------------------------------------------------------
    // Snapshots
    // ---------------------------------------------------------------------

    /// Capture the full workspace for persistence
    #[must_use]
    pub fn snapshot(&self) -> WorkspaceSnapshot {
        let mut view_states = self.view_states.clone();
        view_states.get_mut(self.active_view).viewport = self.viewport;
        WorkspaceSnapshot {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
            sections: self.sections.values().cloned().collect(),
            viewport: self.viewport,
            view_states,
            active_view: self.active_view,
        }
    }

    /// Replace all local state with a loaded snapshot
    ///
    /// Edges referencing nodes absent from the snapshot are dropped.
    pub fn replace_with_snapshot(&mut self, snapshot: WorkspaceSnapshot) {
        self.nodes = snapshot.nodes.into_iter().map(|n| (n.id(), n)).collect();
        let nodes = &self.nodes;
        self.edges = snapshot
            .edges
            .into_iter()
            .filter(|e| nodes.contains_key(&e.source) && nodes.contains_key(&e.target))
            .map(|e| (e.id, e))
            .collect();
        self.sections = snapshot.sections.into_iter().map(|s| (s.id, s)).collect();
        self.view_states = snapshot.view_states;
        self.view_states.free.view = ViewType::Free;
        self.view_states.thinking.view = ViewType::Thinking;
        self.active_view = snapshot.active_view;
        self.viewport = snapshot.viewport;
        self.highlighter.clear();
        self.invalidate_index();
    }

    fn invalidate_index(&mut self) {
        self.index.take();
    }
}

impl Default for WorkspaceStore {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}
