//! Thinking graph construction
//!
//! Every user message becomes a draft thinking step, placed relative to the
//! active thread and later finalized with the backend's analysis.
//!
//! # Layout
//! - Child of the active step: one `step_distance` to the right of the
//!   parent, one `row_height` further down per existing sibling.
//! - New root (no active step): below the lowest existing root, or at the
//!   origin for the first root.

use crate::store::WorkspaceStore;
use canvas_model::{
    Analysis, Edge, MessageId, NewNode, Node, NodeId, NodeKind, Point, StepAnalysis,
    ThinkingStep, ViewType,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Placement and text limits for drafted steps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThinkingConfig {
    /// Horizontal distance from parent to child
    pub step_distance: f64,
    /// Vertical distance between siblings and between roots
    pub row_height: f64,
    /// Position of the first root
    pub origin: Point,
    /// Maximum characters of message text kept as draft content
    pub preview_chars: usize,
    /// Maximum characters of the provisional title
    pub title_chars: usize,
}

impl Default for ThinkingConfig {
    fn default() -> Self {
        Self {
            step_distance: 360.0,
            row_height: 200.0,
            origin: Point::new(80.0, 80.0),
            preview_chars: 160,
            title_chars: 48,
        }
    }
}

/// Inbound user message driving a new step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMessage {
    pub id: MessageId,
    pub text: String,
}

impl UserMessage {
    #[must_use]
    pub fn new(id: impl Into<MessageId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Incremental builder of the conversation-derived thinking graph
#[derive(Debug, Clone, Default)]
pub struct ThinkingGraphBuilder {
    config: ThinkingConfig,
    /// Most recently drafted or finalized step
    active: Option<NodeId>,
    step_counter: u64,
}

impl ThinkingGraphBuilder {
    #[must_use]
    pub fn new(config: ThinkingConfig) -> Self {
        Self {
            config,
            active: None,
            step_counter: 0,
        }
    }

    /// Pick up numbering after a workspace load
    ///
    /// The step counter continues from the highest stored step number; the
    /// active thread starts empty.
    #[must_use]
    pub fn resume(config: ThinkingConfig, store: &WorkspaceStore) -> Self {
        let step_counter = store
            .nodes_in_view(ViewType::Thinking)
            .filter_map(Node::thinking_step)
            .map(|step| step.step_number)
            .max()
            .unwrap_or(0);
        Self {
            config,
            active: None,
            step_counter,
        }
    }

    #[inline]
    #[must_use]
    pub fn active_step(&self) -> Option<NodeId> {
        self.active
    }

    #[inline]
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.step_counter
    }

    /// Create a draft step for `message` and make it the active thread
    ///
    /// Returns the draft's id for later correlation.
    pub fn append_draft_step(&mut self, store: &mut WorkspaceStore, message: &UserMessage) -> NodeId {
        self.step_counter += 1;
        let step_number = self.step_counter;
        let (position, depth, parent) = self.place(store);

        let title = provisional_title(&message.text, self.config.title_chars)
            .unwrap_or_else(|| format!("Step {step_number}"));
        let kind = NodeKind::ThinkingStep(ThinkingStep {
            step_number,
            depth,
            parent_step: parent,
            message_id: Some(message.id.clone()),
            analysis: Analysis::Pending,
            related_concepts: Vec::new(),
            suggested_branches: Vec::new(),
        });
        let draft = NewNode::with_kind(title, preview(&message.text, self.config.preview_chars), kind)
            .at(position)
            .with_tags(vec![Node::DRAFT_TAG.to_string()]);

        let id = store.add_node_to_view(draft, ViewType::Thinking);
        if let Some(parent) = parent {
            store.insert_edge(Edge::new(parent, id, None));
        }
        self.active = Some(id);

        tracing::debug!(
            "Drafted thinking step {} (#{}, depth {}) for message {}",
            id,
            step_number,
            depth,
            message.id
        );
        id
    }

    /// Merge backend analysis into the draft created for `message_id`
    ///
    /// Returns `None` without touching the store when no pending draft
    /// matches, e.g. because the draft was deleted or already finalized.
    pub fn finalize_thinking_step(
        &mut self,
        store: &mut WorkspaceStore,
        message_id: &MessageId,
        analysis: StepAnalysis,
    ) -> Option<NodeId> {
        let Some(id) = find_draft(store, message_id) else {
            tracing::debug!("No pending draft for message {}; ignoring analysis", message_id);
            return None;
        };

        let node = store.node_mut(id)?;
        if let Some(title) = analysis.title.filter(|t| !t.trim().is_empty()) {
            node.title = title;
        }
        node.tags.retain(|tag| tag != Node::DRAFT_TAG);
        node.updated_at = Utc::now();
        if let Some(step) = node.thinking_step_mut() {
            step.analysis = Analysis::Analyzed(analysis.fields);
            merge_unique(&mut step.related_concepts, analysis.related_concepts);
            merge_unique(&mut step.suggested_branches, analysis.suggested_branches);
        }
        self.active = Some(id);

        tracing::debug!("Finalized thinking step {} for message {}", id, message_id);
        Some(id)
    }

    /// Detach from the active thread so the next step starts a new root
    pub fn start_new_topic(&mut self) {
        self.active = None;
    }

    /// Position, depth and parent for the next step
    fn place(&self, store: &WorkspaceStore) -> (Point, u32, Option<NodeId>) {
        let parent = self
            .active
            .and_then(|id| store.node(id))
            .filter(|node| node.view() == ViewType::Thinking)
            .and_then(|node| node.thinking_step().map(|step| (node, step)));

        if let Some((parent, step)) = parent {
            let siblings = store
                .nodes_in_view(ViewType::Thinking)
                .filter_map(Node::thinking_step)
                .filter(|s| s.parent_step == Some(parent.id()))
                .count();
            let position = parent
                .position
                .offset(self.config.step_distance, row_offset(siblings, self.config.row_height));
            return (position, step.depth + 1, Some(parent.id()));
        }

        let lowest_root = store
            .nodes_in_view(ViewType::Thinking)
            .filter(|node| node.thinking_step().is_some_and(|s| s.parent_step.is_none()))
            .map(|node| node.position.y)
            .fold(None, |acc: Option<f64>, y| Some(acc.map_or(y, |a| a.max(y))));
        let y = lowest_root.map_or(self.config.origin.y, |y| y + self.config.row_height);
        (Point::new(self.config.origin.x, y), 0, None)
    }
}

fn find_draft(store: &WorkspaceStore, message_id: &MessageId) -> Option<NodeId> {
    store
        .nodes_in_view(ViewType::Thinking)
        .find(|node| {
            node.thinking_step()
                .is_some_and(|s| s.is_draft() && s.message_id.as_ref() == Some(message_id))
        })
        .map(Node::id)
}

#[allow(clippy::cast_precision_loss)]
fn row_offset(rows: usize, row_height: f64) -> f64 {
    rows as f64 * row_height
}

/// Bounded preview of message text, with an ellipsis when cut
fn preview(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push('…');
    cut
}

fn provisional_title(text: &str, max_chars: usize) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| preview(line, max_chars))
}

fn merge_unique(target: &mut Vec<String>, incoming: Vec<String>) {
    for item in incoming {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_model::{AnalysisStatus, ThinkingFields};

    fn analysis(claim: &str) -> StepAnalysis {
        StepAnalysis {
            title: Some(format!("Claim: {claim}")),
            fields: ThinkingFields {
                claim: Some(claim.to_string()),
                decision: Some("explore".to_string()),
                ..ThinkingFields::default()
            },
            related_concepts: vec!["entropy".into()],
            suggested_branches: vec!["What about Y?".into()],
        }
    }

    fn step(store: &WorkspaceStore, id: NodeId) -> &ThinkingStep {
        store.node(id).and_then(Node::thinking_step).unwrap()
    }

    #[test]
    fn first_draft_is_root_second_chains_as_child() {
        let mut store = WorkspaceStore::default();
        let mut builder = ThinkingGraphBuilder::default();

        let first = builder.append_draft_step(&mut store, &UserMessage::new("m1", "Why is X true?"));
        assert_eq!(step(&store, first).depth, 0);
        assert_eq!(step(&store, first).parent_step, None);
        assert_eq!(store.edge_count(), 0);
        assert_eq!(store.node(first).unwrap().position, Point::new(80.0, 80.0));

        let second = builder.append_draft_step(&mut store, &UserMessage::new("m2", "And Y?"));
        assert_eq!(step(&store, second).depth, 1);
        assert_eq!(step(&store, second).parent_step, Some(first));
        let edges: Vec<_> = store.edges().filter(|e| e.target == second).collect();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source, first);
        assert_eq!(store.node(second).unwrap().position, Point::new(440.0, 80.0));
        assert_eq!(builder.active_step(), Some(second));
    }

    #[test]
    fn siblings_stack_below_each_other() {
        let mut store = WorkspaceStore::default();
        let mut builder = ThinkingGraphBuilder::default();
        let root = builder.append_draft_step(&mut store, &UserMessage::new("m1", "root"));

        let a = builder.append_draft_step(&mut store, &UserMessage::new("m2", "a"));
        builder.finalize_thinking_step(&mut store, &"m1".into(), analysis("root"));
        assert_eq!(builder.active_step(), Some(root));
        let b = builder.append_draft_step(&mut store, &UserMessage::new("m3", "b"));

        assert_eq!(step(&store, b).parent_step, Some(root));
        let ya = store.node(a).unwrap().position.y;
        let yb = store.node(b).unwrap().position.y;
        assert_eq!(yb - ya, 200.0);
    }

    #[test]
    fn new_topic_starts_root_below_lowest_root() {
        let mut store = WorkspaceStore::default();
        let mut builder = ThinkingGraphBuilder::default();
        builder.append_draft_step(&mut store, &UserMessage::new("m1", "one"));
        builder.append_draft_step(&mut store, &UserMessage::new("m2", "two"));

        builder.start_new_topic();
        let root = builder.append_draft_step(&mut store, &UserMessage::new("m3", "fresh"));
        assert_eq!(step(&store, root).depth, 0);
        assert_eq!(store.node(root).unwrap().position, Point::new(80.0, 280.0));
        assert_eq!(step(&store, root).step_number, 3);
    }

    #[test]
    fn draft_carries_preview_and_draft_tag() {
        let mut store = WorkspaceStore::default();
        let mut builder = ThinkingGraphBuilder::new(ThinkingConfig {
            preview_chars: 10,
            title_chars: 5,
            ..ThinkingConfig::default()
        });
        let id = builder.append_draft_step(
            &mut store,
            &UserMessage::new("m1", "\n  Hypothesis: entropy always grows"),
        );
        let node = store.node(id).unwrap();
        assert_eq!(node.view(), ViewType::Thinking);
        assert!(node.is_draft());
        assert!(node.has_tag(Node::DRAFT_TAG));
        assert_eq!(node.content, "Hypothesis…");
        assert_eq!(node.title, "Hypot…");
    }

    #[test]
    fn empty_message_gets_numbered_title() {
        let mut store = WorkspaceStore::default();
        let mut builder = ThinkingGraphBuilder::default();
        let id = builder.append_draft_step(&mut store, &UserMessage::new("m1", "   "));
        assert_eq!(store.node(id).unwrap().title, "Step 1");
    }

    #[test]
    fn finalize_flips_draft_once() {
        let mut store = WorkspaceStore::default();
        let mut builder = ThinkingGraphBuilder::default();
        let id = builder.append_draft_step(&mut store, &UserMessage::new("m1", "Why?"));

        assert_eq!(builder.finalize_thinking_step(&mut store, &"m1".into(), analysis("X")), Some(id));
        let node = store.node(id).unwrap();
        assert!(!node.is_draft());
        assert!(!node.has_tag(Node::DRAFT_TAG));
        assert_eq!(node.title, "Claim: X");
        let s = node.thinking_step().unwrap();
        assert_eq!(s.status(), AnalysisStatus::Analyzed);
        assert_eq!(s.fields().and_then(|f| f.claim.as_deref()), Some("X"));
        assert_eq!(s.related_concepts, vec!["entropy".to_string()]);

        let before = store.node(id).cloned();
        assert_eq!(builder.finalize_thinking_step(&mut store, &"m1".into(), analysis("Z")), None);
        assert_eq!(store.node(id).cloned(), before);
    }

    #[test]
    fn finalize_after_delete_does_not_resurrect() {
        let mut store = WorkspaceStore::default();
        let mut builder = ThinkingGraphBuilder::default();
        let id = builder.append_draft_step(&mut store, &UserMessage::new("m1", "Why?"));
        store.delete_node(id).unwrap();

        assert_eq!(builder.finalize_thinking_step(&mut store, &"m1".into(), analysis("X")), None);
        assert_eq!(store.node_count(), 0);
    }

    #[test]
    fn deleted_active_step_falls_back_to_root() {
        let mut store = WorkspaceStore::default();
        let mut builder = ThinkingGraphBuilder::default();
        let first = builder.append_draft_step(&mut store, &UserMessage::new("m1", "a"));
        store.delete_node(first).unwrap();

        let next = builder.append_draft_step(&mut store, &UserMessage::new("m2", "b"));
        assert_eq!(step(&store, next).depth, 0);
        assert_eq!(store.edge_count(), 0);
    }

    #[test]
    fn resume_continues_numbering() {
        let mut store = WorkspaceStore::default();
        let mut builder = ThinkingGraphBuilder::default();
        builder.append_draft_step(&mut store, &UserMessage::new("m1", "a"));
        builder.append_draft_step(&mut store, &UserMessage::new("m2", "b"));

        let resumed = ThinkingGraphBuilder::resume(ThinkingConfig::default(), &store);
        assert_eq!(resumed.step_count(), 2);
        assert_eq!(resumed.active_step(), None);
    }
}
