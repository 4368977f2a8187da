//! Canvas nodes, edges and sections
//!
//! A [`Node`] carries a shared identity/positional base plus a
//! [`NodeKind`] with the kind-specific fields, so consumers match on the
//! variant instead of probing optional fields.

use crate::geometry::{Point, Rect, Size};
use crate::ids::{EdgeId, MessageId, NodeId, SectionId};
use crate::view::ViewType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canvas node
///
/// `id` and `view` are fixed at creation; promotion to another view
/// produces a new node (see [`Node::promoted_copy`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,
    view: ViewType,
    pub title: String,
    pub content: String,
    pub position: Point,
    #[serde(default)]
    pub size: Option<Size>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub section_id: Option<SectionId>,
    #[serde(default)]
    pub promoted_from: Option<NodeId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    /// Tag carried by thinking steps awaiting analysis
    pub const DRAFT_TAG: &'static str = "draft";

    /// Stamp a fresh id, view and timestamps onto a node description
    #[must_use]
    pub fn create(new: NewNode, view: ViewType, now: DateTime<Utc>) -> Self {
        Self {
            id: NodeId::new(),
            view,
            title: new.title,
            content: new.content,
            position: new.position,
            size: new.size,
            tags: new.tags,
            section_id: new.section_id,
            promoted_from: None,
            created_at: now,
            updated_at: now,
            kind: new.kind,
        }
    }

    /// Independent free-view copy of this node, offset on the canvas
    ///
    /// Section membership is severed and provenance recorded in
    /// `promoted_from`. The step fields are carried as they were at
    /// promotion; a pending analysis stays pending on the copy but the copy
    /// drops the draft tag, since later analysis only lands on the original.
    #[must_use]
    pub fn promoted_copy(&self, offset: Point, now: DateTime<Utc>) -> Self {
        Self {
            id: NodeId::new(),
            view: ViewType::Free,
            title: self.title.clone(),
            content: self.content.clone(),
            position: self.position.offset(offset.x, offset.y),
            size: self.size,
            tags: self
                .tags
                .iter()
                .filter(|t| *t != Self::DRAFT_TAG)
                .cloned()
                .collect(),
            section_id: None,
            promoted_from: Some(self.id),
            created_at: now,
            updated_at: now,
            kind: self.kind.clone(),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn view(&self) -> ViewType {
        self.view
    }

    /// Thinking-step fields, if this node is a step
    #[inline]
    #[must_use]
    pub fn thinking_step(&self) -> Option<&ThinkingStep> {
        match &self.kind {
            NodeKind::ThinkingStep(step) => Some(step),
            NodeKind::Content { .. } => None,
        }
    }

    #[inline]
    pub fn thinking_step_mut(&mut self) -> Option<&mut ThinkingStep> {
        match &mut self.kind {
            NodeKind::ThinkingStep(step) => Some(step),
            NodeKind::Content { .. } => None,
        }
    }

    /// Whether this is a thinking-view step still awaiting analysis
    ///
    /// Promoted copies never receive analysis, so they are not drafts.
    #[inline]
    #[must_use]
    pub fn is_draft(&self) -> bool {
        self.view == ViewType::Thinking
            && self.thinking_step().is_some_and(ThinkingStep::is_draft)
    }

    /// Bounding box using the explicit size or the supplied default
    #[must_use]
    pub fn bounds(&self, default_size: Size) -> Rect {
        Rect::from_origin_size(self.position, self.size.unwrap_or(default_size))
    }

    #[inline]
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Apply a content patch
    pub fn apply(&mut self, patch: NodePatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(size) = patch.size {
            self.size = Some(size);
        }
        self.updated_at = now;
    }
}

/// Kind-specific node data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// User or assistant content placed on the canvas
    Content {
        content_type: ContentType,
        #[serde(default)]
        source_id: Option<String>,
    },
    /// Node of the conversation-derived thinking path
    ThinkingStep(ThinkingStep),
}

/// What a content node holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    Note,
    Document,
    Artifact,
    Link,
}

/// Thinking-step fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkingStep {
    pub step_number: u64,
    pub depth: u32,
    #[serde(default)]
    pub parent_step: Option<NodeId>,
    /// Chat message this step was drafted from
    #[serde(default)]
    pub message_id: Option<MessageId>,
    pub analysis: Analysis,
    #[serde(default)]
    pub related_concepts: Vec<String>,
    #[serde(default)]
    pub suggested_branches: Vec<String>,
}

impl ThinkingStep {
    #[inline]
    #[must_use]
    pub fn is_draft(&self) -> bool {
        matches!(self.analysis, Analysis::Pending)
    }

    #[inline]
    #[must_use]
    pub fn status(&self) -> AnalysisStatus {
        match self.analysis {
            Analysis::Pending => AnalysisStatus::Pending,
            Analysis::Analyzed(_) => AnalysisStatus::Analyzed,
        }
    }

    /// Structured fields, once analyzed
    #[inline]
    #[must_use]
    pub fn fields(&self) -> Option<&ThinkingFields> {
        match &self.analysis {
            Analysis::Pending => None,
            Analysis::Analyzed(fields) => Some(fields),
        }
    }
}

/// Analysis state of a thinking step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "fields", rename_all = "snake_case")]
pub enum Analysis {
    /// Draft created optimistically on user input
    Pending,
    /// Backend analysis merged
    Analyzed(ThinkingFields),
}

/// Flat status view of [`Analysis`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Pending,
    Analyzed,
}

/// Structured reasoning extracted by the backend
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThinkingFields {
    pub claim: Option<String>,
    pub reason: Option<String>,
    pub evidence: Option<String>,
    pub uncertainty: Option<String>,
    pub decision: Option<String>,
}

/// Backend analysis result for a drafted step
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StepAnalysis {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub fields: ThinkingFields,
    #[serde(default)]
    pub related_concepts: Vec<String>,
    #[serde(default)]
    pub suggested_branches: Vec<String>,
}

/// Node description without identity; the store stamps id, view and time
#[derive(Debug, Clone, PartialEq)]
pub struct NewNode {
    pub title: String,
    pub content: String,
    pub position: Point,
    pub size: Option<Size>,
    pub tags: Vec<String>,
    pub section_id: Option<SectionId>,
    pub kind: NodeKind,
}

impl NewNode {
    /// Content node at the origin
    #[must_use]
    pub fn content(
        title: impl Into<String>,
        content: impl Into<String>,
        content_type: ContentType,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            position: Point::default(),
            size: None,
            tags: Vec::new(),
            section_id: None,
            kind: NodeKind::Content {
                content_type,
                source_id: None,
            },
        }
    }

    /// Node with an explicit kind
    #[must_use]
    pub fn with_kind(title: impl Into<String>, content: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            kind,
            ..Self::content(title, content, ContentType::Note)
        }
    }

    #[inline]
    #[must_use]
    pub fn at(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    #[inline]
    #[must_use]
    pub fn sized(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    #[inline]
    #[must_use]
    pub fn in_section(mut self, section: SectionId) -> Self {
        self.section_id = Some(section);
        self
    }
}

/// Partial content edit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub size: Option<Size>,
}

/// Directed connection between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub label: Option<String>,
}

impl Edge {
    #[must_use]
    pub fn new(source: NodeId, target: NodeId, label: Option<String>) -> Self {
        Self {
            id: EdgeId::new(),
            source,
            target,
            label,
        }
    }

    /// Whether either endpoint is `node`
    #[inline]
    #[must_use]
    pub fn touches(&self, node: NodeId) -> bool {
        self.source == node || self.target == node
    }
}

/// Organizational grouping of nodes within one view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub title: String,
    pub view: ViewType,
    pub created_at: DateTime<Utc>,
}
