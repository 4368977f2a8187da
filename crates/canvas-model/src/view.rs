//! Canvas views and their per-view camera/selection state

use crate::ids::{NodeId, SectionId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two parallel canvases of a workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    /// Free-form research canvas
    #[default]
    Free,
    /// Conversation-derived thinking path
    Thinking,
}

impl ViewType {
    /// All views, in a stable order
    pub const ALL: [ViewType; 2] = [ViewType::Free, ViewType::Thinking];

    /// The other view
    #[inline]
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            ViewType::Free => ViewType::Thinking,
            ViewType::Thinking => ViewType::Free,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ViewType::Free => "free",
            ViewType::Thinking => "thinking",
        }
    }
}

impl fmt::Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Camera over a canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl Viewport {
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, scale: f64) -> Self {
        Self { x, y, scale }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }
}

/// Per-view UI state that survives view switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub view: ViewType,
    pub viewport: Viewport,
    #[serde(default)]
    pub selected_node_ids: Vec<NodeId>,
    #[serde(default)]
    pub collapsed_section_ids: Vec<SectionId>,
}

impl ViewState {
    #[must_use]
    pub fn new(view: ViewType) -> Self {
        Self {
            view,
            viewport: Viewport::default(),
            selected_node_ids: Vec::new(),
            collapsed_section_ids: Vec::new(),
        }
    }
}

/// Exactly one [`ViewState`] per view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewStates {
    pub free: ViewState,
    pub thinking: ViewState,
}

impl ViewStates {
    #[inline]
    #[must_use]
    pub fn get(&self, view: ViewType) -> &ViewState {
        match view {
            ViewType::Free => &self.free,
            ViewType::Thinking => &self.thinking,
        }
    }

    #[inline]
    pub fn get_mut(&mut self, view: ViewType) -> &mut ViewState {
        match view {
            ViewType::Free => &mut self.free,
            ViewType::Thinking => &mut self.thinking,
        }
    }

    /// Iterate both states mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ViewState> {
        [&mut self.free, &mut self.thinking].into_iter()
    }
}

impl Default for ViewStates {
    fn default() -> Self {
        Self {
            free: ViewState::new(ViewType::Free),
            thinking: ViewState::new(ViewType::Thinking),
        }
    }
}
