//! Error types for workspace mutations

use canvas_model::{EdgeId, NodeId, SectionId, ViewType};

/// Workspace store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkspaceError {
    /// Node id not present in the store
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// Edge id not present in the store
    #[error("edge not found: {0}")]
    EdgeNotFound(EdgeId),

    /// Section id not present in the store
    #[error("section not found: {0}")]
    SectionNotFound(SectionId),

    /// Only thinking-view nodes can be promoted
    #[error("node {node} lives in the {view} view and cannot be promoted")]
    NotPromotable { node: NodeId, view: ViewType },

    /// Edge from a node to itself
    #[error("self-loop on node {0}")]
    SelfLoop(NodeId),
}

impl WorkspaceError {
    /// Whether the error names an id that no longer exists
    #[inline]
    #[must_use]
    pub fn is_stale_reference(&self) -> bool {
        matches!(
            self,
            Self::NodeNotFound(_) | Self::EdgeNotFound(_) | Self::SectionNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_view() {
        let err = WorkspaceError::NotPromotable {
            node: NodeId::new(),
            view: ViewType::Free,
        };
        assert!(err.to_string().contains("free view"));
        assert!(!err.is_stale_reference());
        assert!(WorkspaceError::NodeNotFound(NodeId::new()).is_stale_reference());
    }
}
