//! Persistence collaborator boundary
//!
//! The backend is a dumb store: it holds workspace snapshots and generated
//! artifacts but has no authority over layout. Every method is a suspension
//! point; everything between two calls is synchronous engine state.

use crate::artifact::{Artifact, ArtifactUpdate};
use crate::ids::{ArtifactId, ProjectId};
use crate::node::{Edge, Node, Section};
use crate::view::{ViewStates, ViewType, Viewport};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Persistence failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistenceError {
    /// Backend unreachable or timed out
    #[error("persistence backend unavailable: {0}")]
    Unavailable(String),

    /// Project or artifact does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Backend refused the request
    #[error("request rejected: {0}")]
    Rejected(String),

    /// Payload could not be encoded or decoded
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl PersistenceError {
    /// Whether a later attempt could succeed
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Full workspace payload as stored by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceSnapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub view_states: ViewStates,
    /// View that was active when the snapshot was taken
    #[serde(default)]
    pub active_view: ViewType,
}

/// Backend store for workspaces and artifacts
#[async_trait]
pub trait WorkspacePersistence: Send + Sync + std::fmt::Debug {
    /// Fetch the stored workspace for a project
    async fn get_workspace(&self, project: &ProjectId) -> Result<WorkspaceSnapshot, PersistenceError>;

    /// Clear one view (or everything when `view` is `None`)
    async fn clear_workspace(
        &self,
        project: &ProjectId,
        view: Option<ViewType>,
    ) -> Result<(), PersistenceError>;

    /// Delete a persisted artifact
    async fn delete_artifact(
        &self,
        project: &ProjectId,
        artifact: &ArtifactId,
    ) -> Result<(), PersistenceError>;

    /// Replace an artifact's content
    async fn update_artifact(
        &self,
        project: &ProjectId,
        artifact: &ArtifactId,
        update: ArtifactUpdate,
    ) -> Result<(), PersistenceError>;

    /// List every artifact of a project
    async fn list_artifacts(&self, project: &ProjectId) -> Result<Vec<Artifact>, PersistenceError>;
}
