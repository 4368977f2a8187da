//! Engine-level errors

use crate::config::ConfigError;
use canvas_model::PersistenceError;
use canvas_tasks::TaskError;
use canvas_workspace::WorkspaceError;

/// Any failure surfaced by [`WorkspaceEngine`](crate::WorkspaceEngine)
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Backend call failed; local state was not modified
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("task error: {0}")]
    Task(#[from] TaskError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Whether the same call could succeed later
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Persistence(err) => err.is_transient(),
            Self::Task(err) => err.is_retryable(),
            Self::Workspace(_) | Self::Config(_) => false,
        }
    }

    /// Whether the error names an item that no longer exists
    #[must_use]
    pub fn is_stale(&self) -> bool {
        match self {
            Self::Workspace(err) => err.is_stale_reference(),
            Self::Task(err) => matches!(err, TaskError::TaskNotFound(_)),
            Self::Persistence(_) | Self::Config(_) => false,
        }
    }
}
