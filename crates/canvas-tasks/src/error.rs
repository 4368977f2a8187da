//! Error types for generation task operations

use canvas_model::{PersistenceError, TaskId};

/// Task manager errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// No task with this id (never existed or already removed)
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// Task has no persisted artifact to write to
    #[error("task {0} has no persisted output")]
    NotPersisted(TaskId),

    /// Backend call failed; local state left untouched
    #[error("persistence failed: {0}")]
    Persistence(#[from] PersistenceError),
}

impl TaskError {
    /// Whether retrying the same call could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(err) if err.is_transient())
    }
}

/// Failure reported by a generation producer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProducerError {
    /// Backend refused or failed the generation
    #[error("generation failed: {0}")]
    Failed(String),

    /// Transport-level failure (timeout, disconnect)
    #[error("transport error: {0}")]
    Transport(String),
}
