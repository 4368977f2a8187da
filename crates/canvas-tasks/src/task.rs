//! Generation task record and its status machine

use canvas_model::{ArtifactId, GenerationKind, Point, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a generation task
///
/// ```text
/// pending ──ack──▶ generating ──ok──▶ complete
///    │                  └──────err──▶ error
///    └──── ok / err (producer skipped the ack) ────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Generating,
    Complete,
    Error,
}

impl TaskStatus {
    /// Still waiting for an outcome
    #[inline]
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Generating)
    }

    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    /// Whether `self -> next` moves strictly forward
    #[must_use]
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Generating | Self::Complete | Self::Error),
            Self::Generating => matches!(next, Self::Complete | Self::Error),
            Self::Complete | Self::Error => false,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked "produce an artifact" operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationTask {
    pub id: TaskId,
    pub kind: GenerationKind,
    pub status: TaskStatus,
    /// Card position on the canvas; tasks are not spatially indexed
    pub position: Point,
    pub result: Option<serde_json::Value>,
    pub title: Option<String>,
    pub error: Option<String>,
    /// Correlation id reported by the producer's backend
    pub backend_task_id: Option<String>,
    /// Persisted artifact holding the output
    pub output_id: Option<ArtifactId>,
    pub created_at: DateTime<Utc>,
    /// Number of applied mutations since creation
    pub revision: u64,
    #[serde(skip)]
    pub(crate) sequence: u64,
}

impl GenerationTask {
    pub(crate) fn new(kind: GenerationKind, position: Point, sequence: u64) -> Self {
        Self {
            id: TaskId::new(),
            kind,
            status: TaskStatus::Pending,
            position,
            result: None,
            title: None,
            error: None,
            backend_task_id: None,
            output_id: None,
            created_at: Utc::now(),
            revision: 0,
            sequence,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Move to `next` if the transition is forward; returns whether it applied
    pub(crate) fn transition(&mut self, next: TaskStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        true
    }

    pub(crate) fn touch(&mut self) {
        self.revision += 1;
    }

    /// Merge a patch; returns whether anything changed
    pub(crate) fn apply(&mut self, patch: TaskPatch) -> bool {
        let mut changed = false;
        if let Some(position) = patch.position {
            self.position = position;
            changed = true;
        }
        if let Some(title) = patch.title {
            self.title = Some(title);
            changed = true;
        }
        if let Some(backend_task_id) = patch.backend_task_id {
            self.backend_task_id = Some(backend_task_id);
            changed = true;
        }
        if let Some(output_id) = patch.output_id {
            self.output_id = Some(output_id);
            changed = true;
        }
        if let Some(status) = patch.status {
            changed |= self.transition(status);
        }
        if changed {
            self.touch();
        }
        changed
    }
}

/// Partial update for lightweight task fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    pub position: Option<Point>,
    pub title: Option<String>,
    pub backend_task_id: Option<String>,
    pub output_id: Option<ArtifactId>,
    /// Applied only when the transition moves forward
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    #[must_use]
    pub fn position(position: Point) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_output(mut self, output_id: impl Into<ArtifactId>) -> Self {
        self.output_id = Some(output_id.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::Generating,
        TaskStatus::Complete,
        TaskStatus::Error,
    ];

    #[test]
    fn terminal_states_are_final() {
        for next in ALL {
            assert!(!TaskStatus::Complete.can_transition_to(next));
            assert!(!TaskStatus::Error.can_transition_to(next));
        }
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Complete));
        assert!(!TaskStatus::Generating.can_transition_to(TaskStatus::Pending));
    }

    #[test]
    fn patch_bumps_revision_only_when_applied() {
        let mut task = GenerationTask::new(GenerationKind::Quiz, Point::default(), 0);
        assert!(task.apply(TaskPatch::position(Point::new(5.0, 5.0))));
        assert_eq!(task.revision, 1);

        task.status = TaskStatus::Complete;
        assert!(!task.apply(TaskPatch::default().with_status(TaskStatus::Generating)));
        assert_eq!(task.revision, 1);
        assert_eq!(task.status, TaskStatus::Complete);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&TaskStatus::Generating).unwrap();
        assert_eq!(json, "\"generating\"");
    }

    fn status() -> impl Strategy<Value = TaskStatus> {
        prop::sample::select(ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_status_never_leaves_terminal(steps in prop::collection::vec(status(), 0..16)) {
            let mut task = GenerationTask::new(GenerationKind::Summary, Point::default(), 0);
            let mut seen_terminal: Option<TaskStatus> = None;
            for next in steps {
                task.transition(next);
                if let Some(terminal) = seen_terminal {
                    prop_assert_eq!(task.status, terminal);
                } else if task.status.is_terminal() {
                    seen_terminal = Some(task.status);
                }
            }
        }
    }
}
