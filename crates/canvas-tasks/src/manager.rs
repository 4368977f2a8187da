//! Generation task manager
//!
//! Tracks concurrently running artifact generations. Each task owns its
//! id, so outcomes for different tasks are applied without contention.
//!
//! # Policies
//! - Status moves only forward; the first terminal outcome wins.
//! - Non-status fields are last-write-wins; `revision` counts applied writes.
//! - `remove` is optimistic: local state goes first and backend artifact
//!   deletion is best-effort, never rolled back.
//! - `save_output` is fail-closed: local state changes only after the
//!   backend accepted the write.

use crate::error::TaskError;
use crate::producer::{Acknowledger, GenerationOutput, GenerationProducer, GenerationRequest};
use crate::task::{GenerationTask, TaskPatch, TaskStatus};
use canvas_model::{
    Artifact, ArtifactId, ArtifactUpdate, GenerationKind, Point, ProjectId, TaskId,
    WorkspacePersistence,
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Row-major placement of restored artifact cards
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactGridConfig {
    pub columns: usize,
    pub card_width: f64,
    pub card_height: f64,
    pub gap: f64,
    pub origin: Point,
}

impl Default for ArtifactGridConfig {
    fn default() -> Self {
        Self {
            columns: 2,
            card_width: 320.0,
            card_height: 240.0,
            gap: 24.0,
            origin: Point::new(40.0, 40.0),
        }
    }
}

impl ArtifactGridConfig {
    /// Top-left corner of the `index`-th card
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn position(&self, index: usize) -> Point {
        let columns = self.columns.max(1);
        let column = (index % columns) as f64;
        let row = (index / columns) as f64;
        self.origin.offset(
            column * (self.card_width + self.gap),
            row * (self.card_height + self.gap),
        )
    }
}

#[derive(Debug)]
struct Shared {
    project: ProjectId,
    persistence: Arc<dyn WorkspacePersistence>,
    grid: ArtifactGridConfig,
    tasks: DashMap<TaskId, GenerationTask>,
    sequence: AtomicU64,
}

/// Owner of the generation task collection
///
/// Cheap to clone; clones share the same tasks.
#[derive(Debug, Clone)]
pub struct GenerationTaskManager {
    shared: Arc<Shared>,
}

impl GenerationTaskManager {
    #[must_use]
    pub fn new(
        project: ProjectId,
        persistence: Arc<dyn WorkspacePersistence>,
        grid: ArtifactGridConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                project,
                persistence,
                grid,
                tasks: DashMap::new(),
                sequence: AtomicU64::new(0),
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn project(&self) -> &ProjectId {
        &self.shared.project
    }

    #[inline]
    #[must_use]
    pub fn grid(&self) -> &ArtifactGridConfig {
        &self.shared.grid
    }

    /// Create a `pending` task
    pub fn start(&self, kind: GenerationKind, position: Point) -> TaskId {
        let task = GenerationTask::new(kind, position, self.next_sequence());
        let id = task.id;
        self.shared.tasks.insert(id, task);
        tracing::info!("Started {} task {}", kind, id);
        id
    }

    /// `pending -> generating`; no-op in any other state
    pub fn acknowledge(&self, id: TaskId, backend_task_id: Option<String>) -> bool {
        self.with_task(id, "acknowledge", |task| {
            if !task.transition(TaskStatus::Generating) {
                return false;
            }
            if backend_task_id.is_some() {
                task.backend_task_id = backend_task_id;
            }
            task.touch();
            true
        })
    }

    /// Merge lightweight fields; a status in the patch only moves forward
    pub fn update(&self, id: TaskId, patch: TaskPatch) -> bool {
        self.with_task(id, "update", |task| task.apply(patch))
    }

    /// Terminal success; no-op when missing or already terminal
    pub fn complete(&self, id: TaskId, output: GenerationOutput) -> bool {
        let applied = self.with_task(id, "complete", |task| {
            if !task.transition(TaskStatus::Complete) {
                return false;
            }
            task.result = Some(output.result);
            if output.title.is_some() {
                task.title = output.title;
            }
            if output.output_id.is_some() {
                task.output_id = output.output_id;
            }
            task.touch();
            true
        });
        if applied {
            tracing::info!("Task {} complete", id);
        }
        applied
    }

    /// Terminal failure; no-op when missing or already terminal
    pub fn fail(&self, id: TaskId, message: impl Into<String>) -> bool {
        let message = message.into();
        let applied = self.with_task(id, "fail", |task| {
            if !task.transition(TaskStatus::Error) {
                return false;
            }
            task.error = Some(message.clone());
            task.touch();
            true
        });
        if applied {
            tracing::warn!("Task {} failed: {}", id, message);
        }
        applied
    }

    /// Delete a task immediately
    ///
    /// A persisted output is deleted in the background; a failure there is
    /// logged and the task stays removed.
    pub fn remove(&self, id: TaskId) -> Option<GenerationTask> {
        let (_, task) = self.shared.tasks.remove(&id)?;
        tracing::info!("Removed task {}", id);

        if let Some(output) = task.output_id.clone() {
            self.delete_output_in_background(id, output);
        }
        Some(task)
    }

    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<GenerationTask> {
        self.shared.tasks.get(&id).map(|entry| entry.value().clone())
    }

    /// All tasks in creation order
    #[must_use]
    pub fn tasks(&self) -> Vec<GenerationTask> {
        let mut tasks: Vec<GenerationTask> = self
            .shared
            .tasks
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        tasks.sort_by_key(|task| task.sequence);
        tasks
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.tasks.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.tasks.is_empty()
    }

    /// Oldest active task of `kind`
    #[must_use]
    pub fn get_active_of_type(&self, kind: GenerationKind) -> Option<GenerationTask> {
        self.tasks()
            .into_iter()
            .find(|task| task.kind == kind && task.is_active())
    }

    #[must_use]
    pub fn has_active(&self) -> bool {
        self.shared.tasks.iter().any(|entry| entry.value().is_active())
    }

    /// Push edited output to the backend, then mirror it locally
    ///
    /// # Errors
    /// - `TaskError::TaskNotFound` if the task does not exist
    /// - `TaskError::NotPersisted` if the task has no `output_id`
    /// - `TaskError::Persistence` if the backend rejects the write; the
    ///   local `result` and `title` are left as they were
    pub async fn save_output(
        &self,
        id: TaskId,
        data: serde_json::Value,
        title: Option<String>,
    ) -> Result<(), TaskError> {
        let output = {
            let task = self.shared.tasks.get(&id).ok_or(TaskError::TaskNotFound(id))?;
            task.output_id.clone().ok_or(TaskError::NotPersisted(id))?
        };

        let update = ArtifactUpdate {
            data: data.clone(),
            title: title.clone(),
        };
        self.shared
            .persistence
            .update_artifact(&self.shared.project, &output, update)
            .await?;

        let applied = self.with_task(id, "save_output", |task| {
            task.result = Some(data);
            if title.is_some() {
                task.title = title;
            }
            task.touch();
            true
        });
        if applied {
            tracing::info!("Saved output {} of task {}", output, id);
        }
        Ok(())
    }

    /// Start a task and drive `producer` for it on the tokio runtime
    ///
    /// The producer's acknowledgment moves the task to `generating`; its
    /// outcome is applied with [`complete`](Self::complete) or
    /// [`fail`](Self::fail). Outcomes for a task removed in the meantime
    /// are dropped.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn launch<P>(
        &self,
        producer: Arc<P>,
        kind: GenerationKind,
        position: Point,
        request: GenerationRequest,
    ) -> (TaskId, JoinHandle<()>)
    where
        P: GenerationProducer + ?Sized + 'static,
    {
        let id = self.start(kind, position);
        let manager = self.clone();
        let ack = Acknowledger::new(self.clone(), id, kind);

        let handle = tokio::spawn(async move {
            match producer.generate(request, ack).await {
                Ok(output) => {
                    manager.complete(id, output);
                }
                Err(err) => {
                    manager.fail(id, err.to_string());
                }
            }
        });
        (id, handle)
    }

    /// Turn complete persisted artifacts into `complete` task cards
    ///
    /// Cards are laid out row-major on the configured grid. Artifacts
    /// already represented by a task with the same `output_id` are skipped.
    /// Returns the number of tasks created.
    pub fn restore_artifacts(&self, artifacts: &[Artifact]) -> usize {
        let mut known: HashSet<ArtifactId> = self
            .shared
            .tasks
            .iter()
            .filter_map(|entry| entry.value().output_id.clone())
            .collect();

        let mut restored = 0;
        for artifact in artifacts.iter().filter(|a| a.is_complete()) {
            if !known.insert(artifact.id.clone()) {
                continue;
            }
            let position = self.shared.grid.position(restored);
            let mut task = GenerationTask::new(artifact.kind, position, self.next_sequence());
            task.status = TaskStatus::Complete;
            task.result = Some(artifact.data.clone());
            task.title.clone_from(&artifact.title);
            task.output_id = Some(artifact.id.clone());
            task.created_at = artifact.created_at;
            self.shared.tasks.insert(task.id, task);
            restored += 1;
        }

        if restored > 0 {
            tracing::info!("Restored {} artifacts for project {}", restored, self.shared.project);
        }
        restored
    }

    /// Drop every task without touching the backend
    pub fn clear_local(&self) {
        self.shared.tasks.clear();
    }

    fn next_sequence(&self) -> u64 {
        self.shared.sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// Run `f` on a live task; a missing task is a logged no-op
    fn with_task<F>(&self, id: TaskId, op: &str, f: F) -> bool
    where
        F: FnOnce(&mut GenerationTask) -> bool,
    {
        match self.shared.tasks.get_mut(&id) {
            Some(mut entry) => f(entry.value_mut()),
            None => {
                tracing::debug!("Ignoring {} for unknown task {}", op, id);
                false
            }
        }
    }

    fn delete_output_in_background(&self, id: TaskId, output: ArtifactId) {
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!(
                "No runtime to delete artifact {} of removed task {}; left orphaned",
                output,
                id
            );
            return;
        };

        let persistence = Arc::clone(&self.shared.persistence);
        let project = self.shared.project.clone();
        runtime.spawn(async move {
            if let Err(err) = persistence.delete_artifact(&project, &output).await {
                tracing::warn!(
                    "Failed to delete artifact {} of removed task {}: {}",
                    output,
                    id,
                    err
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_model::{ArtifactStatus, PersistenceError};
    use canvas_test_utils::{complete_artifact, InMemoryPersistence, Operation};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn manager_with(persistence: &Arc<InMemoryPersistence>) -> GenerationTaskManager {
        GenerationTaskManager::new(
            ProjectId::new("p1"),
            Arc::clone(persistence) as Arc<dyn WorkspacePersistence>,
            ArtifactGridConfig::default(),
        )
    }

    fn manager() -> GenerationTaskManager {
        manager_with(&Arc::new(InMemoryPersistence::new()))
    }

    #[test]
    fn start_complete_then_fail_stays_complete() {
        let tasks = manager();
        let id = tasks.start(GenerationKind::Summary, Point::new(10.0, 10.0));
        assert_eq!(tasks.get(id).unwrap().status, TaskStatus::Pending);

        assert!(tasks.complete(id, GenerationOutput::new(json!({"text": "S"}))));
        assert!(!tasks.fail(id, "late error"));

        let task = tasks.get(id).unwrap();
        assert_eq!(task.status, TaskStatus::Complete);
        assert_eq!(task.result, Some(json!({"text": "S"})));
        assert_eq!(task.error, None);
    }

    #[test]
    fn first_terminal_outcome_wins() {
        let tasks = manager();
        let id = tasks.start(GenerationKind::Quiz, Point::default());
        assert!(tasks.acknowledge(id, Some("job-1".into())));
        assert!(tasks.fail(id, "boom"));
        assert!(!tasks.complete(id, GenerationOutput::new(json!(1))));
        assert!(!tasks.update(id, TaskPatch::default().with_status(TaskStatus::Complete)));

        let task = tasks.get(id).unwrap();
        assert_eq!(task.status, TaskStatus::Error);
        assert_eq!(task.backend_task_id.as_deref(), Some("job-1"));
        assert_eq!(task.result, None);
    }

    #[test]
    fn acknowledge_only_from_pending() {
        let tasks = manager();
        let id = tasks.start(GenerationKind::Podcast, Point::default());
        assert!(tasks.acknowledge(id, None));
        assert!(!tasks.acknowledge(id, Some("second".into())));
        assert_eq!(tasks.get(id).unwrap().backend_task_id, None);
    }

    #[test]
    fn update_after_complete_keeps_status_but_moves_card() {
        let tasks = manager();
        let id = tasks.start(GenerationKind::MindMap, Point::default());
        tasks.complete(id, GenerationOutput::new(json!({})));

        let patch = TaskPatch::position(Point::new(300.0, 40.0)).with_status(TaskStatus::Pending);
        assert!(tasks.update(id, patch));

        let task = tasks.get(id).unwrap();
        assert_eq!(task.status, TaskStatus::Complete);
        assert_eq!(task.position, Point::new(300.0, 40.0));
        assert_eq!(task.revision, 2);
    }

    #[test]
    fn outcomes_for_removed_task_are_noops() {
        let tasks = manager();
        let id = tasks.start(GenerationKind::Timeline, Point::default());
        assert!(tasks.remove(id).is_some());

        assert!(!tasks.acknowledge(id, None));
        assert!(!tasks.complete(id, GenerationOutput::new(json!(1))));
        assert!(!tasks.fail(id, "gone"));
        assert!(tasks.get(id).is_none());
        assert!(tasks.remove(id).is_none());
    }

    #[test]
    fn active_queries_follow_creation_order() {
        let tasks = manager();
        let first = tasks.start(GenerationKind::Summary, Point::default());
        let second = tasks.start(GenerationKind::Summary, Point::default());
        let report = tasks.start(GenerationKind::Report, Point::default());
        assert!(tasks.has_active());

        assert_eq!(tasks.get_active_of_type(GenerationKind::Summary).map(|t| t.id), Some(first));
        tasks.complete(first, GenerationOutput::new(json!(null)));
        assert_eq!(tasks.get_active_of_type(GenerationKind::Summary).map(|t| t.id), Some(second));
        assert!(tasks.get_active_of_type(GenerationKind::Flashcards).is_none());

        tasks.fail(second, "x");
        tasks.fail(report, "y");
        assert!(!tasks.has_active());

        let order: Vec<TaskId> = tasks.tasks().iter().map(|t| t.id).collect();
        assert_eq!(order, vec![first, second, report]);
    }

    #[tokio::test]
    async fn remove_is_synchronous_even_when_backend_delete_fails() {
        let persistence = Arc::new(InMemoryPersistence::new());
        persistence.fail_on(
            Operation::DeleteArtifact,
            PersistenceError::Unavailable("offline".into()),
        );
        let tasks = manager_with(&persistence);
        let id = tasks.start(GenerationKind::Summary, Point::default());
        tasks.complete(id, GenerationOutput::new(json!("S")).persisted_as("a1"));

        let removed = tasks.remove(id).unwrap();
        assert_eq!(removed.output_id, Some(ArtifactId::new("a1")));
        assert!(tasks.get(id).is_none());

        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert_eq!(persistence.call_count(Operation::DeleteArtifact), 1);
        assert!(tasks.get(id).is_none());
    }

    #[tokio::test]
    async fn remove_without_output_skips_backend() {
        let persistence = Arc::new(InMemoryPersistence::new());
        let tasks = manager_with(&persistence);
        let id = tasks.start(GenerationKind::Summary, Point::default());
        tasks.remove(id);
        tokio::task::yield_now().await;
        assert_eq!(persistence.call_count(Operation::DeleteArtifact), 0);
    }

    #[tokio::test]
    async fn save_output_is_fail_closed() {
        let persistence = Arc::new(InMemoryPersistence::new().with_artifacts(
            ProjectId::new("p1"),
            vec![complete_artifact("a1", GenerationKind::Summary)],
        ));
        let tasks = manager_with(&persistence);
        let id = tasks.start(GenerationKind::Summary, Point::default());
        tasks.complete(id, GenerationOutput::new(json!("v1")).persisted_as("a1"));

        persistence.fail_on(
            Operation::UpdateArtifact,
            PersistenceError::Unavailable("timeout".into()),
        );
        let err = tasks
            .save_output(id, json!("v2"), Some("Edited".into()))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(tasks.get(id).unwrap().result, Some(json!("v1")));

        persistence.recover(Operation::UpdateArtifact);
        tasks
            .save_output(id, json!("v2"), Some("Edited".into()))
            .await
            .unwrap();
        let task = tasks.get(id).unwrap();
        assert_eq!(task.result, Some(json!("v2")));
        assert_eq!(task.title.as_deref(), Some("Edited"));
        let stored = persistence.artifacts(&ProjectId::new("p1"));
        assert_eq!(stored[0].data, json!("v2"));
    }

    #[tokio::test]
    async fn save_output_requires_persisted_task() {
        let tasks = manager();
        let id = tasks.start(GenerationKind::Summary, Point::default());
        assert_eq!(
            tasks.save_output(id, json!(1), None).await,
            Err(TaskError::NotPersisted(id))
        );
        let missing = TaskId::new();
        assert_eq!(
            tasks.save_output(missing, json!(1), None).await,
            Err(TaskError::TaskNotFound(missing))
        );
    }

    #[test]
    fn restore_lays_out_grid_and_skips_known_outputs() {
        let tasks = manager();
        let mut failed = complete_artifact("a3", GenerationKind::Quiz);
        failed.status = ArtifactStatus::Failed;
        let artifacts = vec![
            complete_artifact("a1", GenerationKind::Summary),
            complete_artifact("a2", GenerationKind::MindMap),
            failed,
            complete_artifact("a4", GenerationKind::Podcast),
        ];

        assert_eq!(tasks.restore_artifacts(&artifacts), 3);
        let positions: Vec<Point> = tasks.tasks().iter().map(|t| t.position).collect();
        assert_eq!(
            positions,
            vec![
                Point::new(40.0, 40.0),
                Point::new(384.0, 40.0),
                Point::new(40.0, 304.0),
            ]
        );
        assert!(tasks.tasks().iter().all(|t| t.status == TaskStatus::Complete));

        assert_eq!(tasks.restore_artifacts(&artifacts), 0);
        assert_eq!(tasks.len(), 3);
    }

    #[test]
    fn remove_outside_runtime_still_removes() {
        let tasks = manager();
        let id = tasks.start(GenerationKind::Report, Point::default());
        tasks.update(id, TaskPatch::default().with_output("a9"));
        assert!(tasks.remove(id).is_some());
        assert!(tasks.is_empty());
    }
}
