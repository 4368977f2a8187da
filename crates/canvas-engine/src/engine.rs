//! Workspace engine facade
//!
//! Owns one project's workspace store, thinking-graph builder and task
//! manager, and sequences the persistence round-trips that touch more than
//! one of them.

use crate::config::EngineConfig;
use crate::error::EngineError;
use canvas_model::{
    GenerationKind, MessageId, NodeId, Point, ProjectId, StepAnalysis, TaskId, ViewType,
    WorkspacePersistence, WorkspaceSnapshot,
};
use canvas_tasks::{
    GenerationProducer, GenerationRequest, GenerationTask, GenerationTaskManager,
};
use canvas_workspace::{ClearStats, ThinkingGraphBuilder, UserMessage, WorkspaceStore};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Summary of a workspace load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub nodes: usize,
    pub edges: usize,
    pub restored_artifacts: usize,
}

/// Explicitly owned workspace engine for one project
#[derive(Debug)]
pub struct WorkspaceEngine {
    project: ProjectId,
    persistence: Arc<dyn WorkspacePersistence>,
    config: EngineConfig,
    store: WorkspaceStore,
    thinking: ThinkingGraphBuilder,
    tasks: GenerationTaskManager,
}

impl WorkspaceEngine {
    /// Create an engine with empty local state
    #[must_use]
    pub fn new(
        project: ProjectId,
        persistence: Arc<dyn WorkspacePersistence>,
        config: EngineConfig,
    ) -> Self {
        let tasks = GenerationTaskManager::new(project.clone(), Arc::clone(&persistence), config.grid);
        Self {
            project,
            persistence,
            config,
            store: WorkspaceStore::new(config.layout),
            thinking: ThinkingGraphBuilder::new(config.thinking),
            tasks,
        }
    }

    /// Fetch the stored workspace and artifacts, then replace local state
    ///
    /// Both backend calls must succeed before anything local changes.
    ///
    /// # Errors
    /// `EngineError::Persistence` from either call; local state untouched.
    pub async fn load(&mut self) -> Result<LoadStats, EngineError> {
        let snapshot = self.persistence.get_workspace(&self.project).await?;
        let artifacts = self.persistence.list_artifacts(&self.project).await?;

        self.store.replace_with_snapshot(snapshot);
        self.thinking = ThinkingGraphBuilder::resume(self.config.thinking, &self.store);
        let restored_artifacts = self.tasks.restore_artifacts(&artifacts);

        let stats = LoadStats {
            nodes: self.store.node_count(),
            edges: self.store.edge_count(),
            restored_artifacts,
        };
        tracing::info!(
            "Loaded project {}: {} nodes, {} edges, {} artifacts",
            self.project,
            stats.nodes,
            stats.edges,
            stats.restored_artifacts
        );
        Ok(stats)
    }

    /// Clear one view (or everything) on the backend, then locally
    ///
    /// # Errors
    /// `EngineError::Persistence` if the backend clear fails; the local
    /// store is left exactly as it was.
    pub async fn clear_canvas(&mut self, view: Option<ViewType>) -> Result<ClearStats, EngineError> {
        if let Err(err) = self.persistence.clear_workspace(&self.project, view).await {
            tracing::error!("Clearing project {} failed: {}", self.project, err);
            return Err(err.into());
        }

        let stats = self.store.clear_local(view);
        if view.map_or(true, |v| v == ViewType::Thinking) {
            self.thinking.start_new_topic();
        }
        tracing::info!(
            "Cleared {} for project {}: {} nodes, {} edges, {} sections",
            view.map_or("all views", ViewType::as_str),
            self.project,
            stats.nodes,
            stats.edges,
            stats.sections
        );
        Ok(stats)
    }

    #[inline]
    #[must_use]
    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &WorkspaceStore {
        &self.store
    }

    #[inline]
    pub fn store_mut(&mut self) -> &mut WorkspaceStore {
        &mut self.store
    }

    #[inline]
    #[must_use]
    pub fn thinking(&self) -> &ThinkingGraphBuilder {
        &self.thinking
    }

    #[inline]
    #[must_use]
    pub fn tasks(&self) -> &GenerationTaskManager {
        &self.tasks
    }

    /// Draft a thinking step for an outgoing user message
    pub fn append_draft_step(&mut self, message: &UserMessage) -> NodeId {
        self.thinking.append_draft_step(&mut self.store, message)
    }

    /// Merge backend analysis into the matching draft, if it still exists
    pub fn finalize_thinking_step(
        &mut self,
        message_id: &MessageId,
        analysis: StepAnalysis,
    ) -> Option<NodeId> {
        self.thinking
            .finalize_thinking_step(&mut self.store, message_id, analysis)
    }

    pub fn start_new_topic(&mut self) {
        self.thinking.start_new_topic();
    }

    pub fn switch_view(&mut self, target: ViewType) {
        self.store.switch_view(target);
    }

    /// Bring a node into view and highlight it
    ///
    /// # Errors
    /// `EngineError::Workspace` if the node does not exist.
    pub fn navigate_to_node(&mut self, id: NodeId) -> Result<(), EngineError> {
        Ok(self.store.navigate_to_node(id)?)
    }

    /// Start a generation driven by `producer`
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn launch_generation<P>(
        &self,
        producer: Arc<P>,
        kind: GenerationKind,
        position: Point,
        request: GenerationRequest,
    ) -> (TaskId, JoinHandle<()>)
    where
        P: GenerationProducer + ?Sized + 'static,
    {
        self.tasks.launch(producer, kind, position, request)
    }

    /// Remove a task card; its persisted output is deleted best-effort
    pub fn remove_task(&self, id: TaskId) -> Option<GenerationTask> {
        self.tasks.remove(id)
    }

    /// Persist edited task output
    ///
    /// # Errors
    /// `EngineError::Task` when the task is unknown, has no persisted
    /// output, or the backend rejects the write.
    pub async fn save_output(
        &self,
        id: TaskId,
        data: serde_json::Value,
        title: Option<String>,
    ) -> Result<(), EngineError> {
        Ok(self.tasks.save_output(id, data, title).await?)
    }

    /// Capture the workspace for persistence
    #[must_use]
    pub fn snapshot(&self) -> WorkspaceSnapshot {
        self.store.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_model::PersistenceError;
    use canvas_test_utils::{analysis, note, sample_snapshot, InMemoryPersistence, Operation};
    use proptest::prelude::*;

    fn engine_with(persistence: &Arc<InMemoryPersistence>) -> WorkspaceEngine {
        WorkspaceEngine::new(
            ProjectId::new("p1"),
            Arc::clone(persistence) as Arc<dyn WorkspacePersistence>,
            EngineConfig::default(),
        )
    }

    #[tokio::test]
    async fn failed_clear_leaves_store_untouched() {
        let persistence = Arc::new(InMemoryPersistence::new());
        let mut engine = engine_with(&persistence);
        engine.store_mut().add_node(note("a", 0.0, 0.0));
        engine.append_draft_step(&UserMessage::new("m1", "Why?"));

        persistence.fail_on(
            Operation::ClearWorkspace,
            PersistenceError::Unavailable("offline".into()),
        );
        let before = engine.snapshot();
        let err = engine.clear_canvas(Some(ViewType::Thinking)).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(engine.snapshot(), before);
        assert!(engine.thinking().active_step().is_some());
    }

    #[tokio::test]
    async fn clear_thinking_view_resets_active_thread() {
        let persistence = Arc::new(InMemoryPersistence::new());
        let mut engine = engine_with(&persistence);
        engine.store_mut().add_node(note("keep", 0.0, 0.0));
        engine.append_draft_step(&UserMessage::new("m1", "Why?"));

        let stats = engine.clear_canvas(Some(ViewType::Thinking)).await.unwrap();
        assert_eq!(stats.nodes, 1);
        assert_eq!(engine.store().node_count(), 1);
        assert_eq!(engine.thinking().active_step(), None);
    }

    #[tokio::test]
    async fn load_requires_both_calls() {
        let project = ProjectId::new("p1");
        let persistence = Arc::new(
            InMemoryPersistence::new().with_workspace(project.clone(), sample_snapshot()),
        );
        persistence.fail_on(
            Operation::ListArtifacts,
            PersistenceError::Unavailable("timeout".into()),
        );
        let mut engine = engine_with(&persistence);
        engine.store_mut().add_node(note("local", 0.0, 0.0));

        assert!(engine.load().await.is_err());
        assert_eq!(engine.store().node_count(), 1);

        persistence.recover(Operation::ListArtifacts);
        let stats = engine.load().await.unwrap();
        assert_eq!(stats.nodes, 3);
        assert_eq!(stats.edges, 1);
        assert_eq!(engine.thinking().step_count(), 4);
    }

    #[tokio::test]
    async fn finalize_through_engine() {
        let persistence = Arc::new(InMemoryPersistence::new());
        let mut engine = engine_with(&persistence);
        let id = engine.append_draft_step(&UserMessage::new("m1", "Is X true?"));
        assert_eq!(
            engine.finalize_thinking_step(&MessageId::new("m1"), analysis("X holds")),
            Some(id)
        );
        assert!(!engine.store().node(id).unwrap().is_draft());
    }

    fn clear_scope() -> impl Strategy<Value = Option<ViewType>> {
        prop_oneof![
            Just(None),
            Just(Some(ViewType::Free)),
            Just(Some(ViewType::Thinking)),
        ]
    }

    proptest! {
        #[test]
        fn prop_rejected_clear_keeps_snapshot(
            free_nodes in 0usize..6,
            turns in 0usize..6,
            scope in clear_scope(),
            transient in any::<bool>(),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let persistence = Arc::new(InMemoryPersistence::new());
            let mut engine = engine_with(&persistence);
            for i in 0..free_nodes {
                engine.store_mut().add_node(note("n", i as f64 * 50.0, 0.0));
            }
            for turn in 0..turns {
                engine.append_draft_step(&UserMessage::new(format!("m{turn}"), "Why?"));
            }
            let error = if transient {
                PersistenceError::Unavailable("offline".into())
            } else {
                PersistenceError::Rejected("read-only".into())
            };
            persistence.fail_on(Operation::ClearWorkspace, error);

            let before = engine.snapshot();
            let active = engine.thinking().active_step();
            let result = runtime.block_on(engine.clear_canvas(scope));

            prop_assert!(result.is_err());
            prop_assert_eq!(engine.snapshot(), before);
            prop_assert_eq!(engine.thinking().active_step(), active);
            prop_assert_eq!(persistence.call_count(Operation::ClearWorkspace), 1);
        }
    }
}
