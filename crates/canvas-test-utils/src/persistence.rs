//! In-memory persistence backend with failure injection

use async_trait::async_trait;
use canvas_model::{
    Artifact, ArtifactId, ArtifactUpdate, PersistenceError, ProjectId, ViewType,
    WorkspacePersistence, WorkspaceSnapshot,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Persistence operations, used to target failures and count calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetWorkspace,
    ClearWorkspace,
    DeleteArtifact,
    UpdateArtifact,
    ListArtifacts,
}

/// Recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetWorkspace(ProjectId),
    ClearWorkspace(ProjectId, Option<ViewType>),
    DeleteArtifact(ProjectId, ArtifactId),
    UpdateArtifact(ProjectId, ArtifactId, ArtifactUpdate),
    ListArtifacts(ProjectId),
}

impl Call {
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Call::GetWorkspace(_) => Operation::GetWorkspace,
            Call::ClearWorkspace(..) => Operation::ClearWorkspace,
            Call::DeleteArtifact(..) => Operation::DeleteArtifact,
            Call::UpdateArtifact(..) => Operation::UpdateArtifact,
            Call::ListArtifacts(_) => Operation::ListArtifacts,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    workspaces: HashMap<ProjectId, WorkspaceSnapshot>,
    artifacts: HashMap<ProjectId, Vec<Artifact>>,
    failures: HashMap<Operation, PersistenceError>,
    calls: Vec<Call>,
}

/// Backend double: stores snapshots and artifacts per project
///
/// Failures injected with [`fail_on`](Self::fail_on) persist until
/// [`recover`](Self::recover). Failed calls are still recorded.
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    state: Mutex<State>,
    latency: Option<Duration>,
}

impl InMemoryPersistence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_workspace(self, project: ProjectId, snapshot: WorkspaceSnapshot) -> Self {
        self.state.lock().workspaces.insert(project, snapshot);
        self
    }

    #[must_use]
    pub fn with_artifacts(self, project: ProjectId, artifacts: Vec<Artifact>) -> Self {
        self.state.lock().artifacts.insert(project, artifacts);
        self
    }

    /// Delay every call by `latency` (tokio time, so pausable in tests)
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn fail_on(&self, operation: Operation, error: PersistenceError) {
        self.state.lock().failures.insert(operation, error);
    }

    pub fn recover(&self, operation: Operation) {
        self.state.lock().failures.remove(&operation);
    }

    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    #[must_use]
    pub fn call_count(&self, operation: Operation) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    #[must_use]
    pub fn workspace(&self, project: &ProjectId) -> Option<WorkspaceSnapshot> {
        self.state.lock().workspaces.get(project).cloned()
    }

    #[must_use]
    pub fn artifacts(&self, project: &ProjectId) -> Vec<Artifact> {
        self.state
            .lock()
            .artifacts
            .get(project)
            .cloned()
            .unwrap_or_default()
    }

    /// Record `call` and return the injected failure for it, if any
    async fn enter(&self, call: Call) -> Result<(), PersistenceError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.state.lock();
        let operation = call.operation();
        state.calls.push(call);
        match state.failures.get(&operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn clear_view(snapshot: &mut WorkspaceSnapshot, view: ViewType) {
    let removed: HashSet<_> = snapshot
        .nodes
        .iter()
        .filter(|node| node.view() == view)
        .map(canvas_model::Node::id)
        .collect();
    snapshot.nodes.retain(|node| !removed.contains(&node.id()));
    snapshot
        .edges
        .retain(|edge| !removed.contains(&edge.source) && !removed.contains(&edge.target));
    snapshot.sections.retain(|section| section.view != view);
}

#[async_trait]
impl WorkspacePersistence for InMemoryPersistence {
    async fn get_workspace(&self, project: &ProjectId) -> Result<WorkspaceSnapshot, PersistenceError> {
        self.enter(Call::GetWorkspace(project.clone())).await?;
        Ok(self.workspace(project).unwrap_or_default())
    }

    async fn clear_workspace(
        &self,
        project: &ProjectId,
        view: Option<ViewType>,
    ) -> Result<(), PersistenceError> {
        self.enter(Call::ClearWorkspace(project.clone(), view)).await?;
        let mut state = self.state.lock();
        if let Some(snapshot) = state.workspaces.get_mut(project) {
            match view {
                Some(view) => clear_view(snapshot, view),
                None => *snapshot = WorkspaceSnapshot::default(),
            }
        }
        Ok(())
    }

    async fn delete_artifact(
        &self,
        project: &ProjectId,
        artifact: &ArtifactId,
    ) -> Result<(), PersistenceError> {
        self.enter(Call::DeleteArtifact(project.clone(), artifact.clone()))
            .await?;
        let mut state = self.state.lock();
        let artifacts = state.artifacts.entry(project.clone()).or_default();
        let before = artifacts.len();
        artifacts.retain(|a| &a.id != artifact);
        if artifacts.len() == before {
            return Err(PersistenceError::NotFound(artifact.to_string()));
        }
        Ok(())
    }

    async fn update_artifact(
        &self,
        project: &ProjectId,
        artifact: &ArtifactId,
        update: ArtifactUpdate,
    ) -> Result<(), PersistenceError> {
        self.enter(Call::UpdateArtifact(
            project.clone(),
            artifact.clone(),
            update.clone(),
        ))
        .await?;
        let mut state = self.state.lock();
        let stored = state
            .artifacts
            .get_mut(project)
            .and_then(|artifacts| artifacts.iter_mut().find(|a| &a.id == artifact))
            .ok_or_else(|| PersistenceError::NotFound(artifact.to_string()))?;
        stored.data = update.data;
        if update.title.is_some() {
            stored.title = update.title;
        }
        Ok(())
    }

    async fn list_artifacts(&self, project: &ProjectId) -> Result<Vec<Artifact>, PersistenceError> {
        self.enter(Call::ListArtifacts(project.clone())).await?;
        Ok(self.artifacts(project))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complete_artifact;
    use canvas_model::GenerationKind;

    #[tokio::test]
    async fn injected_failure_is_recorded_and_recoverable() {
        let project = ProjectId::new("p1");
        let backend = InMemoryPersistence::new().with_artifacts(
            project.clone(),
            vec![complete_artifact("a1", GenerationKind::Summary)],
        );
        backend.fail_on(
            Operation::DeleteArtifact,
            PersistenceError::Unavailable("down".into()),
        );

        let id = ArtifactId::new("a1");
        assert!(backend.delete_artifact(&project, &id).await.is_err());
        assert_eq!(backend.artifacts(&project).len(), 1);

        backend.recover(Operation::DeleteArtifact);
        backend.delete_artifact(&project, &id).await.unwrap();
        assert!(backend.artifacts(&project).is_empty());
        assert_eq!(backend.call_count(Operation::DeleteArtifact), 2);
    }

    #[tokio::test]
    async fn unknown_project_loads_empty_workspace() {
        let backend = InMemoryPersistence::new();
        let snapshot = backend.get_workspace(&ProjectId::new("new")).await.unwrap();
        assert!(snapshot.nodes.is_empty());
    }
}
