//! Generation producer boundary
//!
//! A producer turns a request into exactly one outcome. The `Result` return
//! makes "exactly one of complete or error" hold by construction; the
//! [`Acknowledger`] carries the optional `pending -> generating` signal.

use crate::error::ProducerError;
use crate::manager::GenerationTaskManager;
use async_trait::async_trait;
use canvas_model::{ArtifactId, GenerationKind, TaskId};
use serde::{Deserialize, Serialize};

/// Parameters of a generation request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Documents or nodes the artifact is generated from
    #[serde(default)]
    pub source_ids: Vec<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    /// Producer-specific options, passed through untouched
    #[serde(default)]
    pub options: serde_json::Value,
}

impl GenerationRequest {
    #[must_use]
    pub fn from_sources<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source_ids: sources.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }
}

/// Successful producer outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub result: serde_json::Value,
    #[serde(default)]
    pub title: Option<String>,
    /// Artifact the backend persisted the output as
    #[serde(default)]
    pub output_id: Option<ArtifactId>,
}

impl GenerationOutput {
    #[must_use]
    pub fn new(result: serde_json::Value) -> Self {
        Self {
            result,
            title: None,
            output_id: None,
        }
    }

    #[must_use]
    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn persisted_as(mut self, output_id: impl Into<ArtifactId>) -> Self {
        self.output_id = Some(output_id.into());
        self
    }
}

/// Handle a producer uses to report that the backend accepted the job
#[derive(Debug, Clone)]
pub struct Acknowledger {
    manager: GenerationTaskManager,
    task: TaskId,
    kind: GenerationKind,
}

impl Acknowledger {
    pub(crate) fn new(manager: GenerationTaskManager, task: TaskId, kind: GenerationKind) -> Self {
        Self { manager, task, kind }
    }

    #[inline]
    #[must_use]
    pub fn task_id(&self) -> TaskId {
        self.task
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> GenerationKind {
        self.kind
    }

    /// Move the task to `generating`
    ///
    /// Returns `false` if the task was removed or is past `pending`.
    pub fn acknowledge(&self, backend_task_id: Option<String>) -> bool {
        self.manager.acknowledge(self.task, backend_task_id)
    }
}

/// External artifact producer (LLM pipeline, TTS service, ...)
#[async_trait]
pub trait GenerationProducer: Send + Sync + std::fmt::Debug {
    async fn generate(
        &self,
        request: GenerationRequest,
        ack: Acknowledger,
    ) -> Result<GenerationOutput, ProducerError>;
}
