//! Scripted generation producers

use async_trait::async_trait;
use canvas_tasks::{Acknowledger, GenerationOutput, GenerationProducer, GenerationRequest, ProducerError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Producer that replays a fixed outcome
#[derive(Debug)]
pub struct ScriptedProducer {
    outcome: Result<GenerationOutput, ProducerError>,
    acknowledge: bool,
    backend_task_id: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedProducer {
    #[must_use]
    pub fn succeeding(output: GenerationOutput) -> Self {
        Self::with_outcome(Ok(output))
    }

    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_outcome(Err(ProducerError::Failed(message.into())))
    }

    fn with_outcome(outcome: Result<GenerationOutput, ProducerError>) -> Self {
        Self {
            outcome,
            acknowledge: true,
            backend_task_id: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Skip the `generating` acknowledgment
    #[must_use]
    pub fn without_ack(mut self) -> Self {
        self.acknowledge = false;
        self
    }

    #[must_use]
    pub fn with_backend_id(mut self, id: impl Into<String>) -> Self {
        self.backend_task_id = Some(id.into());
        self
    }

    /// Wait between acknowledging and reporting the outcome
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationProducer for ScriptedProducer {
    async fn generate(
        &self,
        _request: GenerationRequest,
        ack: Acknowledger,
    ) -> Result<GenerationOutput, ProducerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.acknowledge {
            ack.acknowledge(self.backend_task_id.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}

/// Producer that acknowledges, then holds its outcome until released
#[derive(Debug)]
pub struct GatedProducer {
    outcome: Result<GenerationOutput, ProducerError>,
    gate: Notify,
    acknowledged: Notify,
}

impl GatedProducer {
    #[must_use]
    pub fn new(outcome: Result<GenerationOutput, ProducerError>) -> Self {
        Self {
            outcome,
            gate: Notify::new(),
            acknowledged: Notify::new(),
        }
    }

    /// Resolve once the task has moved to `generating`
    pub async fn wait_acknowledged(&self) {
        self.acknowledged.notified().await;
    }

    /// Let one pending `generate` call return
    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl GenerationProducer for GatedProducer {
    async fn generate(
        &self,
        _request: GenerationRequest,
        ack: Acknowledger,
    ) -> Result<GenerationOutput, ProducerError> {
        ack.acknowledge(Some(format!("job-{}", ack.task_id())));
        self.acknowledged.notify_one();
        self.gate.notified().await;
        self.outcome.clone()
    }
}
