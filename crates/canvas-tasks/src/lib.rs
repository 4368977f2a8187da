//! Canvas Tasks - Generation Task Manager
//!
//! Tracks asynchronous "produce an artifact" operations (summaries, mind
//! maps, podcasts, ...):
//! - Monotonic status machine: pending, generating, complete or error
//! - Concurrent outcomes applied per task without contention
//! - Optimistic removal with best-effort backend cleanup
//! - Fail-closed saving of edited output
//! - Grid restoration of persisted artifacts on workspace load
//!
//! # Example
//!
//! ```rust,ignore
//! use canvas_tasks::{GenerationTaskManager, ArtifactGridConfig, GenerationRequest};
//! use canvas_model::{GenerationKind, Point, ProjectId};
//!
//! # async fn example(persistence: Arc<dyn WorkspacePersistence>, producer: Arc<dyn GenerationProducer>) {
//! let tasks = GenerationTaskManager::new(ProjectId::new("p1"), persistence, ArtifactGridConfig::default());
//!
//! let (id, handle) = tasks.launch(producer, GenerationKind::Summary, Point::new(10.0, 10.0),
//!     GenerationRequest::from_sources(["doc-1"]));
//! handle.await.ok();
//! println!("{:?}", tasks.get(id).map(|t| t.status));
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod manager;
pub mod producer;
pub mod task;

pub use error::{ProducerError, TaskError};
pub use manager::{ArtifactGridConfig, GenerationTaskManager};
pub use producer::{Acknowledger, GenerationOutput, GenerationProducer, GenerationRequest};
pub use task::{GenerationTask, TaskPatch, TaskStatus};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with generation tasks
    pub use crate::{
        Acknowledger, GenerationOutput, GenerationProducer, GenerationRequest,
        GenerationTask, GenerationTaskManager, TaskError, TaskStatus,
    };
}
