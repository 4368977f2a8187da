//! Canvas Engine
//!
//! Explicitly owned workspace engine for one research-canvas project:
//! - [`WorkspaceEngine`]: store, thinking graph and generation tasks behind
//!   one facade, with fail-closed load and clear round-trips
//! - [`EngineConfig`]: TOML-loadable layout, thinking and grid settings
//! - `harness` (feature `harness`): scripted session simulator and
//!   spatial-index stress test behind the `canvas-engine` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use canvas_engine::{EngineConfig, WorkspaceEngine};
//! use canvas_model::ProjectId;
//!
//! # async fn example(persistence: Arc<dyn WorkspacePersistence>) -> Result<(), EngineError> {
//! let mut engine = WorkspaceEngine::new(ProjectId::new("p1"), persistence, EngineConfig::default());
//! engine.load().await?;
//!
//! let draft = engine.append_draft_step(&UserMessage::new("m1", "Why does X hold?"));
//! engine.navigate_to_node(draft)?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
#[cfg(feature = "harness")]
pub mod harness;

pub use config::{ConfigError, EngineConfig};
pub use engine::{LoadStats, WorkspaceEngine};
pub use error::EngineError;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the engine
    pub use crate::{EngineConfig, EngineError, WorkspaceEngine};
    pub use canvas_model::{
        GenerationKind, MessageId, NodeId, Point, ProjectId, StepAnalysis, ViewType,
        WorkspacePersistence,
    };
    pub use canvas_tasks::{GenerationProducer, GenerationRequest, TaskStatus};
    pub use canvas_workspace::UserMessage;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
