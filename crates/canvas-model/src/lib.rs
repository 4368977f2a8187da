//! Canvas Model
//!
//! Shared vocabulary of the research canvas workspace engine.
//!
//! # Core Concepts
//!
//! - [`Node`]: Free-floating canvas item, either content or a thinking step
//! - [`Edge`] / [`Section`]: Connections and organizational groupings
//! - [`ViewType`] / [`ViewState`]: The two canvas views and their camera/selection state
//! - [`WorkspacePersistence`]: Async boundary to the backend store
//!
//! # Example
//!
//! ```rust,ignore
//! use canvas_model::{NewNode, Point, ContentType};
//!
//! let note = NewNode::content("Reading list", "…", ContentType::Note)
//!     .at(Point::new(120.0, 80.0));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod artifact;
mod geometry;
mod ids;
mod node;
mod persistence;
mod view;

pub use artifact::{Artifact, ArtifactStatus, ArtifactUpdate, GenerationKind};
pub use geometry::{Point, Rect, Size};
pub use ids::{ArtifactId, EdgeId, MessageId, NodeId, ProjectId, SectionId, TaskId};
pub use node::{
    Analysis, AnalysisStatus, ContentType, Edge, NewNode, Node, NodeKind, NodePatch, Section,
    StepAnalysis, ThinkingFields, ThinkingStep,
};
pub use persistence::{PersistenceError, WorkspacePersistence, WorkspaceSnapshot};
pub use view::{ViewState, ViewStates, ViewType, Viewport};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the canvas model
    pub use crate::{
        Edge, NewNode, Node, NodeId, NodeKind, Point, Rect, Section, Size, ViewType, Viewport,
        WorkspacePersistence,
    };
}
