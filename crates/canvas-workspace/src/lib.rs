//! Canvas Workspace
//!
//! The authoritative in-memory state of a research canvas:
//! - [`WorkspaceStore`]: nodes, edges, sections and the two view states
//! - View switching that snapshots and restores per-view viewports
//! - [`Highlighter`]: transient, self-clearing node highlight
//! - [`ThinkingGraphBuilder`]: grows the thinking path from chat turns
//!
//! # Example
//!
//! ```rust,ignore
//! use canvas_workspace::{WorkspaceStore, ThinkingGraphBuilder, UserMessage};
//!
//! let mut store = WorkspaceStore::default();
//! let mut thinking = ThinkingGraphBuilder::default();
//!
//! let draft = thinking.append_draft_step(&mut store, &UserMessage::new("m1", "Why X?"));
//! thinking.finalize_thinking_step(&mut store, &"m1".into(), analysis);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod highlight;
pub mod store;
pub mod thinking;

pub use error::WorkspaceError;
pub use highlight::Highlighter;
pub use store::{ClearStats, LayoutConfig, WorkspaceStore};
pub use thinking::{ThinkingConfig, ThinkingGraphBuilder, UserMessage};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the workspace store
    pub use crate::{
        LayoutConfig, ThinkingConfig, ThinkingGraphBuilder, UserMessage, WorkspaceError,
        WorkspaceStore,
    };
}
