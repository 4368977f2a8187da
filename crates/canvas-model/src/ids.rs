//! Strongly typed identifiers
//!
//! Canvas entities (nodes, edges, sections) use UUID v4. Generation tasks
//! use ULIDs so that ordering by id follows creation order. Identifiers
//! minted by external collaborators (projects, chat messages, persisted
//! artifacts) are opaque strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random id
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            #[inline]
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

uuid_id!(
    /// Canvas node identifier, unique across both views
    NodeId
);
uuid_id!(
    /// Edge identifier
    EdgeId
);
uuid_id!(
    /// Section identifier
    SectionId
);

opaque_id!(
    /// Backend project the workspace belongs to
    ProjectId
);
opaque_id!(
    /// Chat transport message id used to correlate draft steps
    MessageId
);
opaque_id!(
    /// Persisted artifact id assigned by the backend
    ArtifactId
);

/// Generation task identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Ulid);

impl TaskId {
    /// Generate new task ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn node_ids_are_distinct() {
        let ids: HashSet<NodeId> = (0..1000).map(|_| NodeId::new()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn opaque_ids_serialize_transparently() {
        let id = ArtifactId::new("art-7");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"art-7\"");
        assert_eq!(id.to_string(), "art-7");
    }
}
